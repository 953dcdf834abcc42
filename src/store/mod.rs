//! Record store adapter for key pairs.
//!
//! [`KeyPairStore`] is the narrow CRUD surface the object layer depends on.
//! The object layer never implements persistence itself: a context either
//! binds a local store directly or a remote shim that exposes the same trait.

pub mod memory;

pub use memory::MemoryKeyPairStore;

use crate::context::CallerIdentity;
use crate::core::{FieldValue, KeyPairField, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted key pair exactly as the store returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyPairRow {
    pub id: i64,
    pub name: String,
    pub user_id: String,
    pub fingerprint: String,
    pub public_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted: bool,
}

impl KeyPairRow {
    /// Typed value of a declared field, timestamps normalized.
    pub fn field(&self, field: KeyPairField) -> FieldValue {
        match field {
            KeyPairField::Id => FieldValue::Integer(self.id),
            KeyPairField::Name => FieldValue::Text(self.name.clone()),
            KeyPairField::UserId => FieldValue::Text(self.user_id.clone()),
            KeyPairField::Fingerprint => FieldValue::Text(self.fingerprint.clone()),
            KeyPairField::PublicKey => FieldValue::Text(self.public_key.clone()),
            KeyPairField::CreatedAt => FieldValue::timestamp(&self.created_at),
            KeyPairField::UpdatedAt => self
                .updated_at
                .as_ref()
                .map_or(FieldValue::Null, FieldValue::timestamp),
            KeyPairField::DeletedAt => self
                .deleted_at
                .as_ref()
                .map_or(FieldValue::Null, FieldValue::timestamp),
            KeyPairField::Deleted => FieldValue::Boolean(self.deleted),
        }
    }
}

/// Create payload: only the caller-settable fields that were actually set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewKeyPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub name: String,
    pub public_key: String,
}

impl NewKeyPair {
    pub fn new(name: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            user_id: None,
            name: name.into(),
            public_key: public_key.into(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Resolves the owning identity: explicit payload value first, then the caller.
    pub fn owner<'a>(&'a self, caller: &'a CallerIdentity) -> Option<&'a str> {
        self.user_id.as_deref().or(caller.user_id())
    }
}

/// Persistence backend surface consumed by key pair objects.
///
/// Each call is a single atomic operation from the caller's point of view.
/// Lookups only ever see non-deleted rows.
#[async_trait]
pub trait KeyPairStore: Send + Sync {
    /// Fetches the non-deleted row for `(user_id, name)`.
    ///
    /// # Errors
    ///
    /// [`ObjectError::NotFound`](crate::ObjectError::NotFound) when no such row exists.
    async fn key_pair_get(
        &self,
        caller: &CallerIdentity,
        user_id: &str,
        name: &str,
    ) -> Result<KeyPairRow>;

    /// Inserts a row and returns it with every store-assigned field filled in.
    ///
    /// # Errors
    ///
    /// - `Duplicate` when `(user_id, name)` is already taken by a live row
    /// - `Invalid` when the owner cannot be resolved or a required value is empty
    async fn key_pair_create(&self, caller: &CallerIdentity, values: NewKeyPair)
    -> Result<KeyPairRow>;

    /// Removes the live row for `(user_id, name)`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the row is already gone.
    async fn key_pair_destroy(&self, caller: &CallerIdentity, user_id: &str, name: &str)
    -> Result<()>;

    /// All live rows owned by `user_id`, in store order.
    async fn key_pair_get_all_by_user(
        &self,
        caller: &CallerIdentity,
        user_id: &str,
    ) -> Result<Vec<KeyPairRow>>;

    /// Number of live rows owned by `user_id`.
    async fn key_pair_count_by_user(&self, caller: &CallerIdentity, user_id: &str) -> Result<u64>;
}

use crate::context::RequestContext;
use crate::core::{FieldValue, KeyPairField, ObjectError, Result, normalize_timestamp};
use crate::store::{KeyPairRow, NewKeyPair};
use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use tracing::{Instrument, Level, event, info_span};

/// Lifecycle position of a [`KeyPair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPairState {
    /// No stored identity yet; only `create` is valid.
    Unbound,
    /// Carries a store identity (`id`).
    Bound,
    /// Removed from the store; terminal.
    Destroyed,
}

/// An identity-bound public key credential.
///
/// Fields start unset. Callers set `name`, `public_key` and optionally
/// `user_id`, then `create`; every other field is assigned by the store and
/// copied in during reconciliation. Reads go through [`KeyPair::get_by_name`]
/// or [`KeyPairList`](crate::KeyPairList).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPair {
    id: Option<i64>,
    name: Option<String>,
    user_id: Option<String>,
    fingerprint: Option<String>,
    public_key: Option<String>,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
    deleted_at: Option<NaiveDateTime>,
    deleted: Option<bool>,
    set_fields: BTreeSet<KeyPairField>,
    changed: BTreeSet<KeyPairField>,
    destroyed: bool,
}

impl KeyPair {
    pub const OBJECT_NAME: &'static str = "KeyPair";
    pub const VERSION: &'static str = "1.0";

    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bound object from a store row.
    pub(crate) fn from_row(row: KeyPairRow) -> Self {
        let mut keypair = Self::new();
        keypair.reconcile(row);
        keypair
    }

    /// Copies every declared field from `row`, then clears change tracking.
    fn reconcile(&mut self, row: KeyPairRow) {
        for field in KeyPairField::ALL {
            match field {
                KeyPairField::Id => self.id = Some(row.id),
                KeyPairField::Name => self.name = Some(row.name.clone()),
                KeyPairField::UserId => self.user_id = Some(row.user_id.clone()),
                KeyPairField::Fingerprint => self.fingerprint = Some(row.fingerprint.clone()),
                KeyPairField::PublicKey => self.public_key = Some(row.public_key.clone()),
                KeyPairField::CreatedAt => {
                    self.created_at = Some(normalize_timestamp(&row.created_at));
                }
                KeyPairField::UpdatedAt => {
                    self.updated_at = row.updated_at.as_ref().map(normalize_timestamp);
                }
                KeyPairField::DeletedAt => {
                    self.deleted_at = row.deleted_at.as_ref().map(normalize_timestamp);
                }
                KeyPairField::Deleted => self.deleted = Some(row.deleted),
            }
            self.set_fields.insert(field);
        }
        self.reset_changes();
    }

    pub fn state(&self) -> KeyPairState {
        if self.destroyed {
            KeyPairState::Destroyed
        } else if self.id.is_some() {
            KeyPairState::Bound
        } else {
            KeyPairState::Unbound
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<NaiveDateTime> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<NaiveDateTime> {
        self.deleted_at
    }

    pub fn deleted(&self) -> Option<bool> {
        self.deleted
    }

    /// Binds the object to an existing store identity.
    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
        self.mark(KeyPairField::Id);
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
        self.mark(KeyPairField::Name);
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
        self.mark(KeyPairField::UserId);
    }

    pub fn set_public_key(&mut self, public_key: impl Into<String>) {
        self.public_key = Some(public_key.into());
        self.mark(KeyPairField::PublicKey);
    }

    fn mark(&mut self, field: KeyPairField) {
        self.set_fields.insert(field);
        self.changed.insert(field);
    }

    pub fn is_set(&self, field: KeyPairField) -> bool {
        self.set_fields.contains(&field)
    }

    /// Fields assigned by the caller since the last reconciliation.
    pub fn what_changed(&self) -> &BTreeSet<KeyPairField> {
        &self.changed
    }

    pub fn reset_changes(&mut self) {
        self.changed.clear();
    }

    /// Typed value of a declared field, or `None` while the field is unset.
    pub fn field(&self, field: KeyPairField) -> Option<FieldValue> {
        if !self.is_set(field) {
            return None;
        }
        let value = match field {
            KeyPairField::Id => FieldValue::Integer(self.id?),
            KeyPairField::Name => FieldValue::Text(self.name.clone()?),
            KeyPairField::UserId => FieldValue::Text(self.user_id.clone()?),
            KeyPairField::Fingerprint => FieldValue::Text(self.fingerprint.clone()?),
            KeyPairField::PublicKey => FieldValue::Text(self.public_key.clone()?),
            KeyPairField::CreatedAt => FieldValue::Timestamp(self.created_at?),
            KeyPairField::UpdatedAt => FieldValue::optional_timestamp(self.updated_at),
            KeyPairField::DeletedAt => FieldValue::optional_timestamp(self.deleted_at),
            KeyPairField::Deleted => FieldValue::Boolean(self.deleted?),
        };
        Some(value)
    }

    /// Declared fields whose value differs from `row`, unset fields included.
    pub fn differing_fields(&self, row: &KeyPairRow) -> Vec<KeyPairField> {
        KeyPairField::ALL
            .into_iter()
            .filter(|field| self.field(*field) != Some(row.field(*field)))
            .collect()
    }

    fn ensure_live(&self, verb: &str) -> Result<()> {
        if self.destroyed {
            return Err(ObjectError::invalid(format!(
                "cannot {verb} a key pair that was destroyed"
            )));
        }
        Ok(())
    }

    /// Looks up the live key pair `name` owned by `user_id`.
    pub async fn get_by_name(ctx: &RequestContext, user_id: &str, name: &str) -> Result<Self> {
        let span = info_span!(
            "keypair.get_by_name",
            mode = %ctx.mode(),
            user_id = %user_id,
            name = %name
        );
        async move {
            let row = ctx
                .store()
                .key_pair_get(ctx.caller(), user_id, name)
                .await
                .inspect_err(|err| event!(Level::DEBUG, error = %err, "key pair lookup failed"))?;
            Ok(Self::from_row(row))
        }
        .instrument(span)
        .await
    }

    /// Persists a new key pair and adopts every field of the stored row.
    ///
    /// Only caller-settable fields that were set on this object are sent.
    pub async fn create(&mut self, ctx: &RequestContext) -> Result<()> {
        self.ensure_live("create")?;
        if self.state() == KeyPairState::Bound {
            return Err(ObjectError::invalid("key pair already created"));
        }
        let name = self
            .name
            .clone()
            .ok_or_else(|| ObjectError::invalid("name is required to create a key pair"))?;
        let public_key = self
            .public_key
            .clone()
            .ok_or_else(|| ObjectError::invalid("public_key is required to create a key pair"))?;

        let mut values = NewKeyPair::new(name, public_key);
        if self.changed.contains(&KeyPairField::UserId) {
            values.user_id = self.user_id.clone();
        }

        let span = info_span!(
            "keypair.create",
            mode = %ctx.mode(),
            name = %values.name,
            user_id = values.owner(ctx.caller()).unwrap_or("")
        );
        let row = async {
            ctx.store()
                .key_pair_create(ctx.caller(), values)
                .await
                .inspect_err(|err| event!(Level::ERROR, error = %err, "key pair create failed"))
        }
        .instrument(span.clone())
        .await?;

        self.reconcile(row);
        span.in_scope(|| event!(Level::DEBUG, id = self.id, "key pair created"));
        Ok(())
    }

    /// Removes this key pair from the store by `(user_id, name)`.
    ///
    /// Identity fields stay readable afterwards; no further store verbs are
    /// accepted.
    pub async fn destroy(&mut self, ctx: &RequestContext) -> Result<()> {
        self.ensure_live("destroy")?;
        let (Some(_), Some(user_id), Some(name)) =
            (self.id, self.user_id.as_deref(), self.name.as_deref())
        else {
            return Err(ObjectError::invalid(
                "destroy requires id, user_id and name to be set",
            ));
        };

        let span = info_span!(
            "keypair.destroy",
            mode = %ctx.mode(),
            id = self.id,
            user_id = %user_id,
            name = %name
        );
        async {
            ctx.store()
                .key_pair_destroy(ctx.caller(), user_id, name)
                .await
                .inspect_err(|err| event!(Level::WARN, error = %err, "key pair destroy failed"))
        }
        .instrument(span)
        .await?;

        self.destroyed = true;
        Ok(())
    }

    /// Removes the key pair `name` owned by `user_id` without loading it first.
    pub async fn destroy_by_name(ctx: &RequestContext, user_id: &str, name: &str) -> Result<()> {
        let span = info_span!(
            "keypair.destroy_by_name",
            mode = %ctx.mode(),
            user_id = %user_id,
            name = %name
        );
        async move {
            ctx.store()
                .key_pair_destroy(ctx.caller(), user_id, name)
                .await
                .inspect_err(|err| event!(Level::WARN, error = %err, "key pair destroy failed"))
        }
        .instrument(span)
        .await
    }
}

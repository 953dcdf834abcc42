use super::{KeyPairRow, KeyPairStore, NewKeyPair};
use crate::context::CallerIdentity;
use crate::core::{ObjectError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{Level, event};
use uuid::Uuid;

/// Computes the stored fingerprint for a public key.
pub type Fingerprinter = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Default)]
struct MemoryTable {
    rows: Vec<KeyPairRow>,
    last_id: i64,
}

impl MemoryTable {
    fn live(&self, user_id: &str, name: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| !row.deleted && row.user_id == user_id && row.name == name)
    }
}

/// In-process key pair store.
///
/// Rows are soft-deleted, ids are assigned monotonically from 1, and listing
/// follows insertion order. Cloning shares the underlying table.
#[derive(Clone)]
pub struct MemoryKeyPairStore {
    table: Arc<RwLock<MemoryTable>>,
    fingerprinter: Fingerprinter,
}

impl MemoryKeyPairStore {
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(MemoryTable::default())),
            fingerprinter: Arc::new(opaque_fingerprint),
        }
    }

    /// Replaces the fingerprint function used on create.
    pub fn with_fingerprinter<F>(mut self, fingerprinter: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.fingerprinter = Arc::new(fingerprinter);
        self
    }

    /// Every row ever written, soft-deleted ones included.
    pub async fn all_rows(&self) -> Vec<KeyPairRow> {
        self.table.read().await.rows.clone()
    }
}

impl Default for MemoryKeyPairStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryKeyPairStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryKeyPairStore").finish_non_exhaustive()
    }
}

// Placeholder digest: stable per key, carries no cryptographic meaning.
fn opaque_fingerprint(public_key: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, public_key.as_bytes())
        .simple()
        .to_string()
}

fn missing(user_id: &str, name: &str) -> ObjectError {
    ObjectError::not_found(format!("key pair '{name}' for user '{user_id}'"))
}

#[async_trait]
impl KeyPairStore for MemoryKeyPairStore {
    async fn key_pair_get(
        &self,
        _caller: &CallerIdentity,
        user_id: &str,
        name: &str,
    ) -> Result<KeyPairRow> {
        let table = self.table.read().await;
        table
            .live(user_id, name)
            .map(|idx| table.rows[idx].clone())
            .ok_or_else(|| missing(user_id, name))
    }

    async fn key_pair_create(
        &self,
        caller: &CallerIdentity,
        values: NewKeyPair,
    ) -> Result<KeyPairRow> {
        let user_id = values
            .owner(caller)
            .ok_or_else(|| ObjectError::invalid("user_id is required to create a key pair"))?
            .to_string();
        if values.name.trim().is_empty() {
            return Err(ObjectError::invalid("name must not be empty"));
        }
        if values.public_key.is_empty() {
            return Err(ObjectError::invalid("public_key must not be empty"));
        }

        let mut table = self.table.write().await;
        if table.live(&user_id, &values.name).is_some() {
            return Err(ObjectError::duplicate(format!(
                "key pair '{}' for user '{}'",
                values.name, user_id
            )));
        }

        table.last_id += 1;
        let row = KeyPairRow {
            id: table.last_id,
            fingerprint: (self.fingerprinter)(&values.public_key),
            name: values.name,
            user_id,
            public_key: values.public_key,
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
            deleted: false,
        };
        table.rows.push(row.clone());
        event!(Level::DEBUG, id = row.id, user_id = %row.user_id, name = %row.name, "key pair row inserted");
        Ok(row)
    }

    async fn key_pair_destroy(
        &self,
        _caller: &CallerIdentity,
        user_id: &str,
        name: &str,
    ) -> Result<()> {
        let mut table = self.table.write().await;
        let idx = table.live(user_id, name).ok_or_else(|| missing(user_id, name))?;
        let row = &mut table.rows[idx];
        row.deleted = true;
        row.deleted_at = Some(Utc::now());
        event!(Level::DEBUG, id = row.id, user_id = %user_id, name = %name, "key pair row soft-deleted");
        Ok(())
    }

    async fn key_pair_get_all_by_user(
        &self,
        _caller: &CallerIdentity,
        user_id: &str,
    ) -> Result<Vec<KeyPairRow>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .iter()
            .filter(|row| !row.deleted && row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn key_pair_count_by_user(&self, _caller: &CallerIdentity, user_id: &str) -> Result<u64> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .iter()
            .filter(|row| !row.deleted && row.user_id == user_id)
            .count() as u64)
    }
}

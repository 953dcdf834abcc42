//! Contract scenarios shared by every execution mode.
//!
//! Each scenario takes an [`ExecutionMode`] and builds its own context, so the
//! exact same assertions run once against a local store and once through the
//! remote dispatch shim.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use keypair_objects::{
    CallerIdentity, ExecutionMode, KeyPair, KeyPairField, KeyPairList, KeyPairRow, KeyPairState,
    KeyPairStore, MemoryKeyPairStore, NewKeyPair, ObjectError, RequestContext, Result,
    in_process_remote,
};
use std::sync::{Arc, Mutex};

pub const USER: &str = "fake-user";
pub const NAME: &str = "foo-keypair";

pub fn fixture_created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, 42)
        .unwrap()
        .checked_add_signed(chrono::Duration::microseconds(250_117))
        .unwrap()
}

/// The row every fixture-store lookup answers with.
pub fn fake_keypair() -> KeyPairRow {
    KeyPairRow {
        id: 123,
        name: NAME.to_string(),
        user_id: USER.to_string(),
        fingerprint: "fake-fingerprint".to_string(),
        public_key: "fake\npublic\nkey".to_string(),
        created_at: fixture_created_at(),
        updated_at: None,
        deleted_at: None,
        deleted: false,
    }
}

/// A row that was updated and soft-deleted, with nanosecond timestamps.
pub fn aged_keypair() -> KeyPairRow {
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    KeyPairRow {
        updated_at: Some(base + chrono::Duration::nanoseconds(987_654_321)),
        deleted_at: Some(base + chrono::Duration::nanoseconds(1)),
        deleted: true,
        ..fake_keypair()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Get { user_id: String, name: String },
    Create(NewKeyPair),
    Destroy { user_id: String, name: String },
    GetAllByUser { user_id: String },
    CountByUser { user_id: String },
}

/// Store double that answers with one fixed row and records its inputs.
pub struct RecordingStore {
    row: KeyPairRow,
    calls: Mutex<Vec<(Option<String>, RecordedCall)>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Self::with_row(fake_keypair())
    }

    pub fn with_row(row: KeyPairRow) -> Arc<Self> {
        Arc::new(Self {
            row,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// `user_id` of the caller identity each call arrived with.
    pub fn callers(&self) -> Vec<Option<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(caller, _)| caller.clone())
            .collect()
    }

    fn record(&self, caller: &CallerIdentity, call: RecordedCall) {
        self.calls
            .lock()
            .unwrap()
            .push((caller.user_id().map(str::to_string), call));
    }
}

#[async_trait]
impl KeyPairStore for RecordingStore {
    async fn key_pair_get(
        &self,
        caller: &CallerIdentity,
        user_id: &str,
        name: &str,
    ) -> Result<KeyPairRow> {
        self.record(
            caller,
            RecordedCall::Get {
                user_id: user_id.to_string(),
                name: name.to_string(),
            },
        );
        Ok(self.row.clone())
    }

    async fn key_pair_create(
        &self,
        caller: &CallerIdentity,
        values: NewKeyPair,
    ) -> Result<KeyPairRow> {
        self.record(caller, RecordedCall::Create(values));
        Ok(self.row.clone())
    }

    async fn key_pair_destroy(
        &self,
        caller: &CallerIdentity,
        user_id: &str,
        name: &str,
    ) -> Result<()> {
        self.record(
            caller,
            RecordedCall::Destroy {
                user_id: user_id.to_string(),
                name: name.to_string(),
            },
        );
        Ok(())
    }

    async fn key_pair_get_all_by_user(
        &self,
        caller: &CallerIdentity,
        user_id: &str,
    ) -> Result<Vec<KeyPairRow>> {
        self.record(
            caller,
            RecordedCall::GetAllByUser {
                user_id: user_id.to_string(),
            },
        );
        Ok(vec![self.row.clone()])
    }

    async fn key_pair_count_by_user(&self, caller: &CallerIdentity, user_id: &str) -> Result<u64> {
        self.record(
            caller,
            RecordedCall::CountByUser {
                user_id: user_id.to_string(),
            },
        );
        Ok(1)
    }
}

/// Binds `store` to a context forced into `mode`.
pub async fn context_for(
    mode: ExecutionMode,
    caller: CallerIdentity,
    store: Arc<dyn KeyPairStore>,
) -> RequestContext {
    match mode {
        ExecutionMode::Local => RequestContext::local(caller, store),
        ExecutionMode::Remote => in_process_remote(caller, store)
            .await
            .expect("in-process peer registers"),
    }
}

pub async fn memory_context(mode: ExecutionMode) -> (RequestContext, MemoryKeyPairStore) {
    let store = MemoryKeyPairStore::new();
    let ctx = context_for(mode, CallerIdentity::for_user(USER), Arc::new(store.clone())).await;
    (ctx, store)
}

pub async fn recording_context(mode: ExecutionMode) -> (RequestContext, Arc<RecordingStore>) {
    recording_context_with(mode, fake_keypair()).await
}

pub async fn recording_context_with(
    mode: ExecutionMode,
    row: KeyPairRow,
) -> (RequestContext, Arc<RecordingStore>) {
    let store = RecordingStore::with_row(row);
    let ctx = context_for(mode, CallerIdentity::for_user(USER), store.clone()).await;
    (ctx, store)
}

/// Asserts that every declared field of `obj` equals the store row.
pub fn assert_matches_row(obj: &KeyPair, row: &KeyPairRow) {
    for field in KeyPairField::ALL {
        assert_eq!(
            obj.field(field),
            Some(row.field(field)),
            "field `{field}` differs from the store row"
        );
    }
}

async fn create_keypair(ctx: &RequestContext, name: &str, public_key: &str) -> Result<KeyPair> {
    let mut keypair = KeyPair::new();
    keypair.set_name(name);
    keypair.set_public_key(public_key);
    keypair.create(ctx).await?;
    Ok(keypair)
}

// ============================================================================
// Fixed-row scenarios
// ============================================================================

pub async fn get_by_name_reconciles_store_row(mode: ExecutionMode) {
    let (ctx, store) = recording_context(mode).await;

    let keypair = KeyPair::get_by_name(&ctx, USER, NAME).await.unwrap();

    assert_matches_row(&keypair, &fake_keypair());
    assert_eq!(keypair.state(), KeyPairState::Bound);
    assert_eq!(
        store.calls(),
        vec![RecordedCall::Get {
            user_id: USER.to_string(),
            name: NAME.to_string()
        }]
    );
}

pub async fn create_sends_only_caller_fields(mode: ExecutionMode) {
    let (ctx, store) = recording_context(mode).await;

    let mut keypair = KeyPair::new();
    keypair.set_name(NAME);
    keypair.set_public_key("keydata");
    keypair.create(&ctx).await.unwrap();

    assert_eq!(
        store.calls(),
        vec![RecordedCall::Create(NewKeyPair::new(NAME, "keydata"))]
    );
    assert_matches_row(&keypair, &fake_keypair());
    assert!(keypair.what_changed().is_empty());
}

pub async fn create_forwards_explicit_owner(mode: ExecutionMode) {
    let (ctx, store) = recording_context(mode).await;

    let mut keypair = KeyPair::new();
    keypair.set_user_id(USER);
    keypair.set_name(NAME);
    keypair.set_public_key("keydata");
    keypair.create(&ctx).await.unwrap();

    assert_eq!(
        store.calls(),
        vec![RecordedCall::Create(
            NewKeyPair::new(NAME, "keydata").with_user_id(USER)
        )]
    );
}

pub async fn destroy_uses_identity_fields(mode: ExecutionMode) {
    let (ctx, store) = recording_context(mode).await;

    let mut keypair = KeyPair::new();
    keypair.set_id(123);
    keypair.set_user_id(USER);
    keypair.set_name(NAME);
    keypair.destroy(&ctx).await.unwrap();

    assert_eq!(keypair.state(), KeyPairState::Destroyed);
    assert_eq!(
        store.calls(),
        vec![RecordedCall::Destroy {
            user_id: USER.to_string(),
            name: NAME.to_string()
        }]
    );
}

pub async fn destroy_by_name_is_a_single_store_call(mode: ExecutionMode) {
    let (ctx, store) = recording_context(mode).await;

    KeyPair::destroy_by_name(&ctx, USER, NAME).await.unwrap();

    assert_eq!(
        store.calls(),
        vec![RecordedCall::Destroy {
            user_id: USER.to_string(),
            name: NAME.to_string()
        }]
    );
}

pub async fn get_by_user_and_count(mode: ExecutionMode) {
    let (ctx, store) = recording_context(mode).await;

    let keypairs = KeyPairList::get_by_user(&ctx, USER).await.unwrap();
    assert_eq!(keypairs.len(), 1);
    assert_matches_row(&keypairs[0], &fake_keypair());
    assert_eq!(KeyPairList::get_count_by_user(&ctx, USER).await.unwrap(), 1);

    assert_eq!(
        store.calls(),
        vec![
            RecordedCall::GetAllByUser {
                user_id: USER.to_string()
            },
            RecordedCall::CountByUser {
                user_id: USER.to_string()
            },
        ]
    );
}

pub async fn caller_identity_reaches_the_store(mode: ExecutionMode) {
    let (ctx, store) = recording_context(mode).await;

    KeyPair::get_by_name(&ctx, USER, NAME).await.unwrap();
    let admin = ctx.with_caller(CallerIdentity::admin());
    KeyPairList::get_count_by_user(&admin, USER).await.unwrap();

    assert_eq!(store.callers(), vec![Some(USER.to_string()), None]);
}

pub async fn invalid_create_never_reaches_the_store(mode: ExecutionMode) {
    let (ctx, store) = recording_context(mode).await;

    let mut keypair = KeyPair::new();
    keypair.set_name(NAME);
    let err = keypair.create(&ctx).await.unwrap_err();

    assert!(matches!(err, ObjectError::Invalid(_)));
    assert!(store.calls().is_empty());
}

pub async fn populated_nullable_timestamps_keep_precision(mode: ExecutionMode) {
    let row = aged_keypair();
    let (ctx, _store) = recording_context_with(mode, row.clone()).await;

    let keypair = KeyPair::get_by_name(&ctx, USER, NAME).await.unwrap();
    assert_matches_row(&keypair, &row);
    assert!(keypair.differing_fields(&row).is_empty());
    assert!(KeyPairField::ALL.into_iter().all(|field| keypair.is_set(field)));
    assert_eq!(keypair.updated_at(), row.updated_at.map(|ts| ts.naive_utc()));
    assert_eq!(keypair.deleted_at(), row.deleted_at.map(|ts| ts.naive_utc()));
    assert_eq!(
        keypair.updated_at().map(|ts| ts.and_utc().timestamp_subsec_nanos()),
        Some(987_654_321)
    );
    assert_eq!(keypair.deleted(), Some(true));

    let listed = KeyPairList::get_by_user(&ctx, USER).await.unwrap();
    let only = listed.get(0).expect("one listed key pair");
    assert_matches_row(only, &row);
    assert_eq!(listed.as_slice(), std::slice::from_ref(&keypair));
    assert_eq!(listed.into_vec(), vec![keypair]);
}

// ============================================================================
// Memory-store scenarios
// ============================================================================

pub async fn create_then_get_round_trips(mode: ExecutionMode) {
    let (ctx, store) = memory_context(mode).await;

    let created = create_keypair(&ctx, NAME, "keydata").await.unwrap();
    assert_eq!(created.name(), Some(NAME));
    assert_eq!(created.user_id(), Some(USER));
    assert_eq!(created.public_key(), Some("keydata"));
    assert!(created.id().is_some());
    assert!(created.fingerprint().is_some());
    assert!(created.created_at().is_some());

    let fetched = KeyPair::get_by_name(&ctx, USER, NAME).await.unwrap();
    assert_eq!(fetched, created);

    let rows = store.all_rows().await;
    assert_eq!(rows.len(), 1);
    assert_matches_row(&fetched, &rows[0]);
}

pub async fn destroy_by_name_then_get_is_not_found(mode: ExecutionMode) {
    let (ctx, _store) = memory_context(mode).await;
    create_keypair(&ctx, NAME, "keydata").await.unwrap();

    KeyPair::destroy_by_name(&ctx, USER, NAME).await.unwrap();

    let err = KeyPair::get_by_name(&ctx, USER, NAME).await.unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got {err:?}");
}

pub async fn instance_destroy_equals_destroy_by_name(mode: ExecutionMode) {
    let (ctx, store) = memory_context(mode).await;
    let first = create_keypair(&ctx, "first", "k1").await.unwrap();
    create_keypair(&ctx, "second", "k2").await.unwrap();

    let mut by_identity = KeyPair::new();
    by_identity.set_id(first.id().unwrap());
    by_identity.set_user_id(USER);
    by_identity.set_name("first");
    by_identity.destroy(&ctx).await.unwrap();
    KeyPair::destroy_by_name(&ctx, USER, "second").await.unwrap();

    for name in ["first", "second"] {
        let err = KeyPair::get_by_name(&ctx, USER, name).await.unwrap_err();
        assert!(err.is_not_found());
    }
    let rows = store.all_rows().await;
    assert!(rows.iter().all(|row| row.deleted && row.deleted_at.is_some()));
    assert_eq!(KeyPairList::get_count_by_user(&ctx, USER).await.unwrap(), 0);
}

pub async fn destroy_of_missing_row_is_not_found(mode: ExecutionMode) {
    let (ctx, _store) = memory_context(mode).await;

    let err = KeyPair::destroy_by_name(&ctx, USER, "ghost").await.unwrap_err();
    assert!(err.is_not_found());

    let mut stale = KeyPair::new();
    stale.set_id(99);
    stale.set_user_id(USER);
    stale.set_name("ghost");
    let err = stale.destroy(&ctx).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(stale.state(), KeyPairState::Bound);
}

pub async fn duplicate_create_is_rejected(mode: ExecutionMode) {
    let (ctx, _store) = memory_context(mode).await;
    create_keypair(&ctx, NAME, "keydata").await.unwrap();

    let err = create_keypair(&ctx, NAME, "other").await.unwrap_err();
    assert!(matches!(err, ObjectError::Duplicate(_)), "got {err:?}");
}

pub async fn list_length_matches_count(mode: ExecutionMode) {
    let (ctx, _store) = memory_context(mode).await;
    for idx in 0..4 {
        create_keypair(&ctx, &format!("key-{idx}"), "keydata").await.unwrap();
    }
    KeyPair::destroy_by_name(&ctx, USER, "key-2").await.unwrap();

    let list = KeyPairList::get_by_user(&ctx, USER).await.unwrap();
    let count = KeyPairList::get_count_by_user(&ctx, USER).await.unwrap();
    assert_eq!(list.len() as u64, count);
    assert_eq!(
        list.iter().filter_map(KeyPair::name).collect::<Vec<_>>(),
        vec!["key-0", "key-1", "key-3"]
    );
}

pub async fn listed_timestamps_match_store_rows(mode: ExecutionMode) {
    let (ctx, store) = memory_context(mode).await;
    create_keypair(&ctx, "a", "k").await.unwrap();
    create_keypair(&ctx, "b", "k").await.unwrap();

    let list = KeyPairList::get_by_user(&ctx, USER).await.unwrap();
    let rows = store.all_rows().await;
    assert_eq!(list.len(), rows.len());
    for (obj, row) in list.iter().zip(&rows) {
        assert_eq!(obj.created_at(), Some(row.created_at.naive_utc()));
        assert_matches_row(obj, row);
    }
}

pub async fn end_to_end_lifecycle(mode: ExecutionMode) {
    let (ctx, _store) = memory_context(mode).await;

    let created = create_keypair(&ctx, NAME, "keydata").await.unwrap();

    let listed = KeyPairList::get_by_user(&ctx, USER).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], created);
    assert_eq!(KeyPairList::get_count_by_user(&ctx, USER).await.unwrap(), 1);

    KeyPair::destroy_by_name(&ctx, USER, NAME).await.unwrap();
    let err = KeyPair::get_by_name(&ctx, USER, NAME).await.unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Mode comparison
// ============================================================================

/// Runs the fixed-row script and returns everything a caller can observe.
pub async fn observe(mode: ExecutionMode) -> Vec<String> {
    let (ctx, _store) = recording_context(mode).await;
    let mut seen = Vec::new();

    let fetched = KeyPair::get_by_name(&ctx, USER, NAME).await.unwrap();
    seen.push(format!("{fetched:?}"));

    let created = create_keypair(&ctx, NAME, "keydata").await.unwrap();
    seen.push(format!("{created:?}"));

    let list = KeyPairList::get_by_user(&ctx, USER).await.unwrap();
    seen.push(format!("{list:?}"));
    seen.push(KeyPairList::get_count_by_user(&ctx, USER).await.unwrap().to_string());

    let (memory_ctx, _memory) = memory_context(mode).await;
    for err in [
        KeyPair::get_by_name(&memory_ctx, USER, "ghost").await.unwrap_err(),
        KeyPair::destroy_by_name(&memory_ctx, USER, "ghost").await.unwrap_err(),
        KeyPair::new().create(&memory_ctx).await.unwrap_err(),
    ] {
        seen.push(format!("{err:?}"));
    }
    seen
}

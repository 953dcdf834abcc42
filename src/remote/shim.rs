use super::transport::RemoteTransport;
use super::wire::{RemoteCall, RemoteEnvelope, RemoteReply};
use crate::context::CallerIdentity;
use crate::core::{ObjectError, Result};
use crate::store::{KeyPairRow, KeyPairStore, NewKeyPair};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, Level, event, info_span};

/// Remote dispatch shim.
///
/// Implements [`KeyPairStore`] by forwarding each call to a peer through a
/// [`RemoteTransport`]. Objects bound to a remote context reconcile the rows
/// coming back exactly as they would rows from a local store.
pub struct RemoteKeyPairStore {
    transport: Arc<dyn RemoteTransport>,
    peer: String,
    timeout: Option<Duration>,
}

impl RemoteKeyPairStore {
    pub fn new(transport: Arc<dyn RemoteTransport>, peer: impl Into<String>) -> Self {
        Self {
            transport,
            peer: peer.into(),
            timeout: None,
        }
    }

    /// Bounds every round trip; an elapsed timeout is a dispatch failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    async fn call(&self, caller: &CallerIdentity, call: RemoteCall) -> Result<RemoteReply> {
        let envelope = RemoteEnvelope::new(caller.clone(), call);
        let span = info_span!(
            "remote.dispatch",
            peer = %self.peer,
            method = envelope.call.method(),
            envelope_id = %envelope.envelope_id
        );

        async move {
            let round_trip = self.transport.dispatch(&self.peer, envelope);
            let outcome = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, round_trip).await.unwrap_or_else(|_| {
                    Err(ObjectError::remote(format!(
                        "peer '{}' did not answer within {:?}",
                        self.peer, limit
                    )))
                }),
                None => round_trip.await,
            };

            match &outcome {
                Ok(RemoteReply::Fault(fault)) => {
                    event!(Level::DEBUG, kind = ?fault.kind, "remote call returned a fault");
                }
                Ok(_) => event!(Level::DEBUG, "remote call completed"),
                Err(err) => event!(Level::ERROR, error = %err, "remote dispatch failed"),
            }
            outcome
        }
        .instrument(span)
        .await
    }
}

impl fmt::Debug for RemoteKeyPairStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteKeyPairStore")
            .field("peer", &self.peer)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyPairStore for RemoteKeyPairStore {
    async fn key_pair_get(
        &self,
        caller: &CallerIdentity,
        user_id: &str,
        name: &str,
    ) -> Result<KeyPairRow> {
        self.call(
            caller,
            RemoteCall::KeyPairGet {
                user_id: user_id.to_string(),
                name: name.to_string(),
            },
        )
        .await?
        .into_row()
    }

    async fn key_pair_create(
        &self,
        caller: &CallerIdentity,
        values: NewKeyPair,
    ) -> Result<KeyPairRow> {
        self.call(caller, RemoteCall::KeyPairCreate { values })
            .await?
            .into_row()
    }

    async fn key_pair_destroy(
        &self,
        caller: &CallerIdentity,
        user_id: &str,
        name: &str,
    ) -> Result<()> {
        self.call(
            caller,
            RemoteCall::KeyPairDestroy {
                user_id: user_id.to_string(),
                name: name.to_string(),
            },
        )
        .await?
        .into_done()
    }

    async fn key_pair_get_all_by_user(
        &self,
        caller: &CallerIdentity,
        user_id: &str,
    ) -> Result<Vec<KeyPairRow>> {
        self.call(
            caller,
            RemoteCall::KeyPairGetAllByUser {
                user_id: user_id.to_string(),
            },
        )
        .await?
        .into_rows()
    }

    async fn key_pair_count_by_user(&self, caller: &CallerIdentity, user_id: &str) -> Result<u64> {
        self.call(
            caller,
            RemoteCall::KeyPairCountByUser {
                user_id: user_id.to_string(),
            },
        )
        .await?
        .into_count()
    }
}

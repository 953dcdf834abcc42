use super::endpoint::{DISPATCH_PATH, RemoteEndpoint};
use super::wire::{RemoteEnvelope, RemoteReply};
use crate::core::{ObjectError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Header naming the logical peer an HTTP envelope is addressed to.
pub const PEER_HEADER: &str = "x-keypair-peer";

/// Moves envelopes to a peer and brings replies back.
///
/// Implementations must report every delivery problem as
/// [`ObjectError::RemoteDispatch`]. Faults raised by the peer travel inside
/// the returned [`RemoteReply`] instead.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    async fn dispatch(&self, target_peer: &str, envelope: RemoteEnvelope) -> Result<RemoteReply>;
}

/// An in-process transport for tests and single-binary deployments.
///
/// Envelopes and replies are encoded to JSON bytes and decoded again on the
/// other side, so the marshalling is identical to the HTTP transport.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    peers: Arc<Mutex<HashMap<String, RemoteEndpoint>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a peer, replacing any endpoint with the same name.
    pub async fn register_peer(&self, peer: impl Into<String>, endpoint: RemoteEndpoint) -> Result<()> {
        let peer = peer.into();
        if peer.trim().is_empty() {
            return Err(ObjectError::invalid("peer name must not be empty"));
        }
        self.peers.lock().await.insert(peer, endpoint);
        Ok(())
    }

    /// Removes a peer; later dispatches to it fail as unreachable.
    pub async fn unregister_peer(&self, peer: &str) -> bool {
        self.peers.lock().await.remove(peer).is_some()
    }

    async fn peer(&self, peer: &str) -> Result<RemoteEndpoint> {
        let peers = self.peers.lock().await;
        peers
            .get(peer)
            .cloned()
            .ok_or_else(|| ObjectError::remote(format!("peer '{peer}' is not reachable")))
    }
}

#[async_trait]
impl RemoteTransport for InMemoryTransport {
    async fn dispatch(&self, target_peer: &str, envelope: RemoteEnvelope) -> Result<RemoteReply> {
        let endpoint = self.peer(target_peer).await?;

        let request = serde_json::to_vec(&envelope)?;
        let received: RemoteEnvelope = serde_json::from_slice(&request)?;
        let reply = endpoint.handle(received).await;

        let response = serde_json::to_vec(&reply)?;
        Ok(serde_json::from_slice(&response)?)
    }
}

/// HTTP transport posting envelopes to a peer's dispatch route.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    dispatch_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ObjectError::remote(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            dispatch_url: format!("{}{}", base_url.trim_end_matches('/'), DISPATCH_PATH),
        })
    }

    pub fn dispatch_url(&self) -> &str {
        &self.dispatch_url
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn dispatch(&self, target_peer: &str, envelope: RemoteEnvelope) -> Result<RemoteReply> {
        let response = self
            .client
            .post(&self.dispatch_url)
            .header(PEER_HEADER, target_peer)
            .json(&envelope)
            .send()
            .await
            .map_err(|err| {
                ObjectError::remote(format!("request to {} failed: {err}", self.dispatch_url))
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| {
            ObjectError::remote(format!("reading reply from {} failed: {err}", self.dispatch_url))
        })?;

        // Faults come back with non-2xx statuses but still carry a reply body.
        serde_json::from_slice(&body).map_err(|_| {
            ObjectError::remote(format!(
                "peer at {} answered HTTP {} without a dispatch reply",
                self.dispatch_url, status
            ))
        })
    }
}

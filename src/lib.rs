// ============================================================================
// Key pair objects
// ============================================================================
//
// Versioned key pair objects whose verbs run either directly against a
// record store or through a remote dispatch shim, with identical results.

pub mod config;
pub mod context;
pub mod core;
pub mod objects;
pub mod remote;
pub mod store;

// Re-export main types for convenience
pub use config::ObjectsConfig;
pub use context::{CallerIdentity, ExecutionMode, RequestContext};
pub use crate::core::{FaultKind, FieldValue, KeyPairField, ObjectError, Result};
pub use objects::{KeyPair, KeyPairList, KeyPairState};
pub use store::{KeyPairRow, KeyPairStore, MemoryKeyPairStore, NewKeyPair};

// Re-export the remote dispatch surface
pub use remote::{
    HttpTransport, InMemoryTransport, RemoteCall, RemoteEndpoint, RemoteEnvelope,
    RemoteKeyPairStore, RemoteReply, RemoteTransport,
};

/// Wires a local store behind an in-process remote peer.
///
/// Returns a context whose verbs travel through the full envelope encoding
/// and the peer endpoint, but never leave the process. Useful for exercising
/// remote mode without a network.
///
/// # Examples
///
/// ```
/// use keypair_objects::{CallerIdentity, ExecutionMode, KeyPair, MemoryKeyPairStore, in_process_remote};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let ctx = in_process_remote(
///     CallerIdentity::for_user("fake-user"),
///     Arc::new(MemoryKeyPairStore::new()),
/// )
/// .await?;
/// assert_eq!(ctx.mode(), ExecutionMode::Remote);
///
/// let mut keypair = KeyPair::new();
/// keypair.set_name("foo-keypair");
/// keypair.set_public_key("keydata");
/// keypair.create(&ctx).await?;
/// assert_eq!(keypair.user_id(), Some("fake-user"));
/// # Ok::<(), keypair_objects::ObjectError>(())
/// # }).unwrap();
/// ```
pub async fn in_process_remote(
    caller: CallerIdentity,
    store: std::sync::Arc<dyn KeyPairStore>,
) -> Result<RequestContext> {
    const PEER: &str = "in-process";

    let transport = InMemoryTransport::new();
    transport.register_peer(PEER, RemoteEndpoint::new(store)).await?;
    let shim = RemoteKeyPairStore::new(std::sync::Arc::new(transport), PEER);
    Ok(RequestContext::remote(caller, std::sync::Arc::new(shim)))
}

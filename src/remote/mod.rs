//! Remote dispatch of key pair store calls.
//!
//! The [`RemoteKeyPairStore`] shim turns each store call into a
//! [`RemoteEnvelope`], hands it to a [`RemoteTransport`], and unpacks the
//! [`RemoteReply`]. On the far side a [`RemoteEndpoint`] runs the call against
//! the peer's own store.

pub mod endpoint;
pub mod shim;
pub mod transport;
pub mod wire;

pub use endpoint::{DISPATCH_PATH, DispatchResponse, RemoteEndpoint};
pub use shim::RemoteKeyPairStore;
pub use transport::{HttpTransport, InMemoryTransport, PEER_HEADER, RemoteTransport};
pub use wire::{RemoteCall, RemoteEnvelope, RemoteFault, RemoteReply, WIRE_PROTOCOL_VERSION};

use super::transport::PEER_HEADER;
use super::wire::{RemoteCall, RemoteEnvelope, RemoteReply};
use crate::core::{FaultKind, ObjectError, Result};
use crate::store::KeyPairStore;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, Level, event, info_span};

/// Route served by [`RemoteEndpoint::router`].
pub const DISPATCH_PATH: &str = "/v1/dispatch";

/// Peer-side executor for remote envelopes.
///
/// Rebuilds the caller identity carried by the envelope and runs the call
/// against the peer's own store. Failures never escape as transport errors:
/// they are encoded as [`RemoteReply::Fault`] so the caller re-raises the
/// same variant.
#[derive(Clone)]
pub struct RemoteEndpoint {
    store: Arc<dyn KeyPairStore>,
    peer_name: Option<String>,
}

impl RemoteEndpoint {
    pub fn new(store: Arc<dyn KeyPairStore>) -> Self {
        Self {
            store,
            peer_name: None,
        }
    }

    /// Names this peer; HTTP envelopes addressed to another peer are refused.
    pub fn with_peer_name(mut self, name: impl Into<String>) -> Self {
        self.peer_name = Some(name.into());
        self
    }

    pub fn peer_name(&self) -> Option<&str> {
        self.peer_name.as_deref()
    }

    /// Checks the peer an HTTP request was addressed to.
    ///
    /// An unnamed endpoint serves any address.
    fn accept_address(&self, addressed_to: Option<&str>) -> Result<()> {
        match (self.peer_name.as_deref(), addressed_to) {
            (None, _) => Ok(()),
            (Some(own), Some(target)) if own == target => Ok(()),
            (Some(own), target) => Err(ObjectError::remote(format!(
                "envelope addressed to peer '{}' reached peer '{own}'",
                target.unwrap_or("")
            ))),
        }
    }

    pub async fn handle(&self, envelope: RemoteEnvelope) -> RemoteReply {
        let span = info_span!(
            "remote.endpoint.handle",
            envelope_id = %envelope.envelope_id,
            method = envelope.call.method(),
            request_id = %envelope.caller.request_id()
        );

        async move {
            match self.execute(envelope).await {
                Ok(reply) => {
                    event!(Level::DEBUG, "remote envelope served");
                    reply
                }
                Err(err) => {
                    event!(Level::WARN, error = %err, "remote envelope failed");
                    RemoteReply::fault(&err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, envelope: RemoteEnvelope) -> Result<RemoteReply> {
        envelope.check_compatible()?;
        let caller = &envelope.caller;
        let store = self.store.as_ref();

        let reply = match envelope.call {
            RemoteCall::KeyPairGet { user_id, name } => {
                RemoteReply::Row(store.key_pair_get(caller, &user_id, &name).await?)
            }
            RemoteCall::KeyPairCreate { values } => {
                RemoteReply::Row(store.key_pair_create(caller, values).await?)
            }
            RemoteCall::KeyPairDestroy { user_id, name } => {
                store.key_pair_destroy(caller, &user_id, &name).await?;
                RemoteReply::Done
            }
            RemoteCall::KeyPairGetAllByUser { user_id } => {
                RemoteReply::Rows(store.key_pair_get_all_by_user(caller, &user_id).await?)
            }
            RemoteCall::KeyPairCountByUser { user_id } => {
                RemoteReply::Count(store.key_pair_count_by_user(caller, &user_id).await?)
            }
        };
        Ok(reply)
    }

    /// HTTP binding: `POST /v1/dispatch` with a JSON [`RemoteEnvelope`].
    pub fn router(self) -> axum::Router {
        axum::Router::new()
            .route(DISPATCH_PATH, axum::routing::post(dispatch))
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }
}

async fn dispatch(
    State(endpoint): State<RemoteEndpoint>,
    headers: HeaderMap,
    Json(envelope): Json<RemoteEnvelope>,
) -> DispatchResponse {
    let addressed_to = headers
        .get(PEER_HEADER)
        .and_then(|value| value.to_str().ok());
    if let Err(err) = endpoint.accept_address(addressed_to) {
        event!(
            Level::WARN,
            error = %err,
            envelope_id = %envelope.envelope_id,
            "misaddressed envelope refused"
        );
        return DispatchResponse(RemoteReply::fault(&err));
    }
    DispatchResponse(endpoint.handle(envelope).await)
}

/// HTTP response wrapper; the body is always the JSON reply.
pub struct DispatchResponse(pub RemoteReply);

impl IntoResponse for DispatchResponse {
    fn into_response(self) -> Response {
        let status = match self.0.fault_kind() {
            None => StatusCode::OK,
            Some(FaultKind::NotFound) => StatusCode::NOT_FOUND,
            Some(FaultKind::Duplicate) => StatusCode::CONFLICT,
            Some(FaultKind::Invalid) => StatusCode::UNPROCESSABLE_ENTITY,
            Some(FaultKind::RemoteDispatch) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(self.0)).into_response()
    }
}

//! Per-call execution context.
//!
//! A [`RequestContext`] carries who is calling ([`CallerIdentity`]) and where
//! the call executes. Local contexts talk to a [`KeyPairStore`] directly;
//! remote contexts go through the [`RemoteKeyPairStore`] shim, which exposes
//! the same surface and forwards each call to a peer.

use crate::config::ObjectsConfig;
use crate::core::{ObjectError, Result};
use crate::remote::{HttpTransport, RemoteKeyPairStore};
use crate::store::KeyPairStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Identity and authorization data propagated with every call.
///
/// This part of the context is serialized into remote envelopes; the peer
/// rebuilds it verbatim before touching its store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    user_id: Option<String>,
    project_id: Option<String>,
    is_admin: bool,
    request_id: Uuid,
}

impl CallerIdentity {
    /// Administrative caller with no user binding.
    pub fn admin() -> Self {
        Self {
            user_id: None,
            project_id: None,
            is_admin: true,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            project_id: None,
            is_admin: false,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Local,
    Remote,
}

impl ExecutionMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = ObjectError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(ObjectError::invalid(format!(
                "unknown execution mode '{other}', expected 'local' or 'remote'"
            ))),
        }
    }
}

#[derive(Clone)]
enum ExecutionBackend {
    Local(Arc<dyn KeyPairStore>),
    Remote(Arc<RemoteKeyPairStore>),
}

/// Caller identity plus the execution channel every object verb uses.
#[derive(Clone)]
pub struct RequestContext {
    caller: CallerIdentity,
    backend: ExecutionBackend,
}

impl RequestContext {
    /// Executes verbs directly against `store`.
    pub fn local(caller: CallerIdentity, store: Arc<dyn KeyPairStore>) -> Self {
        Self {
            caller,
            backend: ExecutionBackend::Local(store),
        }
    }

    /// Forwards verbs through the remote dispatch shim.
    pub fn remote(caller: CallerIdentity, shim: Arc<RemoteKeyPairStore>) -> Self {
        Self {
            caller,
            backend: ExecutionBackend::Remote(shim),
        }
    }

    /// Builds a context from configuration.
    ///
    /// Local mode binds `local_store`; remote mode builds an HTTP transport to
    /// the configured peer and ignores `local_store`.
    pub fn from_config(
        caller: CallerIdentity,
        config: &ObjectsConfig,
        local_store: Option<Arc<dyn KeyPairStore>>,
    ) -> Result<Self> {
        config.validate()?;
        match config.mode {
            ExecutionMode::Local => {
                let store = local_store.ok_or_else(|| {
                    ObjectError::invalid("local execution requires a key pair store")
                })?;
                Ok(Self::local(caller, store))
            }
            ExecutionMode::Remote => {
                let url = config.remote_url.as_deref().ok_or_else(|| {
                    ObjectError::invalid("remote execution requires remote_url")
                })?;
                let transport = HttpTransport::new(url, config.request_timeout)?;
                let shim = RemoteKeyPairStore::new(Arc::new(transport), config.remote_peer.clone())
                    .with_timeout(config.request_timeout);
                Ok(Self::remote(caller, Arc::new(shim)))
            }
        }
    }

    pub fn caller(&self) -> &CallerIdentity {
        &self.caller
    }

    pub fn mode(&self) -> ExecutionMode {
        match self.backend {
            ExecutionBackend::Local(_) => ExecutionMode::Local,
            ExecutionBackend::Remote(_) => ExecutionMode::Remote,
        }
    }

    /// Same execution channel, different caller.
    pub fn with_caller(&self, caller: CallerIdentity) -> Self {
        Self {
            caller,
            backend: self.backend.clone(),
        }
    }

    /// The store surface selected by this context's mode.
    pub(crate) fn store(&self) -> &dyn KeyPairStore {
        match &self.backend {
            ExecutionBackend::Local(store) => store.as_ref(),
            ExecutionBackend::Remote(shim) => shim.as_ref(),
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("caller", &self.caller)
            .field("mode", &self.mode())
            .finish()
    }
}

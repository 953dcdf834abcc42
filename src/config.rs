use crate::context::ExecutionMode;
use crate::core::{ObjectError, Result};
use std::time::Duration;

pub const ENV_MODE: &str = "KEYPAIR_OBJECTS_MODE";
pub const ENV_REMOTE_URL: &str = "KEYPAIR_OBJECTS_REMOTE_URL";
pub const ENV_TIMEOUT_MS: &str = "KEYPAIR_OBJECTS_TIMEOUT_MS";

const URL_SCHEME: &str = "keypair+";

/// Object layer configuration
///
/// Selects where object verbs execute and how long a remote dispatch may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectsConfig {
    /// Local store access or remote dispatch
    pub mode: ExecutionMode,

    /// Base URL of the peer dispatch endpoint (remote mode only)
    pub remote_url: Option<String>,

    /// Logical name of the remote peer, sent with every envelope. Named
    /// endpoints refuse envelopes addressed to another peer.
    pub remote_peer: String,

    /// Upper bound for one remote round trip
    pub request_timeout: Duration,
}

impl ObjectsConfig {
    /// Local execution with default timeouts
    pub fn new() -> Self {
        Self {
            mode: ExecutionMode::Local,
            remote_url: None,
            remote_peer: "conductor".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Switch to remote execution against `url`
    pub fn remote(mut self, url: &str) -> Self {
        self.mode = ExecutionMode::Remote;
        self.remote_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// Switch back to local execution
    pub fn local(mut self) -> Self {
        self.mode = ExecutionMode::Local;
        self
    }

    /// Set the remote peer name
    pub fn remote_peer(mut self, peer: &str) -> Self {
        self.remote_peer = peer.to_string();
        self
    }

    /// Set the remote request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Parse a remote endpoint URL
    ///
    /// Format: `keypair+http://host:port[/path][?timeout_ms=N]`
    ///
    /// # Examples
    ///
    /// ```
    /// # use keypair_objects::{ExecutionMode, ObjectsConfig};
    /// let config = ObjectsConfig::from_url("keypair+http://conductor:8774?timeout_ms=500").unwrap();
    /// assert_eq!(config.mode, ExecutionMode::Remote);
    /// assert_eq!(config.remote_url.as_deref(), Some("http://conductor:8774"));
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let Some(rest) = url.strip_prefix(URL_SCHEME) else {
            return Err(ObjectError::invalid(format!(
                "URL must start with '{URL_SCHEME}http://' or '{URL_SCHEME}https://'"
            )));
        };
        if !(rest.starts_with("http://") || rest.starts_with("https://")) {
            return Err(ObjectError::invalid("unsupported transport scheme"));
        }

        let (base, query) = match rest.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (rest, None),
        };
        let host = base.split_once("://").map(|(_, host)| host).unwrap_or("");
        if host.is_empty() || host.starts_with('/') {
            return Err(ObjectError::invalid("URL is missing a host"));
        }

        let mut config = Self::new().remote(base);
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            match pair.split_once('=') {
                Some(("timeout_ms", value)) => {
                    config.request_timeout = Duration::from_millis(parse_millis(value)?);
                }
                Some(("peer", value)) => config.remote_peer = value.to_string(),
                _ => {
                    return Err(ObjectError::invalid(format!(
                        "unsupported URL parameter '{pair}'"
                    )));
                }
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from `KEYPAIR_OBJECTS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        if let Some(mode) = lookup(ENV_MODE) {
            config.mode = mode.parse()?;
        }
        if let Some(url) = lookup(ENV_REMOTE_URL) {
            config.remote_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
            config.request_timeout = Duration::from_millis(parse_millis(&timeout)?);
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.mode == ExecutionMode::Remote && self.remote_url.is_none() {
            return Err(ObjectError::invalid("remote mode requires remote_url"));
        }

        if self.remote_peer.trim().is_empty() {
            return Err(ObjectError::invalid("remote_peer cannot be empty"));
        }

        if self.request_timeout.is_zero() {
            return Err(ObjectError::invalid("request_timeout must be > 0"));
        }

        Ok(())
    }
}

impl Default for ObjectsConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_millis(value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ObjectError::invalid(format!("invalid timeout '{value}'")))
}

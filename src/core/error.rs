use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Invalid: {0}")]
    Invalid(String),

    #[error("Remote dispatch failed: {0}")]
    RemoteDispatch(String),
}

pub type Result<T> = std::result::Result<T, ObjectError>;

/// Stable machine-readable classification of an [`ObjectError`].
///
/// This is what crosses the wire when a remote peer reports a failure, so the
/// caller can rebuild the exact same variant on its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    NotFound,
    Duplicate,
    Invalid,
    RemoteDispatch,
}

impl ObjectError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::Duplicate(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteDispatch(message.into())
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            Self::NotFound(_) => FaultKind::NotFound,
            Self::Duplicate(_) => FaultKind::Duplicate,
            Self::Invalid(_) => FaultKind::Invalid,
            Self::RemoteDispatch(_) => FaultKind::RemoteDispatch,
        }
    }

    /// Returns the detail message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(message)
            | Self::Duplicate(message)
            | Self::Invalid(message)
            | Self::RemoteDispatch(message) => message,
        }
    }

    /// Rebuilds an error from its wire classification.
    pub fn from_kind(kind: FaultKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            FaultKind::NotFound => Self::NotFound(message),
            FaultKind::Duplicate => Self::Duplicate(message),
            FaultKind::Invalid => Self::Invalid(message),
            FaultKind::RemoteDispatch => Self::RemoteDispatch(message),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_remote_dispatch(&self) -> bool {
        matches!(self, Self::RemoteDispatch(_))
    }
}

impl From<serde_json::Error> for ObjectError {
    fn from(err: serde_json::Error) -> Self {
        Self::RemoteDispatch(format!("wire payload could not be decoded: {err}"))
    }
}

//! JSON wire format shared by the dispatch shim and peer endpoints.

use crate::context::CallerIdentity;
use crate::core::{FaultKind, ObjectError, Result};
use crate::objects::KeyPair;
use crate::store::{KeyPairRow, NewKeyPair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope format revision; peers reject anything else.
pub const WIRE_PROTOCOL_VERSION: u32 = 1;

/// One store operation to run on the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RemoteCall {
    KeyPairGet { user_id: String, name: String },
    KeyPairCreate { values: NewKeyPair },
    KeyPairDestroy { user_id: String, name: String },
    KeyPairGetAllByUser { user_id: String },
    KeyPairCountByUser { user_id: String },
}

impl RemoteCall {
    pub const fn method(&self) -> &'static str {
        match self {
            Self::KeyPairGet { .. } => "key_pair_get",
            Self::KeyPairCreate { .. } => "key_pair_create",
            Self::KeyPairDestroy { .. } => "key_pair_destroy",
            Self::KeyPairGetAllByUser { .. } => "key_pair_get_all_by_user",
            Self::KeyPairCountByUser { .. } => "key_pair_count_by_user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEnvelope {
    pub envelope_id: Uuid,
    pub protocol_version: u32,
    pub object_name: String,
    pub object_version: String,
    pub caller: CallerIdentity,
    pub call: RemoteCall,
    pub sent_at: DateTime<Utc>,
}

impl RemoteEnvelope {
    pub fn new(caller: CallerIdentity, call: RemoteCall) -> Self {
        Self {
            envelope_id: Uuid::new_v4(),
            protocol_version: WIRE_PROTOCOL_VERSION,
            object_name: KeyPair::OBJECT_NAME.to_string(),
            object_version: KeyPair::VERSION.to_string(),
            caller,
            call,
            sent_at: Utc::now(),
        }
    }

    /// Checks that this peer can serve the envelope.
    ///
    /// Minor object versions are compatible; the major component must match.
    pub fn check_compatible(&self) -> Result<()> {
        if self.protocol_version != WIRE_PROTOCOL_VERSION {
            return Err(ObjectError::remote(format!(
                "unsupported protocol version {} (peer speaks {})",
                self.protocol_version, WIRE_PROTOCOL_VERSION
            )));
        }
        if self.object_name != KeyPair::OBJECT_NAME {
            return Err(ObjectError::remote(format!(
                "peer does not serve object '{}'",
                self.object_name
            )));
        }
        if major_version(&self.object_version) != major_version(KeyPair::VERSION) {
            return Err(ObjectError::remote(format!(
                "incompatible {} version {} (peer has {})",
                KeyPair::OBJECT_NAME,
                self.object_version,
                KeyPair::VERSION
            )));
        }
        Ok(())
    }
}

fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Failure reported by a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFault {
    pub kind: FaultKind,
    pub message: String,
}

impl RemoteFault {
    pub fn into_error(self) -> ObjectError {
        ObjectError::from_kind(self.kind, self.message)
    }
}

impl From<&ObjectError> for RemoteFault {
    fn from(err: &ObjectError) -> Self {
        Self {
            kind: err.kind(),
            message: err.message().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", content = "data", rename_all = "snake_case")]
pub enum RemoteReply {
    Row(KeyPairRow),
    Rows(Vec<KeyPairRow>),
    Count(u64),
    Done,
    Fault(RemoteFault),
}

impl RemoteReply {
    pub fn fault(err: &ObjectError) -> Self {
        Self::Fault(RemoteFault::from(err))
    }

    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Fault(fault) => Some(fault.kind),
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Row(_) => "row",
            Self::Rows(_) => "rows",
            Self::Count(_) => "count",
            Self::Done => "done",
            Self::Fault(_) => "fault",
        }
    }

    fn unexpected(self, wanted: &str) -> ObjectError {
        match self {
            Self::Fault(fault) => fault.into_error(),
            other => ObjectError::remote(format!(
                "peer answered with '{}' where '{}' was expected",
                other.kind_name(),
                wanted
            )),
        }
    }

    pub fn into_row(self) -> Result<KeyPairRow> {
        match self {
            Self::Row(row) => Ok(row),
            other => Err(other.unexpected("row")),
        }
    }

    pub fn into_rows(self) -> Result<Vec<KeyPairRow>> {
        match self {
            Self::Rows(rows) => Ok(rows),
            other => Err(other.unexpected("rows")),
        }
    }

    pub fn into_count(self) -> Result<u64> {
        match self {
            Self::Count(count) => Ok(count),
            other => Err(other.unexpected("count")),
        }
    }

    pub fn into_done(self) -> Result<()> {
        match self {
            Self::Done => Ok(()),
            other => Err(other.unexpected("done")),
        }
    }
}

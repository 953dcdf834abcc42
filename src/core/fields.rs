//! Declared field schema for key pair objects.
//!
//! Objects, rows and the wire format all agree on one static field table
//! ([`KeyPairField::ALL`]). Reconciliation and equality checks iterate that
//! table instead of inspecting values at runtime.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPairField {
    Id,
    Name,
    UserId,
    Fingerprint,
    PublicKey,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
    Deleted,
}

impl KeyPairField {
    /// Every declared field, in schema order.
    pub const ALL: [KeyPairField; 9] = [
        KeyPairField::Id,
        KeyPairField::Name,
        KeyPairField::UserId,
        KeyPairField::Fingerprint,
        KeyPairField::PublicKey,
        KeyPairField::CreatedAt,
        KeyPairField::UpdatedAt,
        KeyPairField::DeletedAt,
        KeyPairField::Deleted,
    ];

    /// Fields a caller may set before `create`; everything else is store-assigned.
    pub const CALLER_SETTABLE: [KeyPairField; 3] = [
        KeyPairField::UserId,
        KeyPairField::Name,
        KeyPairField::PublicKey,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::UserId => "user_id",
            Self::Fingerprint => "fingerprint",
            Self::PublicKey => "public_key",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::DeletedAt => "deleted_at",
            Self::Deleted => "deleted",
        }
    }

    pub fn is_caller_settable(self) -> bool {
        Self::CALLER_SETTABLE.contains(&self)
    }

    pub const fn is_timestamp(self) -> bool {
        matches!(self, Self::CreatedAt | Self::UpdatedAt | Self::DeletedAt)
    }
}

impl fmt::Display for KeyPairField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed value of one declared field.
///
/// Timestamps are held timezone-naive (UTC wall clock), so two values taken
/// from differently encoded sources compare equal when they denote the same
/// instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Null,
}

impl FieldValue {
    pub fn timestamp<Tz: TimeZone>(value: &DateTime<Tz>) -> Self {
        Self::Timestamp(normalize_timestamp(value))
    }

    pub fn optional_timestamp(value: Option<NaiveDateTime>) -> Self {
        value.map_or(Self::Null, Self::Timestamp)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.f")),
            Self::Null => f.write_str("null"),
        }
    }
}

/// Drops the timezone from a timestamp, keeping the UTC wall-clock value.
pub fn normalize_timestamp<Tz: TimeZone>(value: &DateTime<Tz>) -> NaiveDateTime {
    value.naive_utc()
}

pub mod error;
pub mod fields;

pub use error::{FaultKind, ObjectError, Result};
pub use fields::{FieldValue, KeyPairField, normalize_timestamp};

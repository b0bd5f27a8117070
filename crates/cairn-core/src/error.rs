//! Error types for `cairn-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A read or write against a field the entity never declared.
  /// Always a programming or schema defect, never user-recoverable.
  #[error("unknown attribute: {0:?}")]
  UnknownAttribute(String),

  #[error("invalid value for attribute {field:?}: {reason}")]
  InvalidAttributeValue { field: String, reason: String },

  #[error("unknown entity type discriminant: {0:?}")]
  UnknownEntityType(String),

  /// A persisted-only operation was attempted on an object that has not
  /// been assigned an identity yet.
  #[error("business object has no identity assigned")]
  MissingIdentity,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

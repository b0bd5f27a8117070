//! Error type for `cairn-store-sqlite`.

use cairn_core::repository::RepositoryError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cairn_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored row that violates the schema's own invariants.
  #[error("corrupt row: {0}")]
  Corrupt(String),

  #[error("entity not found: {0}")]
  NotFound(Uuid),

  #[error(
    "version conflict on entity {id}: expected version {expected}, found {found}"
  )]
  VersionConflict { id: Uuid, expected: u32, found: u32 },
}

impl From<Error> for RepositoryError {
  fn from(err: Error) -> Self {
    match err {
      Error::NotFound(id) => RepositoryError::NotFound(id),
      Error::VersionConflict { id, expected, found } => {
        RepositoryError::VersionConflict { id, expected, found }
      }
      Error::Core(e) => RepositoryError::Domain(e),
      other => RepositoryError::Storage(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every response body is a JSON:API error document; statuses and codes
//! come from the central message registry.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use cairn_core::{
  message::{ErrorDetail, ErrorDocument, MessageCode},
  repository::RepositoryError,
};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Field-level validation failures; rendered as an unprocessable-entity
  /// document carrying every violation.
  #[error("validation failed")]
  Validation(Vec<ErrorDetail>),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<RepositoryError> for ApiError {
  fn from(err: RepositoryError) -> Self {
    match err {
      RepositoryError::NotFound(id) => {
        Self::NotFound(format!("entity {id} not found"))
      }
      conflict @ RepositoryError::VersionConflict { .. } => {
        Self::Conflict(conflict.to_string())
      }
      RepositoryError::Domain(e) => Self::Internal(Box::new(e)),
      RepositoryError::Storage(e) => Self::Internal(e),
    }
  }
}

impl From<cairn_core::Error> for ApiError {
  fn from(err: cairn_core::Error) -> Self {
    Self::Internal(Box::new(err))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, errors) = match self {
      ApiError::NotFound(detail) => (
        StatusCode::NOT_FOUND,
        vec![coded(MessageCode::RecordNotFound, detail)],
      ),
      ApiError::Conflict(detail) => (
        StatusCode::CONFLICT,
        vec![coded(MessageCode::RecordVersionConflict, detail)],
      ),
      ApiError::BadRequest(detail) => (
        StatusCode::BAD_REQUEST,
        vec![coded(MessageCode::BadRequestBody, detail)],
      ),
      ApiError::Validation(errors) => {
        (StatusCode::UNPROCESSABLE_ENTITY, errors)
      }
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed with internal error");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          vec![ErrorDetail::from_code(MessageCode::InternalStorageFailure)],
        )
      }
    };
    (status, Json(ErrorDocument { errors })).into_response()
  }
}

/// Registry entry for `code`, with the generic detail text replaced by the
/// request-specific one.
fn coded(code: MessageCode, detail: String) -> ErrorDetail {
  let mut entry = ErrorDetail::from_code(code);
  entry.detail = Some(detail);
  entry
}

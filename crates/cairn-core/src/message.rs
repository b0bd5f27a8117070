//! The central message-code registry and the JSON:API error shapes.
//!
//! Every rejection the system can emit is named by a [`MessageCode`] with a
//! stable numeric value; the registry maps each code to its HTTP status,
//! title and detail text exactly once, so wire responses never embed
//! hand-written strings at the call site.

use serde::{Deserialize, Serialize};

// ─── Message codes ───────────────────────────────────────────────────────────

/// Closed set of rejection codes. Numeric values are part of the API
/// contract and must never be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCode {
  // ── Validation (10xxx) ────────────────────────────────────────────────
  ValidationMandatoryFieldMissing,
  ValidationInvalidEmailFormat,
  ValidationInvalidDateTimeFormat,
  ValidationInvalidBooleanValue,
  ValidationInvalidIntegerValue,
  ValidationInvalidReferenceValue,
  ValidationInvalidCodeValue,
  ValidationValueTooLong,

  // ── Resource faults (20xxx) ───────────────────────────────────────────
  RecordNotFound,
  RecordVersionConflict,
  BadRequestBody,

  // ── Server faults (50xxx) ─────────────────────────────────────────────
  InternalStorageFailure,
}

/// Registry entry for one message code.
#[derive(Debug, Clone, Copy)]
pub struct MessageDetail {
  pub http_status: u16,
  pub title:       &'static str,
  pub detail:      &'static str,
}

impl MessageCode {
  pub fn code(self) -> u32 {
    match self {
      Self::ValidationMandatoryFieldMissing => 10002,
      Self::ValidationInvalidEmailFormat => 10003,
      Self::ValidationInvalidDateTimeFormat => 10004,
      Self::ValidationInvalidBooleanValue => 10005,
      Self::ValidationInvalidIntegerValue => 10006,
      Self::ValidationInvalidReferenceValue => 10007,
      Self::ValidationInvalidCodeValue => 10008,
      Self::ValidationValueTooLong => 10009,
      Self::RecordNotFound => 20001,
      Self::RecordVersionConflict => 20002,
      Self::BadRequestBody => 20003,
      Self::InternalStorageFailure => 50001,
    }
  }

  /// Look up the registry entry for this code.
  pub fn details(self) -> MessageDetail {
    match self {
      Self::ValidationMandatoryFieldMissing => MessageDetail {
        http_status: 422,
        title:       "Required field missing",
        detail:      "A mandatory field was not supplied in the request.",
      },
      Self::ValidationInvalidEmailFormat => MessageDetail {
        http_status: 422,
        title:       "Invalid email address",
        detail:      "The supplied value is not a valid email address.",
      },
      Self::ValidationInvalidDateTimeFormat => MessageDetail {
        http_status: 422,
        title:       "Invalid date/time value",
        detail:      "The supplied value is not an RFC 3339 date/time.",
      },
      Self::ValidationInvalidBooleanValue => MessageDetail {
        http_status: 422,
        title:       "Invalid boolean value",
        detail:      "The supplied value must be true or false.",
      },
      Self::ValidationInvalidIntegerValue => MessageDetail {
        http_status: 422,
        title:       "Invalid integer value",
        detail:      "The supplied value must be a whole number.",
      },
      Self::ValidationInvalidReferenceValue => MessageDetail {
        http_status: 422,
        title:       "Invalid entity reference",
        detail:      "The supplied value is not a well-formed identifier.",
      },
      Self::ValidationInvalidCodeValue => MessageDetail {
        http_status: 422,
        title:       "Invalid code value",
        detail:      "The supplied value is not one of the permitted codes.",
      },
      Self::ValidationValueTooLong => MessageDetail {
        http_status: 422,
        title:       "Value too long",
        detail:      "The supplied value exceeds the maximum field length.",
      },
      Self::RecordNotFound => MessageDetail {
        http_status: 404,
        title:       "Record not found",
        detail:      "No record exists with the requested identifier.",
      },
      Self::RecordVersionConflict => MessageDetail {
        http_status: 409,
        title:       "Version conflict",
        detail:      "The record was modified by another request.",
      },
      Self::BadRequestBody => MessageDetail {
        http_status: 400,
        title:       "Malformed request",
        detail:      "The request document could not be interpreted.",
      },
      Self::InternalStorageFailure => MessageDetail {
        http_status: 500,
        title:       "Storage failure",
        detail:      "",
      },
    }
  }
}

// ─── Error document shapes ───────────────────────────────────────────────────

/// JSON:API error source — a pointer into the offending request document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSource {
  pub pointer: String,
}

/// One transport-agnostic structured failure unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source: Option<ErrorSource>,
  /// HTTP-status-like code, serialised as a string per JSON:API.
  pub status: String,
  pub code:   String,
  pub title:  String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,
}

impl ErrorDetail {
  /// An error attributed to one request attribute, with the standard
  /// `/data/attributes/{field}` pointer.
  pub fn for_field(field: &str, code: MessageCode) -> Self {
    let mut detail = Self::from_code(code);
    detail.source = Some(ErrorSource {
      pointer: format!("/data/attributes/{field}"),
    });
    detail
  }

  /// An error with no source pointer (resource-level faults).
  pub fn from_code(code: MessageCode) -> Self {
    let entry = code.details();
    Self {
      source: None,
      status: entry.http_status.to_string(),
      code:   code.code().to_string(),
      title:  entry.title.to_owned(),
      detail: (!entry.detail.is_empty()).then(|| entry.detail.to_owned()),
    }
  }
}

/// Top-level JSON:API error document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDocument {
  pub errors: Vec<ErrorDetail>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_error_carries_registry_entry_and_pointer() {
    let err = ErrorDetail::for_field(
      "username",
      MessageCode::ValidationMandatoryFieldMissing,
    );
    assert_eq!(
      err.source.unwrap().pointer,
      "/data/attributes/username"
    );
    assert_eq!(err.status, "422");
    assert_eq!(err.code, "10002");
    assert_eq!(err.title, "Required field missing");
    assert!(err.detail.is_some());
  }

  #[test]
  fn empty_registry_detail_is_omitted() {
    let err = ErrorDetail::from_code(MessageCode::InternalStorageFailure);
    assert_eq!(err.status, "500");
    assert!(err.detail.is_none());
  }
}

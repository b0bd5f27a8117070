//! Audit trail types — the who/when/why record attached to every mutation.
//!
//! Exactly one [`AuditTrail`] exists per mutation event. A business object's
//! `audit` relation always references the trail of its *most recent*
//! mutation; earlier trails remain reachable through the historical
//! snapshots they key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a mutation entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
  /// A request made through the public API.
  Api,
  /// An internally-generated mutation (maintenance, migration).
  System,
}

impl TransactionSource {
  /// The discriminant string stored in the `source` column.
  pub fn tag(self) -> &'static str {
    match self {
      Self::Api => "api",
      Self::System => "system",
    }
  }

  pub fn from_tag(s: &str) -> Option<Self> {
    match s {
      "api" => Some(Self::Api),
      "system" => Some(Self::System),
      _ => None,
    }
  }
}

/// The persisted record of one mutation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
  pub transaction_id: Uuid,
  /// The acting user on whose behalf the mutation ran.
  pub user_id:        Uuid,
  /// Operation reason code, e.g. `user_create_new_record`.
  pub reason:         String,
  pub timestamp:      DateTime<Utc>,
  pub source:         TransactionSource,
}

/// Caller-supplied context for one state-changing operation. The repository
/// converts it into the stored [`AuditTrail`] verbatim.
#[derive(Debug, Clone)]
pub struct AuditContext {
  pub transaction_id: Uuid,
  pub user_id:        Uuid,
  pub reason:         String,
  pub timestamp:      DateTime<Utc>,
  pub source:         TransactionSource,
}

impl AuditContext {
  /// Context with a fresh transaction id and the current time.
  pub fn new(
    user_id: Uuid,
    reason: impl Into<String>,
    source: TransactionSource,
  ) -> Self {
    Self {
      transaction_id: Uuid::new_v4(),
      user_id,
      reason: reason.into(),
      timestamp: Utc::now(),
      source,
    }
  }

  pub fn into_trail(self) -> AuditTrail {
    AuditTrail {
      transaction_id: self.transaction_id,
      user_id:        self.user_id,
      reason:         self.reason,
      timestamp:      self.timestamp,
      source:         self.source,
    }
  }
}

//! Historical snapshots — frozen copies of superseded business-object state.
//!
//! Every successful update or delete archives the full pre-mutation state
//! before the new state becomes visible. Snapshots are append-only; nothing
//! ever mutates or deletes one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::business::EntityType;

/// One archived version of a business object.
///
/// Keyed by the transaction id of the audit trail that *produced* the
/// archived state — i.e. the prior transaction, not the one that replaced
/// it. The `state` map is restricted to the variant's declared snapshot
/// shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalSnapshot {
  pub transaction_id: Uuid,
  pub entity_id:      Uuid,
  pub entity_type:    EntityType,
  /// The version number the object held while this state was current.
  pub version:        u32,
  pub state:          Map<String, Value>,
  /// When the snapshot was written (the moment of supersession).
  pub recorded_at:    DateTime<Utc>,
}

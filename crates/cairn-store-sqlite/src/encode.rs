//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings; UUIDs are hyphenated lowercase; the
//! variant attribute map is compact JSON.

use cairn_core::{
  audit::{AuditTrail, TransactionSource},
  business::{BusinessObject, EntityType},
  history::HistoricalSnapshot,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Ok(Uuid::parse_str(s)?)
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Filter parameters ───────────────────────────────────────────────────────

/// Convert a JSON filter value into a bindable SQLite value. Booleans bind
/// as integers to match the `deleted` column encoding.
pub fn encode_param(value: &Value) -> rusqlite::types::Value {
  match value {
    Value::Null => rusqlite::types::Value::Null,
    Value::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => rusqlite::types::Value::Integer(i),
      None => rusqlite::types::Value::Real(n.as_f64().unwrap_or(0.0)),
    },
    Value::String(s) => rusqlite::types::Value::Text(s.clone()),
    other => rusqlite::types::Value::Text(other.to_string()),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from an `entities` row joined with its current audit
/// trail.
pub struct RawEntityRow {
  pub id:             String,
  pub entity_type:    String,
  pub sub_type:       Option<String>,
  pub version:        u32,
  pub deleted:        bool,
  pub attributes:     String,
  // audit_trail join
  pub transaction_id: String,
  pub user_id:        String,
  pub reason:         String,
  pub source:         String,
  pub recorded_at:    String,
}

impl RawEntityRow {
  pub fn into_business(self) -> Result<BusinessObject> {
    let entity_type = EntityType::from_tag(&self.entity_type)?;

    let mut data: Map<String, Value> = serde_json::from_str(&self.attributes)?;
    data.insert("id".to_owned(), Value::String(self.id));
    data.insert("version".to_owned(), Value::from(self.version));
    data.insert("deleted".to_owned(), Value::Bool(self.deleted));
    if let Some(sub_type) = self.sub_type {
      data.insert("subType".to_owned(), Value::String(sub_type));
    }

    let mut obj = BusinessObject::new(entity_type, &data)?;
    obj.set_audit(AuditTrail {
      transaction_id: decode_uuid(&self.transaction_id)?,
      user_id:        decode_uuid(&self.user_id)?,
      reason:         self.reason,
      timestamp:      decode_dt(&self.recorded_at)?,
      source:         TransactionSource::from_tag(&self.source).ok_or_else(
        || Error::Corrupt(format!("unknown transaction source: {:?}", self.source)),
      )?,
    });
    Ok(obj)
  }
}

/// Raw strings read from an `entity_history` row.
pub struct RawSnapshotRow {
  pub transaction_id: String,
  pub entity_id:      String,
  pub entity_type:    String,
  pub version:        u32,
  pub state:          String,
  pub recorded_at:    String,
}

impl RawSnapshotRow {
  pub fn into_snapshot(self) -> Result<HistoricalSnapshot> {
    Ok(HistoricalSnapshot {
      transaction_id: decode_uuid(&self.transaction_id)?,
      entity_id:      decode_uuid(&self.entity_id)?,
      entity_type:    EntityType::from_tag(&self.entity_type)?,
      version:        self.version,
      state:          serde_json::from_str(&self.state)?,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}

//! Business objects — identity, version, discriminator, soft-delete and
//! audit on top of the attribute model.
//!
//! Variants form a closed, explicit registry: the `type` discriminant is
//! data, resolved once through [`EntityType::schema`] to select which field
//! schema, searchable set, relations and snapshot shape apply. There is no
//! inheritance-style dispatch anywhere.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
  Error, Result,
  attr::{AttributeSet, FieldDef},
  audit::AuditTrail,
};

// ─── Base fields ─────────────────────────────────────────────────────────────

fn set_version(attrs: &mut AttributeSet, value: Value) -> Result<()> {
  match value.as_u64() {
    Some(v) if v >= 1 => {
      attrs.store("version", Value::from(v));
      Ok(())
    }
    _ => Err(Error::InvalidAttributeValue {
      field:  "version".to_owned(),
      reason: "must be a positive integer".to_owned(),
    }),
  }
}

fn set_deleted(attrs: &mut AttributeSet, value: Value) -> Result<()> {
  match value {
    Value::Bool(_) => {
      attrs.store("deleted", value);
      Ok(())
    }
    _ => Err(Error::InvalidAttributeValue {
      field:  "deleted".to_owned(),
      reason: "must be a boolean".to_owned(),
    }),
  }
}

/// Fields shared by every business object, in declaration order.
/// `version` and `deleted` route writes through validating accessors.
pub static BASE_FIELDS: &[FieldDef] = &[
  FieldDef::direct("id"),
  FieldDef::custom("version", None, Some(set_version)),
  FieldDef::direct("type"),
  FieldDef::direct("subType"),
  FieldDef::custom("deleted", None, Some(set_deleted)),
];

pub fn is_base_field(name: &str) -> bool {
  BASE_FIELDS.iter().any(|d| d.name == name)
}

// ─── Relations ───────────────────────────────────────────────────────────────

/// Where a relation's target identifier comes from.
#[derive(Debug, Clone, Copy)]
pub enum RelationSource {
  /// Resolved from the audit trail's acting user.
  AuditUser,
  /// Resolved from a uuid-valued attribute on the object itself.
  Attribute(&'static str),
}

/// One declared relation on a variant.
#[derive(Debug, Clone, Copy)]
pub struct RelationDef {
  pub name:   &'static str,
  pub target: EntityType,
  pub source: RelationSource,
}

// ─── Variant registry ────────────────────────────────────────────────────────

/// The discriminator tag selecting which field schema and snapshot shape
/// apply to a business object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
  User,
  Person,
  Account,
  Tag,
}

/// Everything a variant declares about itself.
pub struct VariantSchema {
  pub entity_type:     EntityType,
  /// Variant-specific fields; the full public set is [`BASE_FIELDS`] ∪
  /// these, never more, never fewer.
  pub fields:          &'static [FieldDef],
  /// Fields a free-text search matches against.
  pub searchable:      &'static [&'static str],
  pub relations:       &'static [RelationDef],
  /// The shape of this variant's historical snapshot records.
  pub snapshot_fields: &'static [&'static str],
}

static USER_SCHEMA: VariantSchema = VariantSchema {
  entity_type:     EntityType::User,
  fields:          &[
    FieldDef::direct("username"),
    FieldDef::direct("timezoneCode"),
    FieldDef::direct("localeCode"),
    FieldDef::direct("active"),
    FieldDef::direct("securityGroupId"),
    FieldDef::direct("registeredDateTime"),
  ],
  searchable:      &["username"],
  relations:       &[RelationDef {
    name:   "updatedBy",
    target: EntityType::User,
    source: RelationSource::AuditUser,
  }],
  snapshot_fields: &[
    "id",
    "version",
    "type",
    "subType",
    "deleted",
    "username",
    "timezoneCode",
    "localeCode",
    "active",
    "securityGroupId",
    "registeredDateTime",
  ],
};

static PERSON_SCHEMA: VariantSchema = VariantSchema {
  entity_type:     EntityType::Person,
  fields:          &[
    FieldDef::direct("title"),
    FieldDef::direct("firstName"),
    FieldDef::direct("lastName"),
    FieldDef::direct("position"),
    FieldDef::direct("userId"),
  ],
  searchable:      &["firstName", "lastName", "position"],
  relations:       &[
    RelationDef {
      name:   "user",
      target: EntityType::User,
      source: RelationSource::Attribute("userId"),
    },
    RelationDef {
      name:   "updatedBy",
      target: EntityType::User,
      source: RelationSource::AuditUser,
    },
  ],
  snapshot_fields: &[
    "id",
    "version",
    "type",
    "subType",
    "deleted",
    "title",
    "firstName",
    "lastName",
    "position",
    "userId",
  ],
};

static ACCOUNT_SCHEMA: VariantSchema = VariantSchema {
  entity_type:     EntityType::Account,
  fields:          &[
    FieldDef::direct("name"),
    FieldDef::direct("description"),
    FieldDef::direct("ownerId"),
  ],
  searchable:      &["name", "description"],
  relations:       &[
    RelationDef {
      name:   "owner",
      target: EntityType::Person,
      source: RelationSource::Attribute("ownerId"),
    },
    RelationDef {
      name:   "updatedBy",
      target: EntityType::User,
      source: RelationSource::AuditUser,
    },
  ],
  snapshot_fields: &[
    "id",
    "version",
    "type",
    "subType",
    "deleted",
    "name",
    "description",
    "ownerId",
  ],
};

static TAG_SCHEMA: VariantSchema = VariantSchema {
  entity_type:     EntityType::Tag,
  fields:          &[FieldDef::direct("text")],
  searchable:      &["text"],
  relations:       &[RelationDef {
    name:   "updatedBy",
    target: EntityType::User,
    source: RelationSource::AuditUser,
  }],
  snapshot_fields: &["id", "version", "type", "subType", "deleted", "text"],
};

impl EntityType {
  /// The discriminant string stored in the `type` column.
  /// Must match the `rename_all = "lowercase"` serde tags above.
  pub fn tag(self) -> &'static str {
    match self {
      Self::User => "user",
      Self::Person => "person",
      Self::Account => "account",
      Self::Tag => "tag",
    }
  }

  pub fn from_tag(s: &str) -> Result<Self> {
    match s {
      "user" => Ok(Self::User),
      "person" => Ok(Self::Person),
      "account" => Ok(Self::Account),
      "tag" => Ok(Self::Tag),
      other => Err(Error::UnknownEntityType(other.to_owned())),
    }
  }

  /// The URL collection segment for this variant.
  pub fn collection(self) -> &'static str {
    match self {
      Self::User => "users",
      Self::Person => "people",
      Self::Account => "accounts",
      Self::Tag => "tags",
    }
  }

  /// Resolve the discriminator to its declared schema.
  pub fn schema(self) -> &'static VariantSchema {
    match self {
      Self::User => &USER_SCHEMA,
      Self::Person => &PERSON_SCHEMA,
      Self::Account => &ACCOUNT_SCHEMA,
      Self::Tag => &TAG_SCHEMA,
    }
  }
}

// ─── BusinessObject ──────────────────────────────────────────────────────────

/// One record in the logical business-object collection, discriminated by
/// [`EntityType`].
#[derive(Debug, Clone)]
pub struct BusinessObject {
  entity_type: EntityType,
  attrs:       AttributeSet,
  audit:       Option<AuditTrail>,
}

impl BusinessObject {
  /// Build an object of the given variant from a field map.
  ///
  /// `version` defaults to 1 and `deleted` to false only when the caller
  /// did not supply them; an explicitly supplied value is never
  /// overwritten. The discriminator slot is always set canonically from
  /// `entity_type`.
  pub fn new(entity_type: EntityType, data: &Map<String, Value>) -> Result<Self> {
    let schema = entity_type.schema();
    let mut attrs = AttributeSet::new(BASE_FIELDS, schema.fields);
    attrs.populate(data)?;

    attrs.store("type", Value::String(entity_type.tag().to_owned()));
    if attrs.slot("version").is_none() {
      attrs.store("version", Value::from(1u32));
    }
    if attrs.slot("deleted").is_none() {
      attrs.store("deleted", Value::Bool(false));
    }

    Ok(Self { entity_type, attrs, audit: None })
  }

  pub fn entity_type(&self) -> EntityType {
    self.entity_type
  }

  pub fn schema(&self) -> &'static VariantSchema {
    self.entity_type.schema()
  }

  // ── Attribute access ──────────────────────────────────────────────────

  pub fn get(&self, name: &str) -> Result<Option<Value>> {
    self.attrs.get(name)
  }

  pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
    self.attrs.set(name, value)
  }

  pub fn populate(&mut self, source: &Map<String, Value>) -> Result<()> {
    self.attrs.populate(source)
  }

  /// All public fields currently holding a value.
  pub fn export(&self) -> Map<String, Value> {
    self.attrs.export()
  }

  /// Exported fields minus the shared base fields — what the storage layer
  /// keeps in the variant attributes column.
  pub fn variant_attributes(&self) -> Map<String, Value> {
    let mut out = self.export();
    out.retain(|k, _| !is_base_field(k));
    out
  }

  /// The pre-mutation state to archive, restricted to the variant's
  /// declared snapshot shape.
  pub fn snapshot_state(&self) -> Map<String, Value> {
    let shape = self.schema().snapshot_fields;
    let mut out = self.export();
    out.retain(|k, _| shape.contains(&k.as_str()));
    out
  }

  // ── Typed accessors over the base slots ───────────────────────────────

  pub fn id(&self) -> Option<Uuid> {
    self
      .attrs
      .slot("id")
      .and_then(Value::as_str)
      .and_then(|s| Uuid::parse_str(s).ok())
  }

  pub fn set_id(&mut self, id: Uuid) {
    self
      .attrs
      .store("id", Value::String(id.hyphenated().to_string()));
  }

  /// The identity, or [`Error::MissingIdentity`] for an unpersisted object.
  pub fn require_id(&self) -> Result<Uuid> {
    self.id().ok_or(Error::MissingIdentity)
  }

  pub fn version(&self) -> u32 {
    self
      .attrs
      .slot("version")
      .and_then(Value::as_u64)
      .unwrap_or(1) as u32
  }

  pub fn set_version(&mut self, version: u32) {
    self.attrs.store("version", Value::from(version));
  }

  pub fn deleted(&self) -> bool {
    self
      .attrs
      .slot("deleted")
      .and_then(Value::as_bool)
      .unwrap_or(false)
  }

  pub fn set_deleted(&mut self, deleted: bool) {
    self.attrs.store("deleted", Value::Bool(deleted));
  }

  pub fn sub_type(&self) -> Option<&str> {
    self.attrs.slot("subType").and_then(Value::as_str)
  }

  // ── Audit relation ────────────────────────────────────────────────────

  /// The audit trail of the most recent mutation. `None` only before the
  /// object has been persisted.
  pub fn audit(&self) -> Option<&AuditTrail> {
    self.audit.as_ref()
  }

  pub fn set_audit(&mut self, audit: AuditTrail) {
    self.audit = Some(audit);
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn map(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
  }

  #[test]
  fn construction_defaults_version_and_deleted() {
    let obj =
      BusinessObject::new(EntityType::User, &map(json!({ "username": "alice" })))
        .unwrap();
    assert_eq!(obj.version(), 1);
    assert!(!obj.deleted());
    assert_eq!(obj.get("type").unwrap(), Some(json!("user")));
  }

  #[test]
  fn construction_keeps_explicit_version_and_deleted() {
    let data = map(json!({ "username": "alice", "version": 4, "deleted": true }));
    let obj = BusinessObject::new(EntityType::User, &data).unwrap();
    assert_eq!(obj.version(), 4);
    assert!(obj.deleted());
  }

  #[test]
  fn version_accessor_rejects_junk() {
    let mut obj =
      BusinessObject::new(EntityType::User, &Map::new()).unwrap();
    let err = obj.set("version", json!("two")).unwrap_err();
    assert!(matches!(err, Error::InvalidAttributeValue { .. }));
    let err = obj.set("version", json!(0)).unwrap_err();
    assert!(matches!(err, Error::InvalidAttributeValue { .. }));
  }

  #[test]
  fn variant_fields_are_closed_per_type() {
    let mut obj =
      BusinessObject::new(EntityType::Tag, &Map::new()).unwrap();
    obj.set("text", json!("robotics")).unwrap();
    // A user field is unknown on a tag.
    assert!(matches!(
      obj.set("username", json!("alice")),
      Err(Error::UnknownAttribute(_))
    ));
  }

  #[test]
  fn variant_attributes_excludes_base_fields() {
    let mut obj =
      BusinessObject::new(EntityType::Account, &map(json!({ "name": "Acme" })))
        .unwrap();
    obj.set_id(Uuid::new_v4());

    let extra = obj.variant_attributes();
    assert_eq!(extra.len(), 1);
    assert!(extra.contains_key("name"));

    let full = obj.export();
    assert!(full.contains_key("id"));
    assert!(full.contains_key("version"));
  }

  #[test]
  fn snapshot_state_follows_declared_shape() {
    let data = map(json!({ "text": "robotics" }));
    let mut obj = BusinessObject::new(EntityType::Tag, &data).unwrap();
    obj.set_id(Uuid::new_v4());

    let state = obj.snapshot_state();
    assert!(state.contains_key("id"));
    assert!(state.contains_key("version"));
    assert!(state.contains_key("deleted"));
    assert!(state.contains_key("text"));
  }

  #[test]
  fn discriminator_round_trips() {
    for et in [
      EntityType::User,
      EntityType::Person,
      EntityType::Account,
      EntityType::Tag,
    ] {
      assert_eq!(EntityType::from_tag(et.tag()).unwrap(), et);
    }
    assert!(EntityType::from_tag("widget").is_err());
  }
}

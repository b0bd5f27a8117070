//! JSON:API document shapes.
//!
//! These are plain serde types; all construction logic lives in
//! [`crate::transform`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─── Resource identifiers ────────────────────────────────────────────────────

/// A `{type, id}` pair naming one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
  #[serde(rename = "type")]
  pub resource_type: String,
  pub id:            String,
}

// ─── Relationships ───────────────────────────────────────────────────────────

/// Relationship linkage — one identifier for to-one relations, an array
/// for to-many.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
  One(ResourceIdentifier),
  Many(Vec<ResourceIdentifier>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipLinks {
  #[serde(rename = "self")]
  pub self_link: String,
  pub related:   String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
  pub links: RelationshipLinks,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data:  Option<RelationshipData>,
}

// ─── Resource documents ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLinks {
  #[serde(rename = "self")]
  pub self_link: String,
}

/// One JSON:API resource object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDocument {
  pub id:            String,
  #[serde(rename = "type")]
  pub resource_type: String,
  pub attributes:    Map<String, Value>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub relationships: BTreeMap<String, Relationship>,
  pub links:         ResourceLinks,
}

/// Top-level document wrapping a single resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleDocument {
  pub data: ResourceDocument,
}

// ─── Collections ─────────────────────────────────────────────────────────────

/// Page-size/offset pagination links for a collection response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionLinks {
  #[serde(rename = "self")]
  pub self_link: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub prev:      Option<String>,
}

/// Top-level document wrapping a resource collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDocument {
  pub data:  Vec<ResourceDocument>,
  pub links: CollectionLinks,
}

//! The resource transformer — projects a business object into a JSON:API
//! resource document.
//!
//! Attributes, relationships and links are computed independently. The full
//! attribute and relationship maps are always built first and any sparse
//! fieldset is applied afterwards; construct-then-filter keeps every
//! variant free of bespoke pre-filtering logic at the cost of computing
//! fields that may be discarded.

use std::collections::BTreeMap;

use cairn_core::{
  business::{BusinessObject, EntityType, RelationSource},
  repository::Page,
};
use uuid::Uuid;

use crate::document::{
  CollectionDocument, CollectionLinks, Relationship, RelationshipData,
  RelationshipLinks, ResourceDocument, ResourceIdentifier, ResourceLinks,
};

// ─── Request context ─────────────────────────────────────────────────────────

/// Per-request transformation inputs: the link base and any sparse
/// fieldsets, keyed by resource type.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
  base_url: String,
  fields:   BTreeMap<String, Vec<String>>,
}

impl RequestContext {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into().trim_end_matches('/').to_owned(),
      fields:   BTreeMap::new(),
    }
  }

  /// Attach the sparse fieldsets parsed from `fields[{type}]` parameters.
  pub fn with_fields(mut self, fields: BTreeMap<String, Vec<String>>) -> Self {
    self.fields = fields;
    self
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn fieldset(&self, resource_type: &str) -> Option<&[String]> {
    self.fields.get(resource_type).map(Vec::as_slice)
  }
}

// ─── Single resource ─────────────────────────────────────────────────────────

/// Project one persisted business object into a resource document.
///
/// Only ever invoked on objects that have passed validation and been
/// persisted; an object without an identity is a programming defect.
pub fn transform(
  obj: &BusinessObject,
  ctx: &RequestContext,
) -> Result<ResourceDocument, cairn_core::Error> {
  let id = obj.require_id()?.hyphenated().to_string();
  let resource_type = obj.entity_type().tag().to_owned();
  let collection = obj.entity_type().collection();
  let base = ctx.base_url();

  // Full attribute map first; identity and discriminator fields are not
  // attributes.
  let mut attributes = obj.export();
  attributes.remove("id");
  attributes.remove("type");
  attributes.remove("subType");

  // Full relationship map, one entry per declared relation.
  let mut relationships = BTreeMap::new();
  for rel in obj.schema().relations {
    let target = match rel.source {
      RelationSource::AuditUser => obj.audit().map(|a| a.user_id),
      RelationSource::Attribute(field) => obj
        .get(field)?
        .and_then(|v| v.as_str().and_then(|s| Uuid::parse_str(s).ok())),
    };
    let data = target.map(|target_id| {
      RelationshipData::One(ResourceIdentifier {
        resource_type: rel.target.tag().to_owned(),
        id:            target_id.hyphenated().to_string(),
      })
    });
    relationships.insert(rel.name.to_owned(), Relationship {
      links: RelationshipLinks {
        self_link: format!(
          "{base}/{collection}/{id}/relationships/{}",
          rel.name
        ),
        related:   format!("{base}/{collection}/{id}/{}", rel.name),
      },
      data,
    });
  }

  // Sparse fieldsets filter both maps down to the named fields.
  if let Some(fieldset) = ctx.fieldset(&resource_type) {
    attributes.retain(|name, _| fieldset.iter().any(|f| f == name));
    relationships.retain(|name, _| fieldset.iter().any(|f| f == name));
  }

  Ok(ResourceDocument {
    links: ResourceLinks { self_link: format!("{base}/{collection}/{id}") },
    id,
    resource_type,
    attributes,
    relationships,
  })
}

// ─── Collections ─────────────────────────────────────────────────────────────

/// Project a listing into a collection document with pagination links.
///
/// `next` appears when the page came back full (a further page may exist);
/// `prev` whenever the offset is non-zero. Unbounded listings carry only a
/// self link.
pub fn transform_collection(
  entity_type: EntityType,
  objects: &[BusinessObject],
  ctx: &RequestContext,
  page: Page,
) -> Result<CollectionDocument, cairn_core::Error> {
  let data = objects
    .iter()
    .map(|obj| transform(obj, ctx))
    .collect::<Result<Vec<_>, _>>()?;

  let base = ctx.base_url();
  let collection = entity_type.collection();

  let links = if page.is_unbounded() {
    CollectionLinks {
      self_link: format!("{base}/{collection}"),
      next:      None,
      prev:      None,
    }
  } else {
    let size = page.size;
    let page_link =
      |offset: u64| format!("{base}/{collection}?page[size]={size}&page[offset]={offset}");
    CollectionLinks {
      self_link: page_link(page.offset),
      next:      (data.len() as i64 == size)
        .then(|| page_link(page.offset + size as u64)),
      prev:      (page.offset > 0)
        .then(|| page_link(page.offset.saturating_sub(size as u64))),
    }
  };

  Ok(CollectionDocument { data, links })
}

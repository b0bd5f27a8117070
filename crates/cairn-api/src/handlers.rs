//! Handlers for the resource collection endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/{collection}` | `?search=`, `?sort=`, `?page[size]=`, `?page[offset]=`, `?fields[{type}]=` |
//! | `POST`   | `/{collection}` | JSON:API body; 201 + document, or 422 |
//! | `GET`    | `/{collection}/{id}` | 404 if not found |
//! | `PATCH`  | `/{collection}/{id}` | Optional `meta.version` compare-and-swap |
//! | `DELETE` | `/{collection}/{id}` | Soft delete; 204 |
//!
//! The acting user for the audit trail is taken from the `x-cairn-user`
//! header, populated by the authentication layer in front of this router.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use cairn_core::{
  audit::{AuditContext, TransactionSource},
  business::EntityType,
  repository::{EntityRepository, Ordering, Page},
};
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
  document::{CollectionDocument, SingleDocument},
  error::ApiError,
  service::{Outcome, ResourcePayload, ResourceService},
  transform::{self, RequestContext},
};

/// Header carrying the authenticated caller's user id.
pub const ACTING_USER_HEADER: &str = "x-cairn-user";

// ─── State ───────────────────────────────────────────────────────────────────

/// One resource service per collection, plus the link base for generated
/// documents.
pub struct Services<R> {
  users:    ResourceService<R>,
  people:   ResourceService<R>,
  accounts: ResourceService<R>,
  tags:     ResourceService<R>,
  base_url: String,
}

impl<R: EntityRepository> Services<R> {
  pub fn new(
    base_url: impl Into<String>,
    users: R,
    people: R,
    accounts: R,
    tags: R,
  ) -> Self {
    Self {
      users:    ResourceService::new(EntityType::User, users),
      people:   ResourceService::new(EntityType::Person, people),
      accounts: ResourceService::new(EntityType::Account, accounts),
      tags:     ResourceService::new(EntityType::Tag, tags),
      base_url: base_url.into(),
    }
  }

  fn for_collection(
    &self,
    collection: &str,
  ) -> Result<&ResourceService<R>, ApiError> {
    match collection {
      "users" => Ok(&self.users),
      "people" => Ok(&self.people),
      "accounts" => Ok(&self.accounts),
      "tags" => Ok(&self.tags),
      other => {
        Err(ApiError::NotFound(format!("unknown collection {other:?}")))
      }
    }
  }
}

// ─── Request parsing ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct ListQuery {
  page:   Page,
  order:  Vec<Ordering>,
  search: Vec<String>,
  fields: BTreeMap<String, Vec<String>>,
}

/// Parse the supported query parameters. Unknown parameters are ignored.
fn parse_query(params: &BTreeMap<String, String>) -> Result<ListQuery, ApiError> {
  let mut query = ListQuery {
    page:   Page::unbounded(),
    order:  Vec::new(),
    search: Vec::new(),
    fields: BTreeMap::new(),
  };

  for (key, value) in params {
    match key.as_str() {
      "page[size]" => {
        query.page.size = value.parse().map_err(|_| {
          ApiError::BadRequest("page[size] must be an integer".to_owned())
        })?;
      }
      "page[offset]" => {
        query.page.offset = value.parse().map_err(|_| {
          ApiError::BadRequest(
            "page[offset] must be a non-negative integer".to_owned(),
          )
        })?;
      }
      "sort" => {
        query.order = value
          .split(',')
          .map(str::trim)
          .filter(|s| !s.is_empty())
          .map(|term| match term.strip_prefix('-') {
            Some(field) => Ordering::descending(field),
            None => Ordering::ascending(term),
          })
          .collect();
      }
      "search" => {
        query.search = value
          .split(',')
          .map(str::trim)
          .filter(|s| !s.is_empty())
          .map(str::to_owned)
          .collect();
      }
      key if key.starts_with("fields[") && key.ends_with(']') => {
        let resource_type = &key["fields[".len()..key.len() - 1];
        query.fields.insert(
          resource_type.to_owned(),
          value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        );
      }
      _ => {}
    }
  }

  Ok(query)
}

/// JSON:API request body for create, update and delete.
#[derive(Debug, Deserialize)]
pub struct RequestBody {
  pub data: RequestData,
}

#[derive(Debug, Deserialize)]
pub struct RequestData {
  #[serde(rename = "type")]
  pub resource_type: Option<String>,
  pub id:            Option<String>,
  #[serde(default)]
  pub attributes:    Map<String, Value>,
  #[serde(default)]
  pub meta:          RequestMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestMeta {
  /// Expected current version; supplies the optimistic-lock check.
  pub version: Option<u32>,
}

impl RequestBody {
  fn into_payload(self) -> ResourcePayload {
    ResourcePayload {
      attributes: self.data.attributes,
      version:    self.data.meta.version,
    }
  }
}

/// Reject bodies whose resource type contradicts the collection in the
/// URL.
fn check_resource_type<R: EntityRepository>(
  body: &RequestBody,
  service: &ResourceService<R>,
) -> Result<(), ApiError> {
  if let Some(tag) = &body.data.resource_type {
    if tag != service.entity_type().tag() {
      return Err(ApiError::BadRequest(format!(
        "resource type {tag:?} does not belong to this collection"
      )));
    }
  }
  Ok(())
}

fn audit_context(
  headers: &HeaderMap,
  entity_type: EntityType,
  action: &str,
) -> Result<AuditContext, ApiError> {
  let user_id = headers
    .get(ACTING_USER_HEADER)
    .and_then(|v| v.to_str().ok())
    .and_then(|s| Uuid::parse_str(s).ok())
    .ok_or_else(|| {
      ApiError::BadRequest(format!(
        "missing or invalid {ACTING_USER_HEADER} header"
      ))
    })?;
  Ok(AuditContext::new(
    user_id,
    format!("{}_{action}", entity_type.tag()),
    TransactionSource::Api,
  ))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /{collection}` — listing, or free-text search when `?search=` is
/// present.
pub async fn list<R>(
  State(services): State<Arc<Services<R>>>,
  Path(collection): Path<String>,
  Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<CollectionDocument>, ApiError>
where
  R: EntityRepository + 'static,
{
  let service = services.for_collection(&collection)?;
  let query = parse_query(&params)?;

  let objects = if query.search.is_empty() {
    service.all(&[], &query.order, query.page).await?
  } else {
    service.search(&query.search, &query.order, query.page).await?
  };

  let ctx =
    RequestContext::new(&services.base_url).with_fields(query.fields);
  let doc = transform::transform_collection(
    service.entity_type(),
    &objects,
    &ctx,
    query.page,
  )?;
  Ok(Json(doc))
}

// ─── Show ────────────────────────────────────────────────────────────────────

/// `GET /{collection}/{id}`
pub async fn show<R>(
  State(services): State<Arc<Services<R>>>,
  Path((collection, id)): Path<(String, Uuid)>,
  Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<SingleDocument>, ApiError>
where
  R: EntityRepository + 'static,
{
  let service = services.for_collection(&collection)?;
  let obj = service
    .find(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("entity {id} not found")))?;

  let query = parse_query(&params)?;
  let ctx =
    RequestContext::new(&services.base_url).with_fields(query.fields);
  Ok(Json(SingleDocument { data: transform::transform(&obj, &ctx)? }))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /{collection}` — 201 with the stored resource, or 422 with the
/// full validation error document.
pub async fn create<R>(
  State(services): State<Arc<Services<R>>>,
  Path(collection): Path<String>,
  headers: HeaderMap,
  Json(body): Json<RequestBody>,
) -> Result<impl IntoResponse, ApiError>
where
  R: EntityRepository + 'static,
{
  let service = services.for_collection(&collection)?;
  check_resource_type(&body, service)?;
  let audit =
    audit_context(&headers, service.entity_type(), "create_new_record")?;

  match service.create(body.into_payload(), audit).await? {
    Outcome::Success(obj) => {
      let ctx = RequestContext::new(&services.base_url);
      Ok((
        StatusCode::CREATED,
        Json(SingleDocument { data: transform::transform(&obj, &ctx)? }),
      ))
    }
    Outcome::Rejected(errors) => Err(ApiError::Validation(errors)),
  }
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /{collection}/{id}`
pub async fn update<R>(
  State(services): State<Arc<Services<R>>>,
  Path((collection, id)): Path<(String, Uuid)>,
  headers: HeaderMap,
  Json(body): Json<RequestBody>,
) -> Result<Json<SingleDocument>, ApiError>
where
  R: EntityRepository + 'static,
{
  let service = services.for_collection(&collection)?;
  check_resource_type(&body, service)?;
  let audit =
    audit_context(&headers, service.entity_type(), "update_existing_record")?;

  match service.update(id, body.into_payload(), audit).await? {
    Outcome::Success(obj) => {
      let ctx = RequestContext::new(&services.base_url);
      Ok(Json(SingleDocument { data: transform::transform(&obj, &ctx)? }))
    }
    Outcome::Rejected(errors) => Err(ApiError::Validation(errors)),
  }
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /{collection}/{id}` — soft delete; the body is optional and
/// carries only audit metadata.
pub async fn destroy<R>(
  State(services): State<Arc<Services<R>>>,
  Path((collection, id)): Path<(String, Uuid)>,
  headers: HeaderMap,
  body: Option<Json<RequestBody>>,
) -> Result<StatusCode, ApiError>
where
  R: EntityRepository + 'static,
{
  let service = services.for_collection(&collection)?;
  let audit =
    audit_context(&headers, service.entity_type(), "delete_existing_record")?;
  let payload = match body {
    Some(Json(body)) => body.into_payload(),
    None => ResourcePayload::default(),
  };

  match service.delete(id, payload, audit).await? {
    Outcome::Success(_) => Ok(StatusCode::NO_CONTENT),
    Outcome::Rejected(errors) => Err(ApiError::Validation(errors)),
  }
}

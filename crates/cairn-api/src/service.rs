//! The resource service — CRUD orchestration over one repository.
//!
//! Every state-changing operation validates first and only then delegates;
//! on invalid input nothing reaches storage. Validation failures are
//! returned as data ([`Outcome::Rejected`]), never raised as errors;
//! repository faults (not-found, version conflicts, storage failures)
//! propagate unchanged and are never downgraded into validation errors.

use cairn_core::{
  audit::AuditContext,
  business::{BusinessObject, EntityType},
  history::HistoricalSnapshot,
  message::ErrorDetail,
  repository::{
    EntityRepository, Filter, Ordering, Page, RepositoryError,
  },
  validation::{RuleBook, RuleGroup, Validation},
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::rules;

// ─── Payload & outcome ───────────────────────────────────────────────────────

/// The validated portion of a JSON:API request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourcePayload {
  #[serde(default)]
  pub attributes: Map<String, Value>,
  /// Expected current version for compare-and-swap updates and deletes.
  /// Absent means last-writer-wins under the repository's transaction.
  pub version:    Option<u32>,
}

impl ResourcePayload {
  pub fn new(attributes: Map<String, Value>) -> Self {
    Self { attributes, version: None }
  }
}

/// The result of a state-changing operation that passed through
/// validation. A rejection is plain returned data, not a fault.
#[derive(Debug)]
pub enum Outcome<T> {
  Success(T),
  Rejected(Vec<ErrorDetail>),
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// CRUD orchestration for one business-object variant.
pub struct ResourceService<R> {
  entity_type: EntityType,
  repository:  R,
  rules:       RuleBook,
}

impl<R: EntityRepository> ResourceService<R> {
  pub fn new(entity_type: EntityType, repository: R) -> Self {
    Self { entity_type, repository, rules: rules::rule_book(entity_type) }
  }

  pub fn entity_type(&self) -> EntityType {
    self.entity_type
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Filtered, ordered listing. A page size of zero or less returns the
  /// entire result set.
  pub async fn all(
    &self,
    filters: &[Filter],
    order: &[Ordering],
    page: Page,
  ) -> Result<Vec<BusinessObject>, RepositoryError> {
    self
      .repository
      .all(filters, order, page)
      .await
      .map_err(Into::into)
  }

  /// Free-text search: every term is matched partially against every
  /// searchable field, all conditions OR-combined — a record matches if
  /// any field matches any term.
  pub async fn search(
    &self,
    terms: &[String],
    order: &[Ordering],
    page: Page,
  ) -> Result<Vec<BusinessObject>, RepositoryError> {
    let mut filters = Vec::new();
    for field in self.entity_type.schema().searchable {
      for term in terms {
        filters.push(Filter::like(*field, term).or());
      }
    }
    self.all(&filters, order, page).await
  }

  pub async fn find(
    &self,
    id: Uuid,
  ) -> Result<Option<BusinessObject>, RepositoryError> {
    self.repository.find(id).await.map_err(Into::into)
  }

  pub async fn find_by(
    &self,
    field: &str,
    value: Value,
  ) -> Result<Vec<BusinessObject>, RepositoryError> {
    self.repository.find_by(field, value).await.map_err(Into::into)
  }

  pub async fn find_one_by(
    &self,
    field: &str,
    value: Value,
  ) -> Result<Option<BusinessObject>, RepositoryError> {
    self
      .repository
      .find_one_by(field, value)
      .await
      .map_err(Into::into)
  }

  /// Archived versions of one object, oldest first.
  pub async fn history(
    &self,
    id: Uuid,
  ) -> Result<Vec<HistoricalSnapshot>, RepositoryError> {
    self.repository.history(id).await.map_err(Into::into)
  }

  // ── Mutations ─────────────────────────────────────────────────────────

  /// Validate with {Default, Create} and persist on success. No partial
  /// creation: a rejected payload performs no write at all.
  pub async fn create(
    &self,
    payload: ResourcePayload,
    audit: AuditContext,
  ) -> Result<Outcome<BusinessObject>, RepositoryError> {
    match self
      .rules
      .validate(&payload.attributes, &[RuleGroup::Default, RuleGroup::Create])
    {
      Validation::Invalid(errors) => {
        debug!(
          entity_type = self.entity_type.tag(),
          failures = errors.len(),
          "create rejected by validation"
        );
        Ok(Outcome::Rejected(errors))
      }
      Validation::Valid => {
        let obj = self
          .repository
          .create(payload.attributes, audit)
          .await
          .map_err(Into::into)?;
        info!(
          entity_type = self.entity_type.tag(),
          id = ?obj.id(),
          "created entity"
        );
        Ok(Outcome::Success(obj))
      }
    }
  }

  /// Validate with {Default, Update} and delegate on success. The
  /// repository archives the pre-update state, applies the new values,
  /// advances the version and attaches the audit trail as one atomic
  /// unit.
  pub async fn update(
    &self,
    id: Uuid,
    payload: ResourcePayload,
    audit: AuditContext,
  ) -> Result<Outcome<BusinessObject>, RepositoryError> {
    match self
      .rules
      .validate(&payload.attributes, &[RuleGroup::Default, RuleGroup::Update])
    {
      Validation::Invalid(errors) => {
        debug!(
          entity_type = self.entity_type.tag(),
          %id,
          failures = errors.len(),
          "update rejected by validation"
        );
        Ok(Outcome::Rejected(errors))
      }
      Validation::Valid => {
        let obj = self
          .repository
          .update(id, payload.attributes, payload.version, audit)
          .await
          .map_err(Into::into)?;
        info!(
          entity_type = self.entity_type.tag(),
          %id,
          version = obj.version(),
          "updated entity"
        );
        Ok(Outcome::Success(obj))
      }
    }
  }

  /// Validate with {Default, Delete} and soft-delete on success. The row
  /// is retained with `deleted` set and the version advanced.
  pub async fn delete(
    &self,
    id: Uuid,
    payload: ResourcePayload,
    audit: AuditContext,
  ) -> Result<Outcome<BusinessObject>, RepositoryError> {
    match self
      .rules
      .validate(&payload.attributes, &[RuleGroup::Default, RuleGroup::Delete])
    {
      Validation::Invalid(errors) => Ok(Outcome::Rejected(errors)),
      Validation::Valid => {
        let obj = self
          .repository
          .delete(id, payload.attributes, payload.version, audit)
          .await
          .map_err(Into::into)?;
        info!(
          entity_type = self.entity_type.tag(),
          %id,
          version = obj.version(),
          "soft-deleted entity"
        );
        Ok(Outcome::Success(obj))
      }
    }
  }
}

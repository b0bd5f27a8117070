//! The repository contract and supporting query types.
//!
//! One repository serves one business-object variant. Implementations own
//! all storage concerns; this trait fixes the semantics they must honour:
//! update and delete are a single atomic unit that archives the
//! pre-mutation state as a historical snapshot, applies the change,
//! advances the version by exactly one and attaches a fresh audit trail —
//! a concurrent writer sees the fully-old or fully-new state, never an
//! intermediate one. Delete is always soft; the row is retained.
//!
//! All methods return `Send` futures so the trait can be used from
//! multi-threaded async runtimes (tokio with `axum`).

use std::future::Future;

use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  audit::AuditContext, business::BusinessObject, history::HistoricalSnapshot,
};

// ─── Query types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
  Eq,
  /// Partial match; the filter value carries the complete pattern.
  Like,
}

/// How a filter condition combines with the condition before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
  #[default]
  And,
  Or,
}

/// One condition restricting a result set.
#[derive(Debug, Clone)]
pub struct Filter {
  pub field:       String,
  pub comparison:  Comparison,
  pub value:       Value,
  pub conjunction: Conjunction,
}

impl Filter {
  pub fn new(
    field: impl Into<String>,
    comparison: Comparison,
    value: Value,
    conjunction: Conjunction,
  ) -> Self {
    Self { field: field.into(), comparison, value, conjunction }
  }

  pub fn eq(field: impl Into<String>, value: Value) -> Self {
    Self::new(field, Comparison::Eq, value, Conjunction::And)
  }

  /// Case-insensitive partial match on `term`.
  pub fn like(field: impl Into<String>, term: &str) -> Self {
    Self::new(
      field,
      Comparison::Like,
      Value::String(format!("%{term}%")),
      Conjunction::And,
    )
  }

  /// Switch this condition to combine with OR.
  pub fn or(mut self) -> Self {
    self.conjunction = Conjunction::Or;
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Ascending,
  Descending,
}

/// One ordering term applied to a result set.
#[derive(Debug, Clone)]
pub struct Ordering {
  pub field:     String,
  pub direction: Direction,
}

impl Ordering {
  pub fn ascending(field: impl Into<String>) -> Self {
    Self { field: field.into(), direction: Direction::Ascending }
  }

  pub fn descending(field: impl Into<String>) -> Self {
    Self { field: field.into(), direction: Direction::Descending }
  }
}

/// Page-size/offset pagination. A size of zero or less means "unbounded —
/// return the entire result set".
#[derive(Debug, Clone, Copy)]
pub struct Page {
  pub size:   i64,
  pub offset: u64,
}

impl Page {
  pub const fn new(size: i64, offset: u64) -> Self {
    Self { size, offset }
  }

  pub const fn unbounded() -> Self {
    Self { size: 0, offset: 0 }
  }

  pub fn is_unbounded(self) -> bool {
    self.size <= 0
  }
}

impl Default for Page {
  fn default() -> Self {
    Self::unbounded()
  }
}

// ─── Failure kinds ───────────────────────────────────────────────────────────

/// The typed failures a repository may signal. Implementations convert
/// their own error type into this one at the contract boundary; callers
/// above the repository must propagate these unchanged, never downgrade
/// one kind into another.
#[derive(Debug, Error)]
pub enum RepositoryError {
  #[error("entity not found: {0}")]
  NotFound(Uuid),

  /// A concurrent mutation invalidated the expected prior state. Not
  /// retried automatically at any layer above the repository.
  #[error(
    "version conflict on entity {id}: expected version {expected}, found {found}"
  )]
  VersionConflict { id: Uuid, expected: u32, found: u32 },

  #[error(transparent)]
  Domain(#[from] crate::Error),

  /// Underlying storage fault; surfaced as a server-class failure.
  #[error("storage failure: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a business-object storage backend, scoped to a single
/// variant.
pub trait EntityRepository: Send + Sync {
  type Error: std::error::Error
    + Into<RepositoryError>
    + Send
    + Sync
    + 'static;

  /// Persist a new object: id assigned, version 1, not deleted, audit
  /// trail attached from `audit`.
  fn create(
    &self,
    attributes: Map<String, Value>,
    audit: AuditContext,
  ) -> impl Future<Output = Result<BusinessObject, Self::Error>> + Send + '_;

  /// Atomically archive the pre-update state, apply `attributes`, advance
  /// the version by one and attach a fresh audit trail.
  ///
  /// When `expected_version` is supplied the update is a compare-and-swap:
  /// a mismatch against the current version fails with a version conflict
  /// and writes nothing. When absent, last-writer-wins.
  fn update(
    &self,
    id: Uuid,
    attributes: Map<String, Value>,
    expected_version: Option<u32>,
    audit: AuditContext,
  ) -> impl Future<Output = Result<BusinessObject, Self::Error>> + Send + '_;

  /// Soft-delete: the same atomic unit as `update`, setting the deleted
  /// flag instead of applying field values. The record is retained.
  fn delete(
    &self,
    id: Uuid,
    attributes: Map<String, Value>,
    expected_version: Option<u32>,
    audit: AuditContext,
  ) -> impl Future<Output = Result<BusinessObject, Self::Error>> + Send + '_;

  /// Look up a single object by id. `None` if no record exists; soft-
  /// deleted records are still returned.
  fn find(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<BusinessObject>, Self::Error>>
  + Send
  + '_;

  /// All objects whose `field` equals `value`.
  fn find_by<'a>(
    &'a self,
    field: &'a str,
    value: Value,
  ) -> impl Future<Output = Result<Vec<BusinessObject>, Self::Error>>
  + Send
  + 'a;

  /// The first object whose `field` equals `value`, if any.
  fn find_one_by<'a>(
    &'a self,
    field: &'a str,
    value: Value,
  ) -> impl Future<Output = Result<Option<BusinessObject>, Self::Error>>
  + Send
  + 'a;

  /// Filtered, ordered, paged listing over this variant.
  fn all<'a>(
    &'a self,
    filters: &'a [Filter],
    order: &'a [Ordering],
    page: Page,
  ) -> impl Future<Output = Result<Vec<BusinessObject>, Self::Error>>
  + Send
  + 'a;

  /// Archived versions of one object, oldest first.
  fn history(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<HistoricalSnapshot>, Self::Error>>
  + Send
  + '_;
}

//! [`SqliteStore`] and the per-variant [`SqliteRepository`] implementing
//! [`EntityRepository`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use serde_json::{Map, Value};
use uuid::Uuid;

use cairn_core::{
  audit::AuditContext,
  business::{self, BusinessObject, EntityType},
  history::HistoricalSnapshot,
  repository::{
    Comparison, Conjunction, Direction, EntityRepository, Filter, Ordering,
    Page,
  },
};

use crate::{
  Error, Result,
  encode::{RawEntityRow, RawSnapshotRow, encode_dt, encode_param, encode_uuid},
  schema::SCHEMA,
};

// ─── SQL fragments ───────────────────────────────────────────────────────────

const ENTITY_COLUMNS: &str = "e.id, e.type, e.sub_type, e.version, \
   e.deleted, e.attributes, a.transaction_id, a.user_id, a.reason, \
   a.source, a.recorded_at";

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntityRow> {
  Ok(RawEntityRow {
    id:             row.get(0)?,
    entity_type:    row.get(1)?,
    sub_type:       row.get(2)?,
    version:        row.get(3)?,
    deleted:        row.get(4)?,
    attributes:     row.get(5)?,
    transaction_id: row.get(6)?,
    user_id:        row.get(7)?,
    reason:         row.get(8)?,
    source:         row.get(9)?,
    recorded_at:    row.get(10)?,
  })
}

/// Resolve a declared field name to a SQL expression. Base fields map to
/// real columns; variant fields are extracted from the JSON attributes
/// column. Undeclared names are rejected, which also keeps caller-supplied
/// field names out of the SQL text.
fn column_expr(entity_type: EntityType, field: &str) -> Result<String> {
  match field {
    "id" => Ok("e.id".to_owned()),
    "version" => Ok("e.version".to_owned()),
    "type" => Ok("e.type".to_owned()),
    "subType" => Ok("e.sub_type".to_owned()),
    "deleted" => Ok("e.deleted".to_owned()),
    _ => {
      let def = entity_type
        .schema()
        .fields
        .iter()
        .find(|d| d.name == field)
        .ok_or_else(|| {
          Error::Core(cairn_core::Error::UnknownAttribute(field.to_owned()))
        })?;
      Ok(format!("json_extract(e.attributes, '$.{}')", def.name))
    }
  }
}

/// Strip the caller-immutable base fields from an incoming attribute map.
/// `subType` stays — it is the one base field callers may write.
fn sanitize(attributes: &Map<String, Value>) -> Map<String, Value> {
  let mut out = attributes.clone();
  out.retain(|k, _| k == "subType" || !business::is_base_field(k));
  out
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A cairn entity store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// A repository view over one variant. All views share the underlying
  /// connection.
  pub fn repository(&self, entity_type: EntityType) -> SqliteRepository {
    SqliteRepository { conn: self.conn.clone(), entity_type }
  }
}

// ─── Repository ──────────────────────────────────────────────────────────────

/// The SQLite-backed repository for a single business-object variant.
#[derive(Clone)]
pub struct SqliteRepository {
  conn:        tokio_rusqlite::Connection,
  entity_type: EntityType,
}

impl SqliteRepository {
  pub fn entity_type(&self) -> EntityType {
    self.entity_type
  }

  /// The shared mutation path for update and delete: inside one SQLite
  /// transaction, read the current row, run the optional version check,
  /// archive the pre-mutation state keyed by the prior transaction id,
  /// write the new audit trail, then apply the change. The snapshot is
  /// ordered strictly before the new state becomes visible.
  async fn mutate(
    &self,
    id: Uuid,
    incoming: Map<String, Value>,
    expected_version: Option<u32>,
    audit: AuditContext,
    mark_deleted: bool,
  ) -> Result<BusinessObject> {
    let entity_type = self.entity_type;
    let trail = audit.into_trail();

    let obj = self
      .conn
      .call(move |conn| {
        let result = (|| -> Result<BusinessObject> {
          let tx = conn.transaction()?;

          let raw = tx
            .query_row(
              &format!(
                "SELECT {ENTITY_COLUMNS}
                 FROM entities e
                 JOIN audit_trail a ON a.transaction_id = e.transaction_id
                 WHERE e.id = ?1 AND e.type = ?2"
              ),
              rusqlite::params![encode_uuid(id), entity_type.tag()],
              row_to_raw,
            )
            .optional()?
            .ok_or(Error::NotFound(id))?;

          let prior_txn = raw.transaction_id.clone();
          let mut obj = raw.into_business()?;

          if let Some(expected) = expected_version {
            let found = obj.version();
            if expected != found {
              return Err(Error::VersionConflict { id, expected, found });
            }
          }

          // Archive the pre-mutation state.
          let state_json = serde_json::to_string(&obj.snapshot_state())?;
          tx.execute(
            "INSERT INTO entity_history
               (transaction_id, entity_id, entity_type, version, state, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
              prior_txn,
              encode_uuid(id),
              entity_type.tag(),
              obj.version(),
              state_json,
              encode_dt(Utc::now()),
            ],
          )?;

          tx.execute(
            "INSERT INTO audit_trail
               (transaction_id, user_id, reason, source, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
              encode_uuid(trail.transaction_id),
              encode_uuid(trail.user_id),
              trail.reason,
              trail.source.tag(),
              encode_dt(trail.timestamp),
            ],
          )?;

          // Apply the mutation and advance the version.
          let next_version = obj.version() + 1;
          if mark_deleted {
            obj.set_deleted(true);
          } else {
            obj.populate(&incoming)?;
          }
          obj.set_version(next_version);

          let attrs_json = serde_json::to_string(&obj.variant_attributes())?;
          tx.execute(
            "UPDATE entities
             SET sub_type = ?1, version = ?2, deleted = ?3, attributes = ?4,
                 transaction_id = ?5
             WHERE id = ?6",
            rusqlite::params![
              obj.sub_type(),
              next_version,
              obj.deleted(),
              attrs_json,
              encode_uuid(trail.transaction_id),
              encode_uuid(id),
            ],
          )?;

          tx.commit()?;
          obj.set_audit(trail.clone());
          Ok(obj)
        })();
        Ok(result)
      })
      .await??;

    Ok(obj)
  }

  /// Build the SQL and parameter list for a filtered listing.
  fn listing_sql(
    &self,
    filters: &[Filter],
    order: &[Ordering],
    page: Page,
  ) -> Result<(String, Vec<rusqlite::types::Value>)> {
    let mut sql = format!(
      "SELECT {ENTITY_COLUMNS}
       FROM entities e
       JOIN audit_trail a ON a.transaction_id = e.transaction_id
       WHERE e.type = ?"
    );
    let mut params: Vec<rusqlite::types::Value> =
      vec![rusqlite::types::Value::Text(self.entity_type.tag().to_owned())];

    if !filters.is_empty() {
      sql.push_str(" AND (");
      for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
          sql.push_str(match filter.conjunction {
            Conjunction::And => " AND ",
            Conjunction::Or => " OR ",
          });
        }
        let expr = column_expr(self.entity_type, &filter.field)?;
        match filter.comparison {
          Comparison::Eq => sql.push_str(&format!("{expr} = ?")),
          Comparison::Like => sql.push_str(&format!("{expr} LIKE ?")),
        }
        params.push(encode_param(&filter.value));
      }
      sql.push(')');
    }

    if !order.is_empty() {
      sql.push_str(" ORDER BY ");
      for (i, ordering) in order.iter().enumerate() {
        if i > 0 {
          sql.push_str(", ");
        }
        let expr = column_expr(self.entity_type, &ordering.field)?;
        let dir = match ordering.direction {
          Direction::Ascending => "ASC",
          Direction::Descending => "DESC",
        };
        sql.push_str(&format!("{expr} {dir}"));
      }
    }

    if !page.is_unbounded() {
      sql.push_str(" LIMIT ? OFFSET ?");
      params.push(rusqlite::types::Value::Integer(page.size));
      params.push(rusqlite::types::Value::Integer(page.offset as i64));
    } else if page.offset > 0 {
      // SQLite needs a LIMIT clause to accept OFFSET; -1 means no limit.
      sql.push_str(" LIMIT -1 OFFSET ?");
      params.push(rusqlite::types::Value::Integer(page.offset as i64));
    }

    Ok((sql, params))
  }
}

// ─── EntityRepository impl ───────────────────────────────────────────────────

impl EntityRepository for SqliteRepository {
  type Error = Error;

  async fn create(
    &self,
    attributes: Map<String, Value>,
    audit: AuditContext,
  ) -> Result<BusinessObject> {
    let mut obj =
      BusinessObject::new(self.entity_type, &sanitize(&attributes))?;
    obj.set_id(Uuid::new_v4());

    let trail = audit.into_trail();
    obj.set_audit(trail.clone());

    let id_str = encode_uuid(obj.require_id()?);
    let type_tag = self.entity_type.tag();
    let sub_type = obj.sub_type().map(str::to_owned);
    let version = obj.version();
    let deleted = obj.deleted();
    let attrs_json = serde_json::to_string(&obj.variant_attributes())?;

    self
      .conn
      .call(move |conn| {
        let result = (|| -> Result<()> {
          let tx = conn.transaction()?;
          tx.execute(
            "INSERT INTO audit_trail
               (transaction_id, user_id, reason, source, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
              encode_uuid(trail.transaction_id),
              encode_uuid(trail.user_id),
              trail.reason,
              trail.source.tag(),
              encode_dt(trail.timestamp),
            ],
          )?;
          tx.execute(
            "INSERT INTO entities
               (id, type, sub_type, version, deleted, transaction_id, attributes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
              id_str,
              type_tag,
              sub_type,
              version,
              deleted,
              encode_uuid(trail.transaction_id),
              attrs_json,
            ],
          )?;
          tx.commit()?;
          Ok(())
        })();
        Ok(result)
      })
      .await??;

    Ok(obj)
  }

  async fn update(
    &self,
    id: Uuid,
    attributes: Map<String, Value>,
    expected_version: Option<u32>,
    audit: AuditContext,
  ) -> Result<BusinessObject> {
    self
      .mutate(id, sanitize(&attributes), expected_version, audit, false)
      .await
  }

  async fn delete(
    &self,
    id: Uuid,
    _attributes: Map<String, Value>,
    expected_version: Option<u32>,
    audit: AuditContext,
  ) -> Result<BusinessObject> {
    self
      .mutate(id, Map::new(), expected_version, audit, true)
      .await
  }

  async fn find(&self, id: Uuid) -> Result<Option<BusinessObject>> {
    self
      .find_one_by("id", Value::String(encode_uuid(id)))
      .await
  }

  async fn find_by(
    &self,
    field: &str,
    value: Value,
  ) -> Result<Vec<BusinessObject>> {
    let filters = [Filter::eq(field, value)];
    self.all(&filters, &[], Page::unbounded()).await
  }

  async fn find_one_by(
    &self,
    field: &str,
    value: Value,
  ) -> Result<Option<BusinessObject>> {
    let filters = [Filter::eq(field, value)];
    let mut results = self.all(&filters, &[], Page::new(1, 0)).await?;
    Ok(if results.is_empty() {
      None
    } else {
      Some(results.swap_remove(0))
    })
  }

  async fn all(
    &self,
    filters: &[Filter],
    order: &[Ordering],
    page: Page,
  ) -> Result<Vec<BusinessObject>> {
    let (sql, params) = self.listing_sql(filters, order, page)?;

    let raws: Vec<RawEntityRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), row_to_raw)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntityRow::into_business).collect()
  }

  async fn history(&self, id: Uuid) -> Result<Vec<HistoricalSnapshot>> {
    let id_str = encode_uuid(id);

    let raws: Vec<RawSnapshotRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT transaction_id, entity_id, entity_type, version, state, recorded_at
           FROM entity_history
           WHERE entity_id = ?1
           ORDER BY version ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawSnapshotRow {
              transaction_id: row.get(0)?,
              entity_id:      row.get(1)?,
              entity_type:    row.get(2)?,
              version:        row.get(3)?,
              state:          row.get(4)?,
              recorded_at:    row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSnapshotRow::into_snapshot).collect()
  }
}

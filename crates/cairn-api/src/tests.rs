//! Service and transformer tests against the in-memory SQLite store.

use cairn_core::{
  audit::{AuditContext, TransactionSource},
  business::EntityType,
  repository::{Page, RepositoryError},
};
use cairn_store_sqlite::{SqliteRepository, SqliteStore};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::{
  service::{Outcome, ResourcePayload, ResourceService},
  transform::{self, RequestContext},
};

async fn service(entity_type: EntityType) -> ResourceService<SqliteRepository> {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  ResourceService::new(entity_type, store.repository(entity_type))
}

fn ctx(reason: &str) -> AuditContext {
  AuditContext::new(Uuid::new_v4(), reason, TransactionSource::Api)
}

fn map(value: Value) -> Map<String, Value> {
  value.as_object().cloned().unwrap()
}

fn payload(value: Value) -> ResourcePayload {
  ResourcePayload::new(map(value))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_assigns_identity_version_and_audit() {
  let users = service(EntityType::User).await;
  let audit = ctx("user_create_new_record");
  let txn = audit.transaction_id;

  let outcome = users
    .create(payload(json!({ "username": "alice@example.com" })), audit)
    .await
    .unwrap();
  let Outcome::Success(obj) = outcome else {
    panic!("expected a successful create");
  };

  assert!(obj.id().is_some());
  assert_eq!(obj.version(), 1);
  assert!(!obj.deleted());
  assert_eq!(obj.audit().unwrap().transaction_id, txn);
}

#[tokio::test]
async fn create_empty_payload_is_rejected_without_write() {
  let users = service(EntityType::User).await;

  let outcome = users
    .create(ResourcePayload::default(), ctx("user_create_new_record"))
    .await
    .unwrap();
  let Outcome::Rejected(errors) = outcome else {
    panic!("expected a validation rejection");
  };

  assert_eq!(errors.len(), 1);
  assert_eq!(
    errors[0].source.as_ref().unwrap().pointer,
    "/data/attributes/username"
  );
  assert_eq!(errors[0].status, "422");
  assert_eq!(errors[0].code, "10002");

  // No partial creation occurred.
  let everything = users.all(&[], &[], Page::unbounded()).await.unwrap();
  assert!(everything.is_empty());
}

#[tokio::test]
async fn create_reports_every_violation_at_once() {
  let users = service(EntityType::User).await;

  let outcome = users
    .create(
      payload(json!({ "active": "yes", "securityGroupId": "admin" })),
      ctx("user_create_new_record"),
    )
    .await
    .unwrap();
  let Outcome::Rejected(errors) = outcome else {
    panic!("expected a validation rejection");
  };

  let pointers: Vec<_> = errors
    .iter()
    .map(|e| e.source.as_ref().unwrap().pointer.as_str())
    .collect();
  assert!(pointers.contains(&"/data/attributes/active"));
  assert!(pointers.contains(&"/data/attributes/securityGroupId"));
  assert!(pointers.contains(&"/data/attributes/username"));
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_advances_version_and_archives_prior_state() {
  let users = service(EntityType::User).await;
  let Outcome::Success(created) = users
    .create(
      payload(json!({ "username": "alice@example.com" })),
      ctx("user_create_new_record"),
    )
    .await
    .unwrap()
  else {
    panic!("expected a successful create");
  };
  let id = created.id().unwrap();
  let create_txn = created.audit().unwrap().transaction_id;

  let Outcome::Success(updated) = users
    .update(
      id,
      payload(json!({ "username": "alice@work.example.com" })),
      ctx("user_update_existing_record"),
    )
    .await
    .unwrap()
  else {
    panic!("expected a successful update");
  };

  assert_eq!(updated.version(), created.version() + 1);

  let history = users.history(id).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].transaction_id, create_txn);
  assert_eq!(
    history[0].state.get("username"),
    Some(&json!("alice@example.com"))
  );
}

#[tokio::test]
async fn update_version_conflict_propagates_unchanged() {
  let users = service(EntityType::User).await;
  let Outcome::Success(created) = users
    .create(
      payload(json!({ "username": "alice@example.com" })),
      ctx("user_create_new_record"),
    )
    .await
    .unwrap()
  else {
    panic!("expected a successful create");
  };

  let mut stale = payload(json!({ "localeCode": "en_GB" }));
  stale.version = Some(5);

  // A repository fault is an error, never a validation rejection.
  let err = users
    .update(created.id().unwrap(), stale, ctx("user_update_existing_record"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    RepositoryError::VersionConflict { expected: 5, found: 1, .. }
  ));
}

#[tokio::test]
async fn update_not_found_propagates_unchanged() {
  let users = service(EntityType::User).await;
  let err = users
    .update(
      Uuid::new_v4(),
      ResourcePayload::default(),
      ctx("user_update_existing_record"),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn update_rejected_by_validation_leaves_record_untouched() {
  let users = service(EntityType::User).await;
  let Outcome::Success(created) = users
    .create(
      payload(json!({ "username": "alice@example.com" })),
      ctx("user_create_new_record"),
    )
    .await
    .unwrap()
  else {
    panic!("expected a successful create");
  };
  let id = created.id().unwrap();

  let outcome = users
    .update(
      id,
      payload(json!({ "active": "yes" })),
      ctx("user_update_existing_record"),
    )
    .await
    .unwrap();
  assert!(matches!(outcome, Outcome::Rejected(_)));

  let found = users.find(id).await.unwrap().unwrap();
  assert_eq!(found.version(), 1);
  assert!(users.history(id).await.unwrap().is_empty());
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_never_removes_the_row() {
  let tags = service(EntityType::Tag).await;
  let Outcome::Success(created) = tags
    .create(payload(json!({ "text": "robotics" })), ctx("tag_create_new_record"))
    .await
    .unwrap()
  else {
    panic!("expected a successful create");
  };
  let id = created.id().unwrap();

  let Outcome::Success(deleted) = tags
    .delete(id, ResourcePayload::default(), ctx("tag_delete_existing_record"))
    .await
    .unwrap()
  else {
    panic!("expected a successful delete");
  };
  assert!(deleted.deleted());

  let found = tags.find(id).await.unwrap().unwrap();
  assert!(found.deleted());
  assert_eq!(found.version(), created.version() + 1);
  assert_eq!(found.get("text").unwrap(), Some(json!("robotics")));
}

// ─── Search & listing ────────────────────────────────────────────────────────

async fn seeded_accounts() -> ResourceService<SqliteRepository> {
  let accounts = service(EntityType::Account).await;
  for (name, description) in [
    ("Robot Works", "industrial arms"),
    ("Acme", "robotics supplies"),
    ("Gardenia", "flowers"),
  ] {
    let outcome = accounts
      .create(
        payload(json!({ "name": name, "description": description })),
        ctx("account_create_new_record"),
      )
      .await
      .unwrap();
    assert!(matches!(outcome, Outcome::Success(_)));
  }
  accounts
}

#[tokio::test]
async fn search_matches_any_field_against_any_term() {
  let accounts = seeded_accounts().await;

  // "robot" matches one record by name, another by description — a match
  // on either field is enough.
  let results = accounts
    .search(&["robot".to_owned()], &[], Page::unbounded())
    .await
    .unwrap();
  assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn search_terms_combine_with_or() {
  let accounts = seeded_accounts().await;

  let results = accounts
    .search(
      &["robot".to_owned(), "flower".to_owned()],
      &[],
      Page::unbounded(),
    )
    .await
    .unwrap();
  assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn non_positive_page_size_returns_entire_result_set() {
  let accounts = seeded_accounts().await;

  let everything = accounts.all(&[], &[], Page::new(0, 0)).await.unwrap();
  assert_eq!(everything.len(), 3);

  let bounded = accounts.all(&[], &[], Page::new(2, 0)).await.unwrap();
  assert_eq!(bounded.len(), 2);
}

// ─── Transformer ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn transform_separates_attributes_relationships_and_links() {
  let people = service(EntityType::Person).await;
  let user_id = Uuid::new_v4();
  let Outcome::Success(person) = people
    .create(
      payload(json!({
        "firstName": "Alice",
        "lastName": "Liddell",
        "position": "Archivist",
        "userId": user_id.to_string(),
      })),
      ctx("person_create_new_record"),
    )
    .await
    .unwrap()
  else {
    panic!("expected a successful create");
  };

  let ctx = RequestContext::new("https://api.example.com/v1");
  let doc = transform::transform(&person, &ctx).unwrap();
  let id = person.id().unwrap();

  assert_eq!(doc.resource_type, "person");
  assert_eq!(doc.id, id.to_string());
  assert_eq!(
    doc.links.self_link,
    format!("https://api.example.com/v1/people/{id}")
  );

  // Attributes: exported fields minus identity and discriminator.
  assert!(doc.attributes.contains_key("firstName"));
  assert!(doc.attributes.contains_key("version"));
  assert!(doc.attributes.contains_key("deleted"));
  assert!(!doc.attributes.contains_key("id"));
  assert!(!doc.attributes.contains_key("type"));

  // The userId-backed relation resolves to a {type, id} identifier.
  let user_rel = doc.relationships.get("user").unwrap();
  assert_eq!(
    user_rel.links.self_link,
    format!("https://api.example.com/v1/people/{id}/relationships/user")
  );
  assert_eq!(
    user_rel.links.related,
    format!("https://api.example.com/v1/people/{id}/user")
  );
  match user_rel.data.as_ref().unwrap() {
    crate::document::RelationshipData::One(identifier) => {
      assert_eq!(identifier.resource_type, "user");
      assert_eq!(identifier.id, user_id.to_string());
    }
    other => panic!("expected a to-one identifier, got {other:?}"),
  }

  // The audit-backed relation points at the acting user.
  let updated_by = doc.relationships.get("updatedBy").unwrap();
  assert!(updated_by.data.is_some());
}

#[tokio::test]
async fn sparse_fieldset_filters_fully_computed_maps() {
  let users = service(EntityType::User).await;
  let Outcome::Success(user) = users
    .create(
      payload(json!({ "username": "alice@example.com", "localeCode": "en_AU" })),
      ctx("user_create_new_record"),
    )
    .await
    .unwrap()
  else {
    panic!("expected a successful create");
  };

  let fields = [("user".to_owned(), vec!["username".to_owned()])]
    .into_iter()
    .collect();
  let ctx = RequestContext::new("https://api.example.com/v1")
    .with_fields(fields);
  let doc = transform::transform(&user, &ctx).unwrap();

  // Only the named attribute survives, and every relationship not named
  // in the fieldset is dropped.
  assert_eq!(doc.attributes.len(), 1);
  assert!(doc.attributes.contains_key("username"));
  assert!(doc.relationships.is_empty());
}

#[tokio::test]
async fn sparse_fieldset_for_another_type_has_no_effect() {
  let users = service(EntityType::User).await;
  let Outcome::Success(user) = users
    .create(
      payload(json!({ "username": "alice@example.com" })),
      ctx("user_create_new_record"),
    )
    .await
    .unwrap()
  else {
    panic!("expected a successful create");
  };

  let fields = [("person".to_owned(), vec!["firstName".to_owned()])]
    .into_iter()
    .collect();
  let ctx = RequestContext::new("https://api.example.com/v1")
    .with_fields(fields);
  let doc = transform::transform(&user, &ctx).unwrap();

  assert!(doc.attributes.contains_key("username"));
  assert!(doc.relationships.contains_key("updatedBy"));
}

#[tokio::test]
async fn collection_documents_carry_pagination_links() {
  let accounts = seeded_accounts().await;
  let ctx = RequestContext::new("https://api.example.com/v1");

  // Full first page: self + next, no prev.
  let page = Page::new(2, 0);
  let objects = accounts.all(&[], &[], page).await.unwrap();
  let doc = transform::transform_collection(
    EntityType::Account,
    &objects,
    &ctx,
    page,
  )
  .unwrap();
  assert_eq!(doc.data.len(), 2);
  assert_eq!(
    doc.links.self_link,
    "https://api.example.com/v1/accounts?page[size]=2&page[offset]=0"
  );
  assert_eq!(
    doc.links.next.as_deref(),
    Some("https://api.example.com/v1/accounts?page[size]=2&page[offset]=2")
  );
  assert!(doc.links.prev.is_none());

  // Short second page: prev, no next.
  let page = Page::new(2, 2);
  let objects = accounts.all(&[], &[], page).await.unwrap();
  let doc = transform::transform_collection(
    EntityType::Account,
    &objects,
    &ctx,
    page,
  )
  .unwrap();
  assert_eq!(doc.data.len(), 1);
  assert!(doc.links.next.is_none());
  assert_eq!(
    doc.links.prev.as_deref(),
    Some("https://api.example.com/v1/accounts?page[size]=2&page[offset]=0")
  );

  // Unbounded listings have no pagination links at all.
  let objects = accounts.all(&[], &[], Page::unbounded()).await.unwrap();
  let doc = transform::transform_collection(
    EntityType::Account,
    &objects,
    &ctx,
    Page::unbounded(),
  )
  .unwrap();
  assert_eq!(doc.links.self_link, "https://api.example.com/v1/accounts");
  assert!(doc.links.next.is_none() && doc.links.prev.is_none());
}

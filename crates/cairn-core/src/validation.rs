//! The rule-group validation engine.
//!
//! Rules are declarative records — a field name, a pure [`RuleKind`] check
//! and a message code — held in ordered lists per named group. Validation
//! merges the requested groups in order, runs every applicable rule with no
//! short-circuiting, and reports all violations at once as structured
//! [`ErrorDetail`]s. The engine never touches storage.

use chrono::DateTime;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::message::{ErrorDetail, MessageCode};

// ─── Rules ───────────────────────────────────────────────────────────────────

/// Named rule groups. `Default` runs on every operation; the others are
/// merged in per operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleGroup {
  Default,
  Create,
  Update,
  Delete,
}

/// A pure check applied to one field's value.
///
/// Every kind except `Required` passes vacuously when the field is absent:
/// presence is `Required`'s concern alone, so optional fields validate only
/// when supplied.
#[derive(Debug, Clone, Copy)]
pub enum RuleKind {
  Required,
  Email,
  Boolean,
  Integer,
  Uuid,
  DateTime,
  MemberOf(&'static [&'static str]),
  MaxLength(usize),
}

impl RuleKind {
  fn check(self, value: Option<&Value>) -> bool {
    let value = match value {
      None | Some(Value::Null) => {
        return !matches!(self, Self::Required);
      }
      Some(v) => v,
    };

    match self {
      Self::Required => !matches!(value, Value::String(s) if s.is_empty()),
      Self::Email => value.as_str().is_some_and(looks_like_email),
      Self::Boolean => value.is_boolean(),
      Self::Integer => value.is_i64() || value.is_u64(),
      Self::Uuid => value
        .as_str()
        .is_some_and(|s| Uuid::parse_str(s).is_ok()),
      Self::DateTime => value
        .as_str()
        .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()),
      Self::MemberOf(permitted) => value
        .as_str()
        .is_some_and(|s| permitted.contains(&s)),
      Self::MaxLength(max) => value
        .as_str()
        .is_none_or(|s| s.chars().count() <= max),
    }
  }
}

fn looks_like_email(s: &str) -> bool {
  match s.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains(' ')
    }
    None => false,
  }
}

/// One declarative validation rule.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
  pub field: &'static str,
  pub kind:  RuleKind,
  pub code:  MessageCode,
}

impl Rule {
  pub const fn new(
    field: &'static str,
    kind: RuleKind,
    code: MessageCode,
  ) -> Self {
    Self { field, kind, code }
  }
}

// ─── RuleBook ────────────────────────────────────────────────────────────────

/// The named rule groups for one resource, in declaration order.
#[derive(Debug, Default)]
pub struct RuleBook {
  groups: Vec<(RuleGroup, Vec<Rule>)>,
}

impl RuleBook {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a rule to a group, creating the group on first use.
  pub fn add(&mut self, group: RuleGroup, rule: Rule) -> &mut Self {
    match self.groups.iter_mut().find(|(g, _)| *g == group) {
      Some((_, rules)) => rules.push(rule),
      None => self.groups.push((group, vec![rule])),
    }
    self
  }

  /// Merge the named groups, preserving group order and declaration order
  /// within each group. Unknown groups contribute nothing.
  fn merged(&self, groups: &[RuleGroup]) -> Vec<Rule> {
    let mut out = Vec::new();
    for requested in groups {
      if let Some((_, rules)) =
        self.groups.iter().find(|(g, _)| g == requested)
      {
        out.extend(rules.iter().copied());
      }
    }
    out
  }

  /// Validate `data` against the merged rules of `groups`.
  ///
  /// Every applicable rule runs — a failing rule never suppresses later
  /// ones — so a single call reports the complete set of violations,
  /// grouped by field in order of first appearance.
  pub fn validate(
    &self,
    data: &Map<String, Value>,
    groups: &[RuleGroup],
  ) -> Validation {
    let mut failures: Vec<(&'static str, Vec<ErrorDetail>)> = Vec::new();

    for rule in self.merged(groups) {
      if rule.kind.check(data.get(rule.field)) {
        continue;
      }
      let detail = ErrorDetail::for_field(rule.field, rule.code);
      match failures.iter_mut().find(|(f, _)| *f == rule.field) {
        Some((_, list)) => list.push(detail),
        None => failures.push((rule.field, vec![detail])),
      }
    }

    if failures.is_empty() {
      Validation::Valid
    } else {
      Validation::Invalid(
        failures.into_iter().flat_map(|(_, list)| list).collect(),
      )
    }
  }
}

/// The outcome of one validation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
  Valid,
  Invalid(Vec<ErrorDetail>),
}

impl Validation {
  pub fn is_valid(&self) -> bool {
    matches!(self, Self::Valid)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn book() -> RuleBook {
    let mut book = RuleBook::new();
    book
      .add(
        RuleGroup::Default,
        Rule::new(
          "active",
          RuleKind::Boolean,
          MessageCode::ValidationInvalidBooleanValue,
        ),
      )
      .add(
        RuleGroup::Create,
        Rule::new(
          "username",
          RuleKind::Required,
          MessageCode::ValidationMandatoryFieldMissing,
        ),
      )
      .add(
        RuleGroup::Create,
        Rule::new(
          "username",
          RuleKind::Email,
          MessageCode::ValidationInvalidEmailFormat,
        ),
      );
    book
  }

  fn map(value: serde_json::Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
  }

  #[test]
  fn conforming_payload_is_valid() {
    let data = map(json!({ "username": "alice@example.com", "active": true }));
    assert!(
      book()
        .validate(&data, &[RuleGroup::Default, RuleGroup::Create])
        .is_valid()
    );
  }

  #[test]
  fn missing_required_field_reports_registry_entry() {
    let outcome =
      book().validate(&Map::new(), &[RuleGroup::Default, RuleGroup::Create]);
    let Validation::Invalid(errors) = outcome else {
      panic!("expected a failure");
    };

    assert_eq!(errors.len(), 1);
    assert_eq!(
      errors[0].source.as_ref().unwrap().pointer,
      "/data/attributes/username"
    );
    let entry = MessageCode::ValidationMandatoryFieldMissing.details();
    assert_eq!(errors[0].status, entry.http_status.to_string());
    assert_eq!(errors[0].title, entry.title);
  }

  #[test]
  fn all_rules_run_without_short_circuit() {
    let data = map(json!({ "username": "not-an-email", "active": "yes" }));
    let outcome =
      book().validate(&data, &[RuleGroup::Default, RuleGroup::Create]);
    let Validation::Invalid(errors) = outcome else {
      panic!("expected a failure");
    };

    // Both the boolean failure and the email failure are reported at once.
    assert_eq!(errors.len(), 2);
    let pointers: Vec<_> = errors
      .iter()
      .map(|e| e.source.as_ref().unwrap().pointer.as_str())
      .collect();
    assert!(pointers.contains(&"/data/attributes/active"));
    assert!(pointers.contains(&"/data/attributes/username"));
  }

  #[test]
  fn failures_group_by_field() {
    let mut book = RuleBook::new();
    book
      .add(
        RuleGroup::Create,
        Rule::new(
          "contact",
          RuleKind::Email,
          MessageCode::ValidationInvalidEmailFormat,
        ),
      )
      .add(
        RuleGroup::Create,
        Rule::new(
          "name",
          RuleKind::Required,
          MessageCode::ValidationMandatoryFieldMissing,
        ),
      )
      .add(
        RuleGroup::Create,
        Rule::new(
          "contact",
          RuleKind::MaxLength(4),
          MessageCode::ValidationValueTooLong,
        ),
      );

    let data = map(json!({ "contact": "not-an-email" }));
    let Validation::Invalid(errors) =
      book.validate(&data, &[RuleGroup::Create])
    else {
      panic!("expected a failure");
    };

    // `contact`'s second failure sorts with its first, ahead of `name`,
    // even though the `name` rule was declared between them.
    assert_eq!(errors.len(), 3);
    let pointers: Vec<_> = errors
      .iter()
      .map(|e| e.source.as_ref().unwrap().pointer.as_str())
      .collect();
    assert_eq!(pointers, [
      "/data/attributes/contact",
      "/data/attributes/contact",
      "/data/attributes/name",
    ]);
  }

  #[test]
  fn non_required_rules_pass_when_field_absent() {
    let data = map(json!({ "username": "alice@example.com" }));
    // `active` is absent; its Boolean rule must not fire.
    assert!(
      book()
        .validate(&data, &[RuleGroup::Default, RuleGroup::Create])
        .is_valid()
    );
  }

  #[test]
  fn unknown_group_contributes_nothing() {
    assert!(book().validate(&Map::new(), &[RuleGroup::Delete]).is_valid());
  }

  #[test]
  fn membership_and_length_checks() {
    let mut book = RuleBook::new();
    book
      .add(
        RuleGroup::Default,
        Rule::new(
          "title",
          RuleKind::MemberOf(&["Mr", "Ms", "Dr"]),
          MessageCode::ValidationInvalidCodeValue,
        ),
      )
      .add(
        RuleGroup::Default,
        Rule::new(
          "text",
          RuleKind::MaxLength(4),
          MessageCode::ValidationValueTooLong,
        ),
      );

    let good = map(json!({ "title": "Dr", "text": "abcd" }));
    assert!(book.validate(&good, &[RuleGroup::Default]).is_valid());

    let bad = map(json!({ "title": "Captain", "text": "abcde" }));
    let Validation::Invalid(errors) = book.validate(&bad, &[RuleGroup::Default])
    else {
      panic!("expected a failure");
    };
    assert_eq!(errors.len(), 2);
  }
}

//! The entity attribute model — controlled get/set over a declared field
//! set, with per-field accessor overrides.
//!
//! Fields are described by a static descriptor table rather than synthesised
//! accessor names: every read and write resolves through one central lookup,
//! and a descriptor may carry custom getter/setter functions that intercept
//! the slot access. Accessors are the sole polymorphism point — a variant can
//! change how an individual field behaves without changing the public
//! contract.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{Error, Result};

// ─── Field descriptors ───────────────────────────────────────────────────────

/// Custom read hook. May derive its result from any stored slot.
pub type Getter = fn(&AttributeSet) -> Option<Value>;

/// Custom write hook. Responsible for storing (or rejecting) the value.
pub type Setter = fn(&mut AttributeSet, Value) -> Result<()>;

/// How a declared field is accessed.
#[derive(Debug, Clone, Copy)]
pub enum Access {
  /// Plain storage slot, no interception.
  Direct,
  /// One or both directions routed through a custom accessor. A missing
  /// hook falls back to the direct slot.
  Custom {
    get: Option<Getter>,
    set: Option<Setter>,
  },
}

/// One entry in an entity's declared field table.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
  pub name:   &'static str,
  pub access: Access,
}

impl FieldDef {
  pub const fn direct(name: &'static str) -> Self {
    Self { name, access: Access::Direct }
  }

  pub const fn custom(
    name: &'static str,
    get: Option<Getter>,
    set: Option<Setter>,
  ) -> Self {
    Self { name, access: Access::Custom { get, set } }
  }
}

// ─── AttributeSet ────────────────────────────────────────────────────────────

/// A mapping from declared field names to values. Only declared fields are
/// externally visible; everything else fails with
/// [`Error::UnknownAttribute`].
#[derive(Debug, Clone)]
pub struct AttributeSet {
  base:   &'static [FieldDef],
  extra:  &'static [FieldDef],
  values: BTreeMap<String, Value>,
}

impl AttributeSet {
  /// An empty set whose declared fields are `base` ∪ `extra`.
  pub fn new(base: &'static [FieldDef], extra: &'static [FieldDef]) -> Self {
    Self { base, extra, values: BTreeMap::new() }
  }

  /// Declared field names, base fields first, in declaration order.
  pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.base.iter().chain(self.extra.iter()).map(|d| d.name)
  }

  pub fn is_declared(&self, name: &str) -> bool {
    self.descriptor(name).is_some()
  }

  fn descriptor(&self, name: &str) -> Option<&'static FieldDef> {
    self.base.iter().chain(self.extra.iter()).find(|d| d.name == name)
  }

  /// Read a field, routing through its custom getter when one is declared.
  /// `Ok(None)` means the field is declared but currently holds no value.
  pub fn get(&self, name: &str) -> Result<Option<Value>> {
    let def = self
      .descriptor(name)
      .ok_or_else(|| Error::UnknownAttribute(name.to_owned()))?;
    match def.access {
      Access::Custom { get: Some(getter), .. } => Ok(getter(self)),
      _ => Ok(self.values.get(def.name).cloned()),
    }
  }

  /// Write a field, routing through its custom setter when one is declared.
  pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
    let def = self
      .descriptor(name)
      .ok_or_else(|| Error::UnknownAttribute(name.to_owned()))?;
    match def.access {
      Access::Custom { set: Some(setter), .. } => setter(self, value),
      _ => {
        self.store(def.name, value);
        Ok(())
      }
    }
  }

  /// Raw slot write with no accessor interception. Empty strings are
  /// treated as "no value supplied" and are not stored, so an absent field
  /// stays distinguishable from an explicitly empty one. `Null` clears the
  /// slot.
  pub fn store(&mut self, name: &str, value: Value) {
    match value {
      Value::String(s) if s.is_empty() => {}
      Value::Null => {
        self.values.remove(name);
      }
      v => {
        self.values.insert(name.to_owned(), v);
      }
    }
  }

  /// Raw slot read with no accessor interception.
  pub fn slot(&self, name: &str) -> Option<&Value> {
    self.values.get(name)
  }

  /// Copy in every field present in both `source` and the declared set.
  /// Unrecognised source keys are silently ignored.
  pub fn populate(&mut self, source: &Map<String, Value>) -> Result<()> {
    let (base, extra) = (self.base, self.extra);
    for def in base.iter().chain(extra.iter()) {
      if let Some(value) = source.get(def.name) {
        self.set(def.name, value.clone())?;
      }
    }
    Ok(())
  }

  /// Export exactly the declared fields that currently hold a value.
  /// Fields never set are omitted, not emitted as null.
  pub fn export(&self) -> Map<String, Value> {
    let mut out = Map::new();
    for def in self.base.iter().chain(self.extra.iter()) {
      if let Some(v) = self.values.get(def.name) {
        out.insert(def.name.to_owned(), v.clone());
      }
    }
    out
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  static BASE: &[FieldDef] = &[FieldDef::direct("id")];

  fn set_count(attrs: &mut AttributeSet, value: Value) -> Result<()> {
    match value.as_u64() {
      Some(_) => {
        attrs.store("count", value);
        Ok(())
      }
      None => Err(Error::InvalidAttributeValue {
        field:  "count".to_owned(),
        reason: "must be a non-negative integer".to_owned(),
      }),
    }
  }

  static EXTRA: &[FieldDef] = &[
    FieldDef::direct("name"),
    FieldDef::custom("count", None, Some(set_count)),
  ];

  fn attrs() -> AttributeSet {
    AttributeSet::new(BASE, EXTRA)
  }

  #[test]
  fn get_and_set_declared_field() {
    let mut a = attrs();
    a.set("name", json!("widget")).unwrap();
    assert_eq!(a.get("name").unwrap(), Some(json!("widget")));
  }

  #[test]
  fn unknown_field_fails_both_ways() {
    let mut a = attrs();
    assert!(matches!(a.get("colour"), Err(Error::UnknownAttribute(_))));
    assert!(matches!(
      a.set("colour", json!("red")),
      Err(Error::UnknownAttribute(_))
    ));
  }

  #[test]
  fn declared_but_unset_field_reads_as_none() {
    let a = attrs();
    assert_eq!(a.get("name").unwrap(), None);
  }

  #[test]
  fn empty_string_is_not_stored() {
    let mut a = attrs();
    a.set("name", json!("")).unwrap();
    assert_eq!(a.get("name").unwrap(), None);
    assert!(a.export().is_empty());
  }

  #[test]
  fn null_clears_a_slot() {
    let mut a = attrs();
    a.set("name", json!("widget")).unwrap();
    a.set("name", Value::Null).unwrap();
    assert_eq!(a.get("name").unwrap(), None);
  }

  #[test]
  fn custom_setter_intercepts_writes() {
    let mut a = attrs();
    a.set("count", json!(3)).unwrap();
    assert_eq!(a.get("count").unwrap(), Some(json!(3)));

    let err = a.set("count", json!("three")).unwrap_err();
    assert!(matches!(err, Error::InvalidAttributeValue { .. }));
    // The failed write must not clobber the stored value.
    assert_eq!(a.get("count").unwrap(), Some(json!(3)));
  }

  #[test]
  fn populate_copies_known_fields_and_ignores_the_rest() {
    let mut a = attrs();
    let source = json!({ "name": "widget", "count": 2, "colour": "red" })
      .as_object()
      .cloned()
      .unwrap();
    a.populate(&source).unwrap();

    assert_eq!(a.get("name").unwrap(), Some(json!("widget")));
    assert_eq!(a.get("count").unwrap(), Some(json!(2)));
    assert!(!a.is_declared("colour"));
  }

  #[test]
  fn export_contains_exactly_the_set_fields() {
    let mut a = attrs();
    a.set("id", json!("e1")).unwrap();
    a.set("count", json!(7)).unwrap();

    let out = a.export();
    assert_eq!(out.len(), 2);
    assert_eq!(out.get("id"), Some(&json!("e1")));
    assert_eq!(out.get("count"), Some(&json!(7)));
    assert!(!out.contains_key("name"));
  }
}

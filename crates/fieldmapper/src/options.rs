use std::collections::HashMap;
use std::error::Error as StdError;

use crate::error::MapperError;

pub(crate) const DEFAULT_NULL_MESSAGE: &str = "null value occurred";

type ExclusionPredicate = Box<dyn Fn() -> bool>;
type NullErrorFactory = Box<dyn Fn(String) -> Box<dyn StdError + Send + Sync>>;

/// Configuration consumed by the mapping builders: the null-target error,
/// the field naming affixes, and the exclusion table.
///
/// # Example
/// ```
///   use fieldmapper::MapperOptions;
///
///   let options = MapperOptions::new()
///     .destination_field_prefix("my")
///     .exclude_field("id");
///
///   assert!(options.is_field_excluded("id"));
///   assert!(!options.is_field_excluded("name"));
/// ```
#[derive(Default)]
pub struct MapperOptions {
  null_message: Option<String>,
  null_error: Option<NullErrorFactory>,
  pub(crate) source_field_prefix: String,
  pub(crate) source_field_suffix: String,
  pub(crate) destination_field_prefix: String,
  pub(crate) destination_field_suffix: String,
  excluded_fields: HashMap<String, Option<ExclusionPredicate>>,
}

impl MapperOptions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Message carried by the null-target error. Defaults to
  /// `"null value occurred"`.
  pub fn error_message(mut self, message: impl Into<String>) -> Self {
    self.null_message = Some(message.into());
    self
  }

  /// Error type raised when a setter executes against an absent destination.
  /// The factory receives the configured message; the resulting error is
  /// surfaced as `MapperError::Custom`.
  pub fn null_error<E, F>(mut self, factory: F) -> Self
  where
    E: StdError + Send + Sync + 'static,
    F: Fn(String) -> E + 'static,
  {
    self.null_error = Some(Box::new(move |message| Box::new(factory(message))));
    self
  }

  /// Prefix expected on source accessor names, after the `get`/`is` verb.
  pub fn source_field_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.source_field_prefix = prefix.into();
    self
  }

  /// Suffix expected on source accessor names.
  pub fn source_field_suffix(mut self, suffix: impl Into<String>) -> Self {
    self.source_field_suffix = suffix.into();
    self
  }

  /// Prefix stripped from destination field names before deriving the source
  /// accessor name.
  pub fn destination_field_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.destination_field_prefix = prefix.into();
    self
  }

  /// Suffix stripped from destination field names. The name is truncated at
  /// the last occurrence.
  pub fn destination_field_suffix(mut self, suffix: impl Into<String>) -> Self {
    self.destination_field_suffix = suffix.into();
    self
  }

  /// Excludes `field` from the automatic mapping pass unconditionally.
  pub fn exclude_field(mut self, field: impl Into<String>) -> Self {
    self.excluded_fields.insert(field.into(), None);
    self
  }

  /// Excludes `field` only while `predicate` returns true. The predicate is
  /// evaluated at mapping time, once per `apply`.
  pub fn exclude_field_when<P>(mut self, field: impl Into<String>, predicate: P) -> Self
  where
    P: Fn() -> bool + 'static,
  {
    self.excluded_fields.insert(field.into(), Some(Box::new(predicate)));
    self
  }

  pub fn is_field_excluded(&self, field: &str) -> bool {
    match self.excluded_fields.get(field) {
      None => false,
      Some(None) => true,
      Some(Some(predicate)) => predicate(),
    }
  }

  pub(crate) fn null_target_error(&self) -> MapperError {
    let message = self
      .null_message
      .clone()
      .unwrap_or_else(|| DEFAULT_NULL_MESSAGE.to_string());
    match self.null_error {
      Some(ref factory) => MapperError::Custom(factory(message)),
      None => MapperError::NullTarget(message),
    }
  }
}

#[test]
fn test_exclusion_table() {
  let options = MapperOptions::new()
    .exclude_field("plain")
    .exclude_field_when("gated", || true)
    .exclude_field_when("open", || false);

  assert!(options.is_field_excluded("plain"));
  assert!(options.is_field_excluded("gated"));
  assert!(!options.is_field_excluded("open"));
  assert!(!options.is_field_excluded("absent"));
}

#[test]
fn test_default_null_target_error() {
  let options = MapperOptions::new();
  match options.null_target_error() {
    MapperError::NullTarget(message) => assert_eq!(message, "null value occurred"),
    other => panic!("unexpected error: {:?}", other),
  }
}

#[test]
fn test_configured_null_target_error() {
  #[derive(Debug)]
  struct Custom(String);

  impl std::fmt::Display for Custom {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
      write!(f, "{}", self.0)
    }
  }

  impl StdError for Custom {}

  let options = MapperOptions::new().error_message("dest is gone").null_error(Custom);
  match options.null_target_error() {
    MapperError::Custom(inner) => {
      assert_eq!(inner.downcast_ref::<Custom>().unwrap().0, "dest is gone");
    }
    other => panic!("unexpected error: {:?}", other),
  }
}

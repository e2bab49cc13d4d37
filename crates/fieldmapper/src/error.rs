use std::error::Error as StdError;

use thiserror::Error;

/// Failure of a single accessor invocation.
///
/// Accessor handles are type-erased, so the only ways an invocation can go
/// wrong are downcast mismatches on the receiver or on the value.
#[derive(Debug, Error)]
pub enum ReflectError {
  #[error("Receiver passed to `{method}` is not a `{expected}`")]
  ReceiverType {
    method: &'static str,
    expected: &'static str,
  },
  #[error("Value passed to `{method}` is not a `{expected}`")]
  ValueType {
    method: &'static str,
    expected: &'static str,
  },
}

/// Errors returned by `apply` on either builder.
#[derive(Debug, Error)]
pub enum MapperError {
  /// A setter executed, or the destination was extracted, while the target
  /// slot was empty. Carries the configured message.
  #[error("{0}")]
  NullTarget(String),
  /// The error type installed via `MapperOptions::null_error`, raised in
  /// place of [`MapperError::NullTarget`].
  #[error("{0}")]
  Custom(Box<dyn StdError + Send + Sync>),
  /// A required destination setter could not be resolved.
  #[error("No accessible `{method}` on `{type_name}`")]
  MissingAccessor {
    type_name: &'static str,
    method: String,
  },
  /// A resolved accessor failed when invoked.
  #[error("Invoking `{method}` on `{type_name}` failed")]
  Invocation {
    type_name: &'static str,
    method: String,
    source: ReflectError,
  },
  /// A reflective mapper was applied before a source object was bound.
  #[error("No source object bound for mapper producing `{type_name}`")]
  UnboundSource { type_name: &'static str },
}

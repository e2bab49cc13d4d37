//! Accessor tables and the process-wide lookup caches.
//!
//! Name-based accessor resolution needs a table of named getter/setter
//! handles per type. The [`Reflected`] trait supplies that table, usually
//! through `#[derive(Reflected)]`; the free functions here resolve names
//! against it, memoizing each type's table on first use.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use tracing::trace;

use crate::error::ReflectError;

/// A field value in transit between a getter and a setter.
pub type FieldValue = Box<dyn Any>;

/// Reads one field off a type-erased receiver, returning the boxed value.
pub type GetterHandle = fn(&dyn Any) -> Result<FieldValue, ReflectError>;

/// Writes one field of a type-erased receiver from a boxed value.
pub type SetterHandle = fn(&mut dyn Any, FieldValue) -> Result<(), ReflectError>;

/// A resolved accessor handle.
#[derive(Clone, Copy)]
pub enum Accessor {
  Getter(GetterHandle),
  Setter {
    handle: SetterHandle,
    /// Type accepted by the setter; lookups are signature-checked against it.
    param_type: &'static str,
  },
}

/// One declared field of a [`Reflected`] type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
  pub name: &'static str,
  pub type_name: &'static str,
  pub is_bool: bool,
}

/// One named accessor of a [`Reflected`] type.
#[derive(Clone, Copy)]
pub struct MethodSpec {
  pub name: &'static str,
  pub accessor: Accessor,
}

/// A type carrying an accessor table, usually via `#[derive(Reflected)]`.
///
/// Field types must be `Clone + 'static`: getters hand out boxed clones and
/// values travel as `Box<dyn Any>`.
pub trait Reflected: Any + Sized {
  /// Declared fields, in declaration order.
  fn declared_fields() -> Vec<FieldSpec>;

  /// Named accessor handles, a getter and/or setter per field.
  fn declared_methods() -> Vec<MethodSpec>;
}

type MethodTable = HashMap<&'static str, Accessor>;

static METHOD_CACHE: Lazy<RwLock<HashMap<TypeId, Arc<MethodTable>>>> =
  Lazy::new(|| RwLock::new(HashMap::new()));

static FIELD_CACHE: Lazy<RwLock<HashMap<TypeId, Arc<[FieldSpec]>>>> =
  Lazy::new(|| RwLock::new(HashMap::new()));

/// Declared fields of `T`, in declaration order. The list is built once per
/// type and cached for the process lifetime.
pub fn declared_fields_of<T: Reflected>() -> Arc<[FieldSpec]> {
  let key = TypeId::of::<T>();
  {
    let cache = FIELD_CACHE.read().unwrap_or_else(PoisonError::into_inner);
    if let Some(fields) = cache.get(&key) {
      return Arc::clone(fields);
    }
  }
  let fields: Arc<[FieldSpec]> = T::declared_fields().into();
  trace!(
    ty = std::any::type_name::<T>(),
    fields = fields.len(),
    "field table cached"
  );
  let mut cache = FIELD_CACHE.write().unwrap_or_else(PoisonError::into_inner);
  Arc::clone(cache.entry(key).or_insert(fields))
}

/// Looks up an accessor named `name` on `T`.
pub fn find_method<T: Reflected>(name: &str) -> Option<Accessor> {
  method_table_of::<T>().get(name).copied()
}

/// Looks up a getter named `name` on `T`.
pub fn find_getter<T: Reflected>(name: &str) -> Option<GetterHandle> {
  match find_method::<T>(name) {
    Some(Accessor::Getter(handle)) => Some(handle),
    _ => None,
  }
}

/// Looks up a setter named `name` on `T` taking `param_type`. A setter whose
/// recorded parameter type differs counts as not found.
pub fn find_setter<T: Reflected>(name: &str, param_type: &str) -> Option<SetterHandle> {
  match find_method::<T>(name) {
    Some(Accessor::Setter { handle, param_type: declared }) if declared == param_type => {
      Some(handle)
    }
    _ => None,
  }
}

fn method_table_of<T: Reflected>() -> Arc<MethodTable> {
  let key = TypeId::of::<T>();
  {
    let cache = METHOD_CACHE.read().unwrap_or_else(PoisonError::into_inner);
    if let Some(table) = cache.get(&key) {
      return Arc::clone(table);
    }
  }
  let mut table = MethodTable::new();
  for spec in T::declared_methods() {
    table.insert(spec.name, spec.accessor);
  }
  let table = Arc::new(table);
  trace!(
    ty = std::any::type_name::<T>(),
    methods = table.len(),
    "accessor table cached"
  );
  let mut cache = METHOD_CACHE.write().unwrap_or_else(PoisonError::into_inner);
  Arc::clone(cache.entry(key).or_insert(table))
}

#[cfg(test)]
#[derive(Default)]
struct Probe {
  value: i32,
  ready: bool,
}

#[cfg(test)]
impl Reflected for Probe {
  fn declared_fields() -> Vec<FieldSpec> {
    vec![
      FieldSpec {
        name: "value",
        type_name: std::any::type_name::<i32>(),
        is_bool: false,
      },
      FieldSpec {
        name: "ready",
        type_name: std::any::type_name::<bool>(),
        is_bool: true,
      },
    ]
  }

  fn declared_methods() -> Vec<MethodSpec> {
    vec![
      MethodSpec {
        name: "getValue",
        accessor: Accessor::Getter(
          |object: &dyn Any| -> Result<FieldValue, ReflectError> {
            let probe = object.downcast_ref::<Probe>().ok_or(ReflectError::ReceiverType {
              method: "getValue",
              expected: std::any::type_name::<Probe>(),
            })?;
            Ok(Box::new(probe.value))
          },
        ),
      },
      MethodSpec {
        name: "setValue",
        accessor: Accessor::Setter {
          param_type: std::any::type_name::<i32>(),
          handle: |object: &mut dyn Any, value: FieldValue| -> Result<(), ReflectError> {
            let probe = object.downcast_mut::<Probe>().ok_or(ReflectError::ReceiverType {
              method: "setValue",
              expected: std::any::type_name::<Probe>(),
            })?;
            let value = value.downcast::<i32>().map_err(|_| ReflectError::ValueType {
              method: "setValue",
              expected: std::any::type_name::<i32>(),
            })?;
            probe.value = *value;
            Ok(())
          },
        },
      },
      MethodSpec {
        name: "isReady",
        accessor: Accessor::Getter(
          |object: &dyn Any| -> Result<FieldValue, ReflectError> {
            let probe = object.downcast_ref::<Probe>().ok_or(ReflectError::ReceiverType {
              method: "isReady",
              expected: std::any::type_name::<Probe>(),
            })?;
            Ok(Box::new(probe.ready))
          },
        ),
      },
    ]
  }
}

#[test]
fn test_getter_lookup_and_invocation() {
  let getter = find_getter::<Probe>("getValue").unwrap();
  let probe = Probe { value: 5, ready: false };
  let value = getter(&probe).unwrap();
  assert_eq!(*value.downcast::<i32>().unwrap(), 5);

  let getter = find_getter::<Probe>("isReady").unwrap();
  let value = getter(&probe).unwrap();
  assert_eq!(*value.downcast::<bool>().unwrap(), false);
}

#[test]
fn test_setter_lookup_and_invocation() {
  let setter = find_setter::<Probe>("setValue", std::any::type_name::<i32>()).unwrap();
  let mut probe = Probe::default();
  setter(&mut probe, Box::new(9i32)).unwrap();
  assert_eq!(probe.value, 9);
}

#[test]
fn test_setter_param_type_must_match() {
  assert!(find_setter::<Probe>("setValue", std::any::type_name::<String>()).is_none());
  assert!(find_setter::<Probe>("setValue", std::any::type_name::<i32>()).is_some());
}

#[test]
fn test_lookup_respects_accessor_kind() {
  assert!(find_getter::<Probe>("setValue").is_none());
  assert!(find_setter::<Probe>("getValue", std::any::type_name::<i32>()).is_none());
  assert!(find_getter::<Probe>("getMissing").is_none());
  assert!(find_method::<Probe>("getValue").is_some());
}

#[test]
fn test_invocation_downcast_errors() {
  let getter = find_getter::<Probe>("getValue").unwrap();
  let not_a_probe = 42u8;
  let err = getter(&not_a_probe).unwrap_err();
  assert!(matches!(err, ReflectError::ReceiverType { .. }));

  let setter = find_setter::<Probe>("setValue", std::any::type_name::<i32>()).unwrap();
  let mut probe = Probe::default();
  let err = setter(&mut probe, Box::new("nope".to_string())).unwrap_err();
  assert!(matches!(err, ReflectError::ValueType { .. }));
  assert_eq!(probe.value, 0);
}

#[test]
fn test_field_table_is_cached() {
  let first = declared_fields_of::<Probe>();
  let second = declared_fields_of::<Probe>();
  assert!(Arc::ptr_eq(&first, &second));
  assert_eq!(first.len(), 2);
  assert_eq!(first[0].name, "value");
  assert!(first[1].is_bool);
}

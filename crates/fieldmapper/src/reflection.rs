//! Convention-based field mapping: derives accessor names from destination
//! field names, resolves them through the cached accessor tables, and copies
//! the values, with per-field or per-type delegation to nested mappers.

use std::any::{type_name, Any};
use std::collections::HashMap;

use tracing::{debug, trace};

use crate::accessor::{declared_fields_of, find_getter, find_setter, FieldSpec, Reflected};
use crate::builder::{Mapper, MapperBuilder};
use crate::error::{MapperError, ReflectError};
use crate::options::MapperOptions;

/// Builder copying every declared field of the destination type from a
/// matching getter on the source, before running its queued instructions.
///
/// For a destination field `foo: T` the source is expected to expose a
/// `getFoo` accessor (`isFoo` when `T` is `bool`) and the destination a
/// `setFoo` accessor taking `T`, both recorded by `#[derive(Reflected)]`.
/// Configured affixes reshape the lookup, exclusions remove fields from the
/// pass, and nested mappers take over complex-typed fields. A field without
/// a source getter is skipped; a field without a destination setter is an
/// error.
///
/// # Example
/// ```
///   use fieldmapper::{Reflected, ReflectionMapperBuilder};
///
///   #[derive(Reflected, Default, Clone)]
///   struct UserRecord {
///     name: String,
///     age: u32,
///   }
///
///   #[derive(Reflected, Default, Clone)]
///   struct User {
///     name: String,
///     age: u32,
///   }
///
///   let record = UserRecord { name: "ada".to_string(), age: 36 };
///   let user: User = ReflectionMapperBuilder::new(record).apply().unwrap();
///
///   assert_eq!(user.name, "ada");
///   assert_eq!(user.age, 36);
/// ```
pub struct ReflectionMapperBuilder<R, S> {
  builder: MapperBuilder<R>,
  source: Option<S>,
  internal_mappers: HashMap<String, Box<dyn Mapper>>,
}

impl<R, S> ReflectionMapperBuilder<R, S>
where
  R: Reflected + Default,
  S: Reflected,
{
  /// Creates a mapper whose destination starts as `R::default()`.
  pub fn new(source: S) -> Self {
    Self::for_destination(source, R::default())
  }

  /// Creates a mapper with no source bound yet. Intended for registration as
  /// a nested mapper, whose source is bound lazily by the parent from its
  /// own getter result. Applying an unsourced mapper directly yields
  /// [`MapperError::UnboundSource`].
  pub fn unsourced() -> Self {
    Self {
      builder: MapperBuilder::new(),
      source: None,
      internal_mappers: HashMap::new(),
    }
  }
}

impl<R, S> ReflectionMapperBuilder<R, S>
where
  R: Reflected,
  S: Reflected,
{
  /// Creates a mapper populating an existing destination object. Passing
  /// `None` leaves the target absent, as with
  /// [`MapperBuilder::for_destination`].
  pub fn for_destination(source: S, destination: impl Into<Option<R>>) -> Self {
    Self {
      builder: MapperBuilder::for_destination(destination),
      source: Some(source),
      internal_mappers: HashMap::new(),
    }
  }

  /// Installs a configured [`MapperOptions`].
  pub fn options(mut self, options: MapperOptions) -> Self {
    self.builder = self.builder.options(options);
    self
  }

  /// Registers a nested mapper for every destination field whose declared
  /// type matches the mapper's destination type.
  pub fn with_internal_type_mapper(mut self, mapper: impl Mapper + 'static) -> Self {
    let key = mapper.destination_type().to_string();
    self.internal_mappers.insert(key, Box::new(mapper));
    self
  }

  /// Registers a nested mapper for a single destination field. Takes
  /// priority over a type-level mapper covering the same field.
  pub fn with_internal_field_mapper(mut self, field: &str, mapper: impl Mapper + 'static) -> Self {
    let key = format!("{}#{}", type_name::<R>(), field);
    self.internal_mappers.insert(key, Box::new(mapper));
    self
  }

  /// Queues a setter invocation with a literal value, executed after the
  /// automatic pass. See [`MapperBuilder::with_setter`].
  pub fn with_setter<V, F>(mut self, setter: F, value: V) -> Self
  where
    V: Clone + 'static,
    F: Fn(&mut R, V) + 'static,
  {
    self.builder = self.builder.with_setter(setter, value);
    self
  }

  /// Queues a setter invocation with a value read from `source` at queue
  /// time. See [`MapperBuilder::with_setter_from`].
  pub fn with_setter_from<G, V, F, Get>(mut self, setter: F, source: &G, getter: Get) -> Self
  where
    V: Clone + 'static,
    F: Fn(&mut R, V) + 'static,
    Get: Fn(&G) -> V,
  {
    self.builder = self.builder.with_setter_from(setter, source, getter);
    self
  }

  /// Opens a conditional scope over the queued instructions.
  pub fn with_start_condition<P>(mut self, predicate: P) -> Self
  where
    P: Fn() -> bool + 'static,
  {
    self.builder = self.builder.with_start_condition(predicate);
    self
  }

  /// Closes a conditional scope. See [`MapperBuilder::with_end_condition`]
  /// for the flat reactivation semantics.
  pub fn with_end_condition(mut self) -> Self {
    self.builder = self.builder.with_end_condition();
    self
  }

  /// Runs the automatic field-mapping pass, then the queued instructions,
  /// and returns the destination object. Queued setters therefore override
  /// automatically mapped fields.
  pub fn apply(mut self) -> Result<R, MapperError> {
    self.run_reflective_pass()?;
    self.builder.run_instructions()?;
    self.builder.take_destination()
  }

  fn run_reflective_pass(&mut self) -> Result<(), MapperError> {
    let Self { ref mut builder, ref source, ref mut internal_mappers } = *self;
    let source = match *source {
      Some(ref source) => source,
      None => return Err(MapperError::UnboundSource { type_name: type_name::<R>() }),
    };
    let destination_type = type_name::<R>();

    for field in declared_fields_of::<R>().iter() {
      if builder.options.is_field_excluded(field.name) {
        debug!(field = field.name, "field excluded from automatic mapping");
        continue;
      }
      let setter_name = setter_method_name(field.name);
      let getter_name = getter_method_name(field, &builder.options);
      // A destination field without a matching source getter is not an
      // error, the field is left alone.
      let getter = match find_getter::<S>(&getter_name) {
        Some(getter) => getter,
        None => {
          trace!(
            field = field.name,
            getter = getter_name.as_str(),
            "no source getter, field skipped"
          );
          continue;
        }
      };
      let value = match lookup_internal_mapper(internal_mappers, destination_type, field) {
        Some(mapper) => {
          if !mapper.source_bound() {
            let bound = getter(source).map_err(|cause| invocation_error::<S>(&getter_name, cause))?;
            mapper.bind_source(bound);
          }
          trace!(field = field.name, "field delegated to nested mapper");
          mapper.apply_erased()?
        }
        None => getter(source).map_err(|cause| invocation_error::<S>(&getter_name, cause))?,
      };
      // A missing destination setter, by contrast, is a hard failure.
      let setter = match find_setter::<R>(&setter_name, field.type_name) {
        Some(setter) => setter,
        None => {
          return Err(MapperError::MissingAccessor {
            type_name: destination_type,
            method: setter_name,
          });
        }
      };
      match builder.target.object {
        Some(ref mut object) => {
          setter(object, value).map_err(|cause| invocation_error::<R>(&setter_name, cause))?;
        }
        None => return Err(builder.options.null_target_error()),
      }
    }
    Ok(())
  }
}

impl<R, S> Mapper for ReflectionMapperBuilder<R, S>
where
  R: Reflected + Clone,
  S: Reflected,
{
  fn apply_erased(&mut self) -> Result<Box<dyn Any>, MapperError> {
    self.run_reflective_pass()?;
    self.builder.run_instructions()?;
    match self.builder.target.object {
      Some(ref object) => Ok(Box::new(object.clone())),
      None => Err(self.builder.options.null_target_error()),
    }
  }

  fn destination_type(&self) -> &'static str {
    type_name::<R>()
  }

  fn source_bound(&self) -> bool {
    self.source.is_some()
  }

  fn bind_source(&mut self, source: Box<dyn Any>) {
    match source.downcast::<S>() {
      Ok(source) => self.source = Some(*source),
      Err(_) => {
        debug!(expected = type_name::<S>(), "late-bound source of unexpected type dropped");
      }
    }
  }
}

fn lookup_internal_mapper<'a>(
  mappers: &'a mut HashMap<String, Box<dyn Mapper>>,
  destination_type: &str,
  field: &FieldSpec,
) -> Option<&'a mut Box<dyn Mapper>> {
  let field_key = format!("{}#{}", destination_type, field.name);
  if mappers.contains_key(&field_key) {
    return mappers.get_mut(&field_key);
  }
  mappers.get_mut(field.type_name)
}

fn invocation_error<T>(method: &str, cause: ReflectError) -> MapperError {
  MapperError::Invocation {
    type_name: type_name::<T>(),
    method: method.to_string(),
    source: cause,
  }
}

fn setter_method_name(field_name: &str) -> String {
  format!("set{}", capitalize(field_name))
}

fn getter_method_name(field: &FieldSpec, options: &MapperOptions) -> String {
  let verb = if field.is_bool { "is" } else { "get" };
  format!(
    "{}{}{}{}",
    verb,
    capitalize(&options.source_field_prefix),
    capitalize(&base_field_name(field.name, options)),
    capitalize(&options.source_field_suffix),
  )
}

/// Strips the configured destination affixes from a declared field name:
/// with prefix `myPrefix` and suffix `MySuffix`, `myPrefixFooMySuffix`
/// becomes `foo`.
fn base_field_name(field_name: &str, options: &MapperOptions) -> String {
  let mut base = field_name;
  let prefix = options.destination_field_prefix.as_str();
  if !prefix.is_empty() && base.starts_with(prefix) {
    base = &base[prefix.len()..];
  }
  let suffix = options.destination_field_suffix.as_str();
  if !suffix.is_empty() {
    if let Some(position) = base.rfind(suffix) {
      base = &base[..position];
    }
  }
  uncapitalize(base)
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

fn uncapitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_lowercase().chain(chars).collect(),
    None => String::new(),
  }
}

#[test]
fn test_capitalize() {
  assert_eq!(capitalize(""), "");
  assert_eq!(capitalize("foo"), "Foo");
  assert_eq!(capitalize("Foo"), "Foo");
  assert_eq!(uncapitalize("Foo"), "foo");
  assert_eq!(uncapitalize(""), "");
}

#[test]
fn test_setter_name_from_field() {
  assert_eq!(setter_method_name("name"), "setName");
  assert_eq!(setter_method_name("a"), "setA");
}

#[test]
fn test_base_name_strips_affixes() {
  let options = MapperOptions::new()
    .destination_field_prefix("myPrefix")
    .destination_field_suffix("MySuffix");
  assert_eq!(base_field_name("myPrefixFooMySuffix", &options), "foo");
  // The prefix strips only when the name starts with it; the suffix
  // truncates at its last occurrence.
  assert_eq!(base_field_name("fooMySuffix", &options), "foo");
  assert_eq!(base_field_name("myPrefixFoo", &options), "foo");
  assert_eq!(base_field_name("foo", &options), "foo");
  assert_eq!(base_field_name("foo", &MapperOptions::new()), "foo");
}

#[test]
fn test_getter_name_uses_is_verb_for_bool() {
  let options = MapperOptions::new();
  let flag = FieldSpec {
    name: "done",
    type_name: std::any::type_name::<bool>(),
    is_bool: true,
  };
  assert_eq!(getter_method_name(&flag, &options), "isDone");
  let field = FieldSpec {
    name: "done",
    type_name: std::any::type_name::<String>(),
    is_bool: false,
  };
  assert_eq!(getter_method_name(&field, &options), "getDone");
}

#[test]
fn test_getter_name_applies_source_affixes() {
  let options = MapperOptions::new()
    .source_field_prefix("src")
    .source_field_suffix("raw");
  let field = FieldSpec {
    name: "name",
    type_name: std::any::type_name::<String>(),
    is_bool: false,
  };
  assert_eq!(getter_method_name(&field, &options), "getSrcNameRaw");
}

#[test]
fn test_internal_mapper_lookup_priority() {
  let field = FieldSpec {
    name: "count",
    type_name: std::any::type_name::<i32>(),
    is_bool: false,
  };
  let field_key = format!("Dest#{}", field.name);

  let mut mappers: HashMap<String, Box<dyn Mapper>> = HashMap::new();
  mappers.insert(field.type_name.to_string(), Box::new(MapperBuilder::<i64>::new()));
  mappers.insert(field_key.clone(), Box::new(MapperBuilder::<i32>::new()));

  let found = lookup_internal_mapper(&mut mappers, "Dest", &field).unwrap();
  assert_eq!(found.destination_type(), std::any::type_name::<i32>());

  mappers.remove(&field_key);
  let found = lookup_internal_mapper(&mut mappers, "Dest", &field).unwrap();
  assert_eq!(found.destination_type(), std::any::type_name::<i64>());

  let other = FieldSpec {
    name: "other",
    type_name: std::any::type_name::<String>(),
    is_bool: false,
  };
  assert!(lookup_internal_mapper(&mut mappers, "Dest", &other).is_none());
}

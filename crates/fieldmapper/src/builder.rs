use std::any::{type_name, Any};

use crate::error::MapperError;
use crate::options::MapperOptions;

/// The destination slot of a builder. Bound once at construction, mutated by
/// setter instructions, taken out by `apply`.
pub(crate) struct MappingTarget<R> {
  pub(crate) object: Option<R>,
}

pub(crate) struct SetterInstruction<R> {
  run: Box<dyn Fn(&mut R)>,
}

pub(crate) enum Instruction<R> {
  Set(SetterInstruction<R>),
  StartCondition(Box<dyn Fn() -> bool>),
  EndCondition,
}

/// Fluent builder accumulating setter and condition instructions against a
/// destination object, executed in insertion order by [`apply`].
///
/// Conditions gate the setters between a start and its end marker. The
/// interpreter is deliberately flat: one boolean tracks whether execution is
/// active, so conditions nested inside an inactive scope are skipped without
/// being evaluated and the first end marker reactivates execution. See
/// [`with_end_condition`] for the implications.
///
/// [`apply`]: MapperBuilder::apply
/// [`with_end_condition`]: MapperBuilder::with_end_condition
///
/// # Example
/// ```
///   use fieldmapper::MapperBuilder;
///
///   #[derive(Default)]
///   struct Flags {
///     a: bool,
///     b: bool,
///   }
///
///   let flags = MapperBuilder::<Flags>::new()
///     .with_start_condition(|| false)
///     .with_setter(|flags: &mut Flags, value| flags.a = value, true)
///     .with_end_condition()
///     .with_setter(|flags: &mut Flags, value| flags.b = value, true)
///     .apply()
///     .unwrap();
///
///   assert!(!flags.a);
///   assert!(flags.b);
/// ```
pub struct MapperBuilder<R> {
  pub(crate) target: MappingTarget<R>,
  pub(crate) options: MapperOptions,
  instructions: Vec<Instruction<R>>,
}

impl<R: Default> MapperBuilder<R> {
  /// Creates a builder whose destination starts as `R::default()`.
  pub fn new() -> Self {
    Self::for_destination(R::default())
  }
}

impl<R> MapperBuilder<R> {
  /// Creates a builder populating an existing destination object. Passing
  /// `None` leaves the target absent; the first setter that executes (or the
  /// final extraction) then fails with the configured null-target error.
  pub fn for_destination(destination: impl Into<Option<R>>) -> Self {
    Self {
      target: MappingTarget { object: destination.into() },
      options: MapperOptions::default(),
      instructions: Vec::new(),
    }
  }

  /// Installs a configured [`MapperOptions`].
  pub fn options(mut self, options: MapperOptions) -> Self {
    self.options = options;
    self
  }

  /// Queues a setter invocation with a literal value. Nothing runs until
  /// [`apply`](MapperBuilder::apply); the value is cloned into the setter on
  /// each execution.
  pub fn with_setter<V, F>(mut self, setter: F, value: V) -> Self
  where
    V: Clone + 'static,
    F: Fn(&mut R, V) + 'static,
  {
    self.instructions.push(Instruction::Set(SetterInstruction {
      run: Box::new(move |object| setter(object, value.clone())),
    }));
    self
  }

  /// Queues a setter invocation with a value read from `source`. The getter
  /// runs now, at queue time; later changes to `source` are not observed.
  pub fn with_setter_from<G, V, F, Get>(self, setter: F, source: &G, getter: Get) -> Self
  where
    V: Clone + 'static,
    F: Fn(&mut R, V) + 'static,
    Get: Fn(&G) -> V,
  {
    let value = getter(source);
    self.with_setter(setter, value)
  }

  /// Opens a conditional scope. The predicate is evaluated when execution
  /// reaches this marker, and only if the sequence is active at that point.
  pub fn with_start_condition<P>(mut self, predicate: P) -> Self
  where
    P: Fn() -> bool + 'static,
  {
    self.instructions.push(Instruction::StartCondition(Box::new(predicate)));
    self
  }

  /// Closes a conditional scope, unconditionally reactivating execution.
  ///
  /// Scopes are not tracked as a stack: inside an inactive scope the first
  /// end marker reactivates, regardless of how many start markers were
  /// skipped before it. An end marker without a matching start is harmless.
  pub fn with_end_condition(mut self) -> Self {
    self.instructions.push(Instruction::EndCondition);
    self
  }

  /// Executes the queued instructions once, in order, and returns the
  /// destination object.
  pub fn apply(mut self) -> Result<R, MapperError> {
    self.run_instructions()?;
    self.take_destination()
  }

  pub(crate) fn run_instructions(&mut self) -> Result<(), MapperError> {
    let Self { ref mut target, ref options, ref instructions } = *self;
    let mut active = true;
    for instruction in instructions {
      match instruction {
        Instruction::Set(set) if active => match target.object {
          Some(ref mut object) => (set.run)(object),
          None => return Err(options.null_target_error()),
        },
        Instruction::Set(_) => {}
        Instruction::StartCondition(predicate) if active => {
          active = predicate();
        }
        Instruction::StartCondition(_) => {}
        Instruction::EndCondition => {
          active = true;
        }
      }
    }
    Ok(())
  }

  pub(crate) fn take_destination(&mut self) -> Result<R, MapperError> {
    match self.target.object.take() {
      Some(object) => Ok(object),
      None => Err(self.options.null_target_error()),
    }
  }
}

/// Object-safe mapper interface, letting mappers with different destination
/// types share one registry (the internal mapper table of the reflective
/// builder).
pub trait Mapper {
  /// Runs the mapping and returns a boxed clone of the destination, leaving
  /// the mapper usable for further invocations.
  fn apply_erased(&mut self) -> Result<Box<dyn Any>, MapperError>;

  /// Name of the destination type this mapper produces.
  fn destination_type(&self) -> &'static str;

  /// Whether a source object is bound. Instruction-only mappers carry their
  /// values in the instructions themselves and always count as bound.
  fn source_bound(&self) -> bool {
    true
  }

  /// Binds a late source object. The default does nothing.
  fn bind_source(&mut self, _source: Box<dyn Any>) {}
}

impl<R: Clone + 'static> Mapper for MapperBuilder<R> {
  fn apply_erased(&mut self) -> Result<Box<dyn Any>, MapperError> {
    self.run_instructions()?;
    match self.target.object {
      Some(ref object) => Ok(Box::new(object.clone())),
      None => Err(self.options.null_target_error()),
    }
  }

  fn destination_type(&self) -> &'static str {
    type_name::<R>()
  }
}

#[cfg(test)]
#[derive(Default, Clone, Debug, PartialEq)]
struct Dest {
  values: Vec<i32>,
  label: String,
}

#[cfg(test)]
fn push(dest: &mut Dest, value: i32) {
  dest.values.push(value)
}

#[test]
fn test_setters_run_in_insertion_order() {
  let dest = MapperBuilder::<Dest>::new()
    .with_setter(push, 1)
    .with_setter(push, 2)
    .with_setter(push, 3)
    .apply()
    .unwrap();
  assert_eq!(dest.values, vec![1, 2, 3]);
}

#[test]
fn test_false_scope_skips_enclosed_setters() {
  let dest = MapperBuilder::<Dest>::new()
    .with_setter(push, 1)
    .with_start_condition(|| false)
    .with_setter(push, 2)
    .with_setter(push, 3)
    .with_setter(push, 4)
    .with_end_condition()
    .with_setter(push, 5)
    .apply()
    .unwrap();
  assert_eq!(dest.values, vec![1, 5]);
}

#[test]
fn test_nested_false_scope_reactivates_at_first_end() {
  let dest = MapperBuilder::<Dest>::new()
    .with_start_condition(|| true)
    .with_start_condition(|| false)
    .with_setter(push, 1)
    .with_end_condition()
    .with_setter(push, 2)
    .with_end_condition()
    .apply()
    .unwrap();
  // Flat semantics: the first end marker reactivates, it does not restore
  // the enclosing scope's state.
  assert_eq!(dest.values, vec![2]);
}

#[test]
fn test_inactive_scope_never_evaluates_predicates() {
  use std::cell::Cell;
  use std::rc::Rc;

  let evaluations = Rc::new(Cell::new(0));
  let seen = Rc::clone(&evaluations);
  let dest = MapperBuilder::<Dest>::new()
    .with_start_condition(|| false)
    .with_start_condition(move || {
      seen.set(seen.get() + 1);
      true
    })
    .with_setter(push, 1)
    .with_end_condition()
    .with_setter(push, 2)
    .with_end_condition()
    .apply()
    .unwrap();
  assert_eq!(evaluations.get(), 0);
  assert_eq!(dest.values, vec![2]);
}

#[test]
fn test_unbalanced_end_is_harmless() {
  let dest = MapperBuilder::<Dest>::new()
    .with_end_condition()
    .with_setter(push, 1)
    .apply()
    .unwrap();
  assert_eq!(dest.values, vec![1]);
}

#[test]
fn test_missing_end_gates_the_remainder() {
  let dest = MapperBuilder::<Dest>::new()
    .with_setter(push, 1)
    .with_start_condition(|| false)
    .with_setter(push, 2)
    .with_setter(push, 3)
    .apply()
    .unwrap();
  assert_eq!(dest.values, vec![1]);
}

#[test]
fn test_absent_destination_fails_on_first_setter() {
  let result = MapperBuilder::<Dest>::for_destination(None)
    .with_setter(push, 1)
    .apply();
  match result {
    Err(MapperError::NullTarget(message)) => assert_eq!(message, "null value occurred"),
    other => panic!("unexpected result: {:?}", other),
  }
}

#[test]
fn test_absent_destination_fails_on_extraction() {
  let result = MapperBuilder::<Dest>::for_destination(None).apply();
  assert!(matches!(result, Err(MapperError::NullTarget(_))));
}

#[test]
fn test_skipped_setter_does_not_touch_absent_destination() {
  let mut builder = MapperBuilder::<Dest>::for_destination(None)
    .with_start_condition(|| false)
    .with_setter(push, 1)
    .with_end_condition();
  assert!(builder.run_instructions().is_ok());
}

#[test]
fn test_configured_message_and_error_type() {
  use std::fmt;

  #[derive(Debug)]
  struct Boom(String);

  impl fmt::Display for Boom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      write!(f, "boom: {}", self.0)
    }
  }

  impl std::error::Error for Boom {}

  let result = MapperBuilder::<Dest>::for_destination(None)
    .options(MapperOptions::new().error_message("missing dest"))
    .with_setter(push, 1)
    .apply();
  match result {
    Err(MapperError::NullTarget(message)) => assert_eq!(message, "missing dest"),
    other => panic!("unexpected result: {:?}", other),
  }

  let result = MapperBuilder::<Dest>::for_destination(None)
    .options(MapperOptions::new().error_message("missing dest").null_error(Boom))
    .with_setter(push, 1)
    .apply();
  match result {
    Err(MapperError::Custom(inner)) => {
      assert_eq!(inner.downcast_ref::<Boom>().unwrap().0, "missing dest");
    }
    other => panic!("unexpected result: {:?}", other),
  }
}

#[test]
fn test_setter_from_resolves_value_at_queue_time() {
  let mut source = Dest::default();
  source.label = "before".to_string();
  let builder = MapperBuilder::<Dest>::new().with_setter_from(
    |dest: &mut Dest, value| dest.label = value,
    &source,
    |source: &Dest| source.label.clone(),
  );
  source.label = "after".to_string();
  let dest = builder.apply().unwrap();
  assert_eq!(dest.label, "before");
}

#[test]
fn test_erased_apply_clones_destination_out() {
  let mut mapper = MapperBuilder::<Dest>::new().with_setter(push, 7);
  let first = mapper.apply_erased().unwrap().downcast::<Dest>().unwrap();
  // Instructions re-run on the retained destination on every invocation.
  let second = mapper.apply_erased().unwrap().downcast::<Dest>().unwrap();
  assert_eq!(first.values, vec![7]);
  assert_eq!(second.values, vec![7, 7]);
  assert!(mapper.destination_type().contains("Dest"));
}

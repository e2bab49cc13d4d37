//! Derive and runtime exercised together, over record-style structs.

#![cfg(test)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fieldmapper::{
  MapperBuilder, MapperError, MapperOptions, Reflected, ReflectionMapperBuilder,
};

#[derive(Reflected, Default, Clone, Debug, PartialEq)]
struct PersonRecord {
  name: String,
  age: i32,
  active: bool,
}

#[derive(Reflected, Default, Clone, Debug, PartialEq)]
struct Person {
  name: String,
  age: i32,
  active: bool,
}

fn sample_record() -> PersonRecord {
  PersonRecord {
    name: "ada".to_string(),
    age: 36,
    active: true,
  }
}

#[test]
fn test_reflective_mapping_copies_declared_fields() {
  let person: Person = ReflectionMapperBuilder::new(sample_record()).apply().unwrap();
  assert_eq!(
    person,
    Person {
      name: "ada".to_string(),
      age: 36,
      active: true,
    }
  );
}

#[test]
fn test_reflective_mapping_into_existing_destination() {
  let existing = Person {
    name: String::new(),
    age: 0,
    active: false,
  };
  let person: Person = ReflectionMapperBuilder::for_destination(sample_record(), existing)
    .apply()
    .unwrap();
  assert_eq!(person.name, "ada");
  assert!(person.active);
}

#[test]
fn test_missing_source_getter_leaves_field_at_default() {
  #[derive(Reflected, Default, Clone)]
  struct Annotated {
    name: String,
    note: String,
  }

  // `PersonRecord` has no `getNote`, so `note` keeps its default.
  let annotated: Annotated = ReflectionMapperBuilder::new(sample_record()).apply().unwrap();
  assert_eq!(annotated.name, "ada");
  assert_eq!(annotated.note, "");
}

#[test]
fn test_write_only_source_field_is_skipped() {
  #[derive(Reflected, Default, Clone)]
  struct Sink {
    #[reflected(write_only)]
    code: i32,
  }

  #[derive(Reflected, Default, Clone)]
  struct CodeHolder {
    code: i32,
  }

  // The source declares `code` but derives no getter for it.
  let holder: CodeHolder = ReflectionMapperBuilder::new(Sink { code: 7 }).apply().unwrap();
  assert_eq!(holder.code, 0);
}

#[test]
fn test_missing_destination_setter_is_fatal() {
  #[derive(Reflected, Default, Clone)]
  struct Frozen {
    #[reflected(read_only)]
    code: i32,
  }

  #[derive(Reflected, Default, Clone)]
  struct CodeSource {
    code: i32,
  }

  let result: Result<Frozen, _> = ReflectionMapperBuilder::new(CodeSource { code: 7 }).apply();
  match result {
    Err(MapperError::MissingAccessor { type_name, method }) => {
      assert!(type_name.contains("Frozen"));
      assert_eq!(method, "setCode");
    }
    other => panic!("unexpected result: {:?}", other.map(|_| ())),
  }
}

#[test]
fn test_same_name_different_type_fails_at_invocation() {
  #[derive(Reflected, Default, Clone)]
  struct NarrowSource {
    count: i32,
  }

  #[derive(Reflected, Default, Clone)]
  struct WideDest {
    count: i64,
  }

  let result: Result<WideDest, _> = ReflectionMapperBuilder::new(NarrowSource { count: 1 }).apply();
  match result {
    Err(MapperError::Invocation { method, .. }) => assert_eq!(method, "setCount"),
    other => panic!("unexpected result: {:?}", other.map(|_| ())),
  }
}

#[test]
fn test_excluded_field_is_not_auto_mapped_but_stays_settable() {
  let person: Person = ReflectionMapperBuilder::new(sample_record())
    .options(MapperOptions::new().exclude_field("age"))
    .apply()
    .unwrap();
  assert_eq!(person.name, "ada");
  assert_eq!(person.age, 0);

  let person: Person = ReflectionMapperBuilder::new(sample_record())
    .options(MapperOptions::new().exclude_field("age"))
    .with_setter(|person: &mut Person, age| person.age = age, 99)
    .apply()
    .unwrap();
  assert_eq!(person.age, 99);
}

#[test]
fn test_conditional_exclusion_evaluates_at_apply_time() {
  let gate = Arc::new(AtomicBool::new(true));

  let builder_options = |gate: &Arc<AtomicBool>| {
    let gate = Arc::clone(gate);
    MapperOptions::new().exclude_field_when("age", move || gate.load(Ordering::SeqCst))
  };

  let person: Person = ReflectionMapperBuilder::new(sample_record())
    .options(builder_options(&gate))
    .apply()
    .unwrap();
  assert_eq!(person.age, 0);

  gate.store(false, Ordering::SeqCst);
  let person: Person = ReflectionMapperBuilder::new(sample_record())
    .options(builder_options(&gate))
    .apply()
    .unwrap();
  assert_eq!(person.age, 36);
}

#[test]
fn test_destination_affixes_reshape_the_getter_lookup() {
  #[derive(Reflected, Default, Clone)]
  struct PlainSource {
    foo: String,
    done: bool,
  }

  #[derive(Reflected, Default, Clone)]
  #[allow(non_snake_case)]
  struct AffixedDest {
    myPrefixFooMySuffix: String,
    myPrefixDoneMySuffix: bool,
  }

  let source = PlainSource {
    foo: "hello".to_string(),
    done: true,
  };
  // `myPrefixFooMySuffix` resolves `getFoo`; the bool field resolves
  // `isDone`.
  let dest: AffixedDest = ReflectionMapperBuilder::new(source)
    .options(
      MapperOptions::new()
        .destination_field_prefix("myPrefix")
        .destination_field_suffix("MySuffix"),
    )
    .apply()
    .unwrap();
  assert_eq!(dest.myPrefixFooMySuffix, "hello");
  assert!(dest.myPrefixDoneMySuffix);
}

#[test]
fn test_source_affixes_reshape_the_getter_lookup() {
  #[derive(Reflected, Default, Clone)]
  #[allow(non_snake_case)]
  struct RawSource {
    srcNameRaw: String,
  }

  #[derive(Reflected, Default, Clone)]
  struct NameDest {
    name: String,
  }

  let source = RawSource { srcNameRaw: "ada".to_string() };
  // Destination field `name` resolves `getSrcNameRaw` on the source.
  let dest: NameDest = ReflectionMapperBuilder::new(source)
    .options(
      MapperOptions::new()
        .source_field_prefix("src")
        .source_field_suffix("Raw"),
    )
    .apply()
    .unwrap();
  assert_eq!(dest.name, "ada");
}

#[test]
fn test_explicit_setter_overrides_auto_mapped_field() {
  let person: Person = ReflectionMapperBuilder::new(sample_record())
    .with_setter(|person: &mut Person, name| person.name = name, "grace".to_string())
    .apply()
    .unwrap();
  assert_eq!(person.name, "grace");
  assert_eq!(person.age, 36);
}

#[test]
fn test_gated_override_leaves_auto_mapped_value() {
  let person: Person = ReflectionMapperBuilder::new(sample_record())
    .with_start_condition(|| false)
    .with_setter(|person: &mut Person, name| person.name = name, "grace".to_string())
    .with_end_condition()
    .with_setter(|person: &mut Person, age| person.age = age, 99)
    .apply()
    .unwrap();
  assert_eq!(person.name, "ada");
  assert_eq!(person.age, 99);
}

#[test]
fn test_setter_from_another_object_after_auto_mapping() {
  let extra = PersonRecord {
    name: "grace".to_string(),
    age: 46,
    active: false,
  };
  let person: Person = ReflectionMapperBuilder::new(sample_record())
    .with_setter_from(
      |person: &mut Person, age| person.age = age,
      &extra,
      |record: &PersonRecord| record.age,
    )
    .apply()
    .unwrap();
  assert_eq!(person.name, "ada");
  assert_eq!(person.age, 46);
}

#[test]
fn test_absent_destination_fails_with_configured_error() {
  let result: Result<Person, _> =
    ReflectionMapperBuilder::for_destination(sample_record(), None)
      .options(MapperOptions::new().error_message("destination was never created"))
      .apply();
  match result {
    Err(MapperError::NullTarget(message)) => {
      assert_eq!(message, "destination was never created");
    }
    other => panic!("unexpected result: {:?}", other.map(|_| ())),
  }
}

#[test]
fn test_unsourced_mapper_cannot_be_applied_directly() {
  let result = ReflectionMapperBuilder::<Person, PersonRecord>::unsourced().apply();
  assert!(matches!(result, Err(MapperError::UnboundSource { .. })));
}

#[derive(Reflected, Default, Clone, Debug, PartialEq)]
struct AddressRecord {
  street: String,
  zip: i32,
}

#[derive(Reflected, Default, Clone, Debug, PartialEq)]
struct Address {
  street: String,
  zip: i32,
}

#[derive(Reflected, Default, Clone)]
struct ContactRecord {
  name: String,
  address: AddressRecord,
}

#[derive(Reflected, Default, Clone)]
struct Contact {
  name: String,
  address: Address,
}

fn sample_contact_record() -> ContactRecord {
  ContactRecord {
    name: "ada".to_string(),
    address: AddressRecord {
      street: "main st".to_string(),
      zip: 12345,
    },
  }
}

#[test]
fn test_type_level_nested_mapper_binds_source_lazily() {
  let nested = ReflectionMapperBuilder::<Address, AddressRecord>::unsourced();
  assert!(!fieldmapper::Mapper::source_bound(&nested));

  let contact: Contact = ReflectionMapperBuilder::new(sample_contact_record())
    .with_internal_type_mapper(nested)
    .apply()
    .unwrap();
  assert_eq!(contact.name, "ada");
  assert_eq!(
    contact.address,
    Address {
      street: "main st".to_string(),
      zip: 12345,
    }
  );
}

#[test]
fn test_field_level_mapper_wins_over_type_level() {
  let type_level = ReflectionMapperBuilder::<Address, AddressRecord>::unsourced();
  let field_level = MapperBuilder::<Address>::new()
    .with_setter(|address: &mut Address, street| address.street = street, "side st".to_string())
    .with_setter(|address: &mut Address, zip| address.zip = zip, 99999);

  let contact: Contact = ReflectionMapperBuilder::new(sample_contact_record())
    .with_internal_type_mapper(type_level)
    .with_internal_field_mapper("address", field_level)
    .apply()
    .unwrap();
  assert_eq!(contact.address.street, "side st");
  assert_eq!(contact.address.zip, 99999);
}

#[test]
fn test_nested_mapper_with_presupplied_source() {
  let nested = ReflectionMapperBuilder::<Address, AddressRecord>::new(AddressRecord {
    street: "other st".to_string(),
    zip: 54321,
  });

  // An already-sourced nested mapper keeps its own source; the parent's
  // getter result is not bound over it.
  let contact: Contact = ReflectionMapperBuilder::new(sample_contact_record())
    .with_internal_type_mapper(nested)
    .apply()
    .unwrap();
  assert_eq!(contact.address.street, "other st");
  assert_eq!(contact.address.zip, 54321);
}

#[test]
fn test_skipped_field_stays_out_of_the_accessor_table() {
  #[derive(Reflected, Default, Clone)]
  struct WithHandle {
    name: String,
    #[reflected(skip)]
    handle: Option<std::rc::Rc<String>>,
  }

  assert_eq!(fieldmapper::declared_fields_of::<WithHandle>().len(), 1);
  assert!(fieldmapper::find_method::<WithHandle>("getHandle").is_none());

  // The skipped field takes no part in mapping.
  let dest: WithHandle = ReflectionMapperBuilder::new(sample_record()).apply().unwrap();
  assert_eq!(dest.name, "ada");
  assert!(dest.handle.is_none());
}

//! # FieldMapper
//!
//! Object-to-object field mapping: a fluent builder for conditional setter
//! sequences, plus a convention-based engine that copies fields between
//! objects by resolving JavaBean-style accessor names at runtime.
//!
//! Deriving [`Reflected`] records, per struct field, a `getFoo`/`isFoo`
//! getter and a `setFoo` setter in an accessor table. A
//! [`ReflectionMapperBuilder`] walks the destination type's fields, resolves
//! the matching source getter through a process-wide table cache, and copies
//! the value; explicitly queued setters run afterwards and may override the
//! automatic pass.
//!
//! # Example
//! ```
//!   use fieldmapper::{Reflected, ReflectionMapperBuilder};
//!
//!   #[derive(Reflected, Default, Clone)]
//!   struct AccountRecord {
//!     owner: String,
//!     balance: i64,
//!   }
//!
//!   #[derive(Reflected, Default, Clone)]
//!   struct Account {
//!     owner: String,
//!     balance: i64,
//!     note: String,
//!   }
//!
//!   let record = AccountRecord {
//!     owner: "ada".to_string(),
//!     balance: 42,
//!   };
//!
//!   // `owner` and `balance` are copied by the automatic pass; `note` has no
//!   // source getter and is left to the queued setter.
//!   let account: Account = ReflectionMapperBuilder::new(record)
//!     .with_setter(|account: &mut Account, note| account.note = note, "imported".to_string())
//!     .apply()
//!     .unwrap();
//!
//!   assert_eq!(account.owner, "ada");
//!   assert_eq!(account.balance, 42);
//!   assert_eq!(account.note, "imported");
//! ```

mod accessor;
mod builder;
mod error;
mod options;
mod reflection;

pub use fieldmapper_codegen::Reflected;

pub use accessor::{
  declared_fields_of, find_getter, find_method, find_setter, Accessor, FieldSpec, FieldValue,
  GetterHandle, MethodSpec, Reflected, SetterHandle,
};
pub use builder::{Mapper, MapperBuilder};
pub use error::{MapperError, ReflectError};
pub use options::MapperOptions;
pub use reflection::ReflectionMapperBuilder;

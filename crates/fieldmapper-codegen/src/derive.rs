use proc_macro2::TokenStream;
use proc_macro_error::{abort, abort_call_site, ResultExt};
use quote::{quote, ToTokens};
use syn::{Data, DeriveInput, Fields, Meta, NestedMeta, Type};

const ATTR_NAME: &str = "reflected";

#[derive(Debug)]
pub struct Derive {
  ident: syn::Ident,
  generics: syn::Generics,
  fields: Vec<ReflectedField>,
}

impl Derive {
  pub fn from_derive_input(input: &DeriveInput) -> Self {
    let fields = match input.data {
      Data::Struct(ref data) => match data.fields {
        Fields::Named(ref fields) => fields
          .named
          .iter()
          .map(ReflectedField::from_field)
          .collect(),
        _ => abort!(data.fields, "Only support named fields."),
      },
      _ => {
        abort_call_site!("Only support structs.");
      }
    };

    Self {
      ident: input.ident.clone(),
      generics: input.generics.clone(),
      fields,
    }
  }
}

impl ToTokens for Derive {
  fn to_tokens(&self, tokens: &mut TokenStream) {
    let ident = &self.ident;
    let (impl_generics, ty_generics, where_clause) = self.generics.split_for_impl();
    let self_ty = quote! { #ident #ty_generics };

    let field_specs: Vec<_> = self
      .fields
      .iter()
      .filter(|field| !field.config.skip)
      .map(|field| field.field_spec_tokens())
      .collect();

    let mut method_specs = Vec::new();
    for field in &self.fields {
      if field.config.skip {
        continue;
      }
      if !field.config.write_only {
        method_specs.push(field.getter_spec_tokens(&self_ty));
      }
      if !field.config.read_only {
        method_specs.push(field.setter_spec_tokens(&self_ty));
      }
    }

    tokens.extend(quote! {
      impl #impl_generics fieldmapper::Reflected for #ident #ty_generics #where_clause {
        fn declared_fields() -> Vec<fieldmapper::FieldSpec> {
          vec![#(#field_specs),*]
        }

        fn declared_methods() -> Vec<fieldmapper::MethodSpec> {
          vec![#(#method_specs),*]
        }
      }
    });
  }
}

#[derive(Debug)]
struct ReflectedField {
  ident: syn::Ident,
  ty: syn::Type,
  config: FieldConfig,
}

impl ReflectedField {
  fn from_field(field: &syn::Field) -> Self {
    Self {
      ident: field.ident.clone().unwrap(),
      ty: field.ty.clone(),
      config: FieldConfig::from_field(field),
    }
  }

  fn getter_name(&self) -> String {
    let verb = if is_bool(&self.ty) { "is" } else { "get" };
    format!("{}{}", verb, capitalize(&self.ident.to_string()))
  }

  fn setter_name(&self) -> String {
    format!("set{}", capitalize(&self.ident.to_string()))
  }

  fn field_spec_tokens(&self) -> TokenStream {
    let name = self.ident.to_string();
    let ty = &self.ty;
    let is_bool = is_bool(ty);
    quote! {
      fieldmapper::FieldSpec {
        name: #name,
        type_name: std::any::type_name::<#ty>(),
        is_bool: #is_bool,
      }
    }
  }

  fn getter_spec_tokens(&self, self_ty: &TokenStream) -> TokenStream {
    let name = self.getter_name();
    let field = &self.ident;
    quote! {
      fieldmapper::MethodSpec {
        name: #name,
        accessor: fieldmapper::Accessor::Getter(
          |object: &dyn std::any::Any| -> Result<fieldmapper::FieldValue, fieldmapper::ReflectError> {
            let object = object
              .downcast_ref::<#self_ty>()
              .ok_or(fieldmapper::ReflectError::ReceiverType {
                method: #name,
                expected: std::any::type_name::<#self_ty>(),
              })?;
            Ok(Box::new(object.#field.clone()))
          },
        ),
      }
    }
  }

  fn setter_spec_tokens(&self, self_ty: &TokenStream) -> TokenStream {
    let name = self.setter_name();
    let field = &self.ident;
    let ty = &self.ty;
    quote! {
      fieldmapper::MethodSpec {
        name: #name,
        accessor: fieldmapper::Accessor::Setter {
          param_type: std::any::type_name::<#ty>(),
          handle: |object: &mut dyn std::any::Any, value: fieldmapper::FieldValue| -> Result<(), fieldmapper::ReflectError> {
            let object = object
              .downcast_mut::<#self_ty>()
              .ok_or(fieldmapper::ReflectError::ReceiverType {
                method: #name,
                expected: std::any::type_name::<#self_ty>(),
              })?;
            let value = value
              .downcast::<#ty>()
              .map_err(|_| fieldmapper::ReflectError::ValueType {
                method: #name,
                expected: std::any::type_name::<#ty>(),
              })?;
            object.#field = *value;
            Ok(())
          },
        },
      }
    }
  }
}

#[derive(Debug, Default, Clone, Copy)]
struct FieldConfig {
  skip: bool,
  read_only: bool,
  write_only: bool,
}

impl FieldConfig {
  // #[reflected(skip)]
  // #[reflected(read_only)]
  // #[reflected(write_only)]
  fn from_field(field: &syn::Field) -> Self {
    let mut config = Self::default();
    for attr in &field.attrs {
      let meta = attr.parse_meta().unwrap_or_abort();
      let list = match meta {
        Meta::List(ref list)
          if list.path.get_ident().map(|v| v == ATTR_NAME).unwrap_or_default() =>
        {
          list
        }
        _ => continue,
      };
      for nested in &list.nested {
        match nested {
          NestedMeta::Meta(Meta::Path(ref path)) => {
            if path.is_ident("skip") {
              config.skip = true;
            } else if path.is_ident("read_only") {
              config.read_only = true;
            } else if path.is_ident("write_only") {
              config.write_only = true;
            } else {
              abort!(path, "Unknown option.");
            }
          }
          _ => {
            abort!(nested, "Expected `skip`, `read_only` or `write_only`.");
          }
        }
      }
    }
    if config.skip && (config.read_only || config.write_only) {
      abort!(field, "`skip` cannot be combined with other options.");
    }
    if config.read_only && config.write_only {
      abort!(field, "`read_only` and `write_only` are mutually exclusive.");
    }
    config
  }
}

fn is_bool(ty: &Type) -> bool {
  match ty {
    Type::Path(syn::TypePath { qself: None, ref path }) => path.is_ident("bool"),
    _ => false,
  }
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

#[test]
fn test_capitalize() {
  assert_eq!(capitalize("value"), "Value");
  assert_eq!(capitalize("Value"), "Value");
  assert_eq!(capitalize(""), "");
}

#[test]
fn test_is_bool() {
  let ty: Type = syn::parse_str("bool").unwrap();
  assert!(is_bool(&ty));
  let ty: Type = syn::parse_str("Option<bool>").unwrap();
  assert!(!is_bool(&ty));
  let ty: Type = syn::parse_str("Vec<String>").unwrap();
  assert!(!is_bool(&ty));
}

#[test]
fn test_accessor_names() {
  let input: DeriveInput = syn::parse_str("struct S { value: i32, ready: bool }").unwrap();
  let derive = Derive::from_derive_input(&input);
  assert_eq!(derive.fields[0].getter_name(), "getValue");
  assert_eq!(derive.fields[0].setter_name(), "setValue");
  assert_eq!(derive.fields[1].getter_name(), "isReady");
  assert_eq!(derive.fields[1].setter_name(), "setReady");
}

#[test]
fn test_field_config_flags() {
  let input: DeriveInput = syn::parse_str(
    "struct S {
      plain: i32,
      #[reflected(skip)]
      hidden: i32,
      #[reflected(read_only)]
      frozen: i32,
      #[reflected(write_only)]
      sink: i32,
    }",
  )
  .unwrap();
  let derive = Derive::from_derive_input(&input);
  assert!(!derive.fields[0].config.skip);
  assert!(derive.fields[1].config.skip);
  assert!(derive.fields[2].config.read_only);
  assert!(derive.fields[3].config.write_only);
}

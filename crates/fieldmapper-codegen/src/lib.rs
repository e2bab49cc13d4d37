extern crate proc_macro;

use quote::quote;
use syn::{parse_macro_input, DeriveInput};

mod derive;

use derive::Derive;

#[proc_macro_derive(Reflected, attributes(reflected))]
#[proc_macro_error::proc_macro_error]
pub fn derive_reflected(tokens: proc_macro::TokenStream) -> proc_macro::TokenStream {
  let input = parse_macro_input!(tokens as DeriveInput);
  let derive: Derive = Derive::from_derive_input(&input);
  let tokens = quote!(#derive);
  tokens.into()
}

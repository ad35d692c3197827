//! Proc macros for `dsv-migrate`.
//!
//! - **`#[record]`**: attribute macro that implements `dsv_migrate::Record`
//!   for a serde type, using the crate's postcard codec.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, punctuated::Punctuated, token::Comma, DeriveInput, Meta};

/// Attribute macro that makes a serde type a record kind.
///
/// # Attributes
///
/// - `kind = "name"`: optional. The stable kind name. Defaults to the type's
///   identifier. Must be non-empty and contain no whitespace; an invalid name
///   is reported when a migration using the type is built.
///
/// # Generated Implementations
///
/// - `dsv_migrate::Record` with `KIND = kind`, encoding and decoding through
///   `dsv_migrate::codec`. The type must implement `Serialize` and
///   `DeserializeOwned`.
///
/// # Example
///
/// ```ignore
/// use dsv_migrate::record;
/// use serde::{Deserialize, Serialize};
///
/// #[record(kind = "sensor.v2")]
/// #[derive(Debug, Serialize, Deserialize)]
/// struct SensorV2 {
///     device_id: String,
///     celsius: f64,
/// }
/// ```
#[proc_macro_attribute]
pub fn record(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let args = parse_macro_input!(attr with Punctuated::<Meta, Comma>::parse_terminated);

    let mut kind: Option<String> = None;

    for meta in &args {
        let nv = match meta {
            Meta::NameValue(nv) => nv,
            other => {
                return syn::Error::new_spanned(other, "expected `kind = \"...\"`")
                    .to_compile_error()
                    .into();
            }
        };
        let key = nv
            .path
            .get_ident()
            .map(|i| i.to_string())
            .unwrap_or_default();
        match key.as_str() {
            "kind" => {
                if let syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(lit),
                    ..
                }) = &nv.value
                {
                    kind = Some(lit.value());
                } else {
                    return syn::Error::new_spanned(&nv.value, "`kind` must be a string literal")
                        .to_compile_error()
                        .into();
                }
            }
            _ => {
                return syn::Error::new_spanned(&nv.path, format!("unknown attribute `{key}`"))
                    .to_compile_error()
                    .into();
            }
        }
    }

    let name = &input.ident;
    let kind = kind.unwrap_or_else(|| name.to_string());
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        #input

        impl #impl_generics ::dsv_migrate::Record for #name #ty_generics #where_clause {
            const KIND: &'static str = #kind;

            fn encode(&self) -> ::core::result::Result<
                ::std::vec::Vec<u8>,
                ::dsv_migrate::CodecError,
            > {
                ::dsv_migrate::codec::encode(self)
            }

            fn decode(bytes: &[u8]) -> ::core::result::Result<Self, ::dsv_migrate::CodecError> {
                ::dsv_migrate::codec::decode(bytes)
            }
        }
    };

    expanded.into()
}

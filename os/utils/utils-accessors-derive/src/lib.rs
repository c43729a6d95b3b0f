//! # Accessor Derive
//!
//! This crate provides a derive macro for generating getters and builder-style
//! setters for configuration structs.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, parse_macro_input, spanned::Spanned};

/// Derive to generate, for each **named** field:
///
/// - `const .<field>(&self) -> Ty` (by value; the field type must be `Copy`),
/// - `.set_<field>(&mut self, value: Ty) -> &mut Self`,
/// - `const .with_<field>(mut self, value: Ty) -> Self`.
///
/// # Example
///
/// ```
/// use utils_accessors_derive::Accessors;
///
/// #[derive(Clone, Copy, Accessors)]
/// struct Identity {
///     revision: u32,
///     name: [u8; 4],
/// }
///
/// let mut id = Identity { revision: 1, name: *b"HEST" };
/// id.set_name(*b"BERT");
/// let id = id.with_revision(2);
/// assert_eq!(id.revision(), 2);
/// assert_eq!(&id.name(), b"BERT");
/// ```
#[proc_macro_derive(Accessors)]
pub fn derive_accessors(input: TokenStream) -> TokenStream {
    let DeriveInput {
        ident,
        generics,
        data,
        ..
    } = parse_macro_input!(input as DeriveInput);

    let fields = match data {
        Data::Struct(s) => match s.fields {
            Fields::Named(n) => n.named,
            Fields::Unnamed(u) => {
                return syn::Error::new(u.span(), "Accessors only supports named fields")
                    .to_compile_error()
                    .into();
            }
            Fields::Unit => {
                return syn::Error::new(ident.span(), "Accessors does not apply to unit structs")
                    .to_compile_error()
                    .into();
            }
        },
        _ => {
            return syn::Error::new(ident.span(), "Accessors can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let methods = fields.iter().filter_map(|field| {
        let fname = field.ident.as_ref()?;
        let ty = &field.ty;
        let set_name = format_ident!("set_{}", fname);
        let with_name = format_ident!("with_{}", fname);

        Some(quote! {
            #[inline]
            #[must_use]
            pub const fn #fname(&self) -> #ty {
                self.#fname
            }

            #[inline]
            pub fn #set_name(&mut self, value: #ty) -> &mut Self {
                self.#fname = value;
                self
            }

            #[inline]
            #[must_use]
            pub const fn #with_name(mut self, value: #ty) -> Self {
                self.#fname = value;
                self
            }
        })
    });

    let expanded = quote! {
        impl #impl_generics #ident #ty_generics #where_clause {
            #(#methods)*
        }
    };

    TokenStream::from(expanded)
}

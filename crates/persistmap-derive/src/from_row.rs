//! FromRow derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

use crate::attrs::{column_name, field_attr, named_fields};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let fields = named_fields(&input, "FromRow")?;

    let field_extracts = fields
        .iter()
        .map(|field| {
            let attr = field_attr(field)?;
            let field_name = field
                .ident
                .as_ref()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
            let ty = &field.ty;

            Ok(if attr.ignore {
                quote! { #field_name: ::std::default::Default::default() }
            } else if attr.base {
                quote! { #field_name: <#ty as ::persistmap::FromRow>::from_row(row)? }
            } else {
                let column_name = column_name(field, &attr)?;
                quote! { #field_name: row.try_get_column(#column_name)? }
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(quote! {
        impl #impl_generics ::persistmap::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &::persistmap::Row) -> ::persistmap::OrmResult<Self> {
                use ::persistmap::RowExt;
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}

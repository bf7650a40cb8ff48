//! Entity derive macro implementation

use heck::ToShoutySnakeCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{DeriveInput, Result};

use crate::attrs::{column_name, field_attr, named_fields, table_name};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let table = table_name(&input)?;
    let fields = named_fields(&input, "Entity")?;

    let mut consts = Vec::new();
    let mut own_fields = Vec::new();
    let mut own_values = Vec::new();
    let mut base_fields = Vec::new();
    let mut base_values = Vec::new();
    let mut columns: Vec<String> = Vec::new();

    for field in fields {
        let attr = field_attr(field)?;
        if attr.ignore {
            continue;
        }
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let ty = &field.ty;

        if attr.base {
            base_fields.push(quote! {
                fields = ::persistmap::merge_fields(fields, <#ty as ::persistmap::Entity>::fields());
            });
            base_values.push(quote! {
                values = ::persistmap::merge_values(values, ::persistmap::Entity::values(&self.#ident));
            });
            continue;
        }

        let column = column_name(field, &attr)?;
        if columns.iter().any(|c| c.eq_ignore_ascii_case(&column)) {
            return Err(syn::Error::new_spanned(
                field,
                format!("column `{column}` is mapped twice"),
            ));
        }
        columns.push(column.clone());

        let const_name = format_ident!("COL_{}", ident.unraw().to_string().to_shouty_snake_case());
        let doc = format!("Column `{table}.{column}`.");
        consts.push(quote! {
            #[doc = #doc]
            pub const #const_name: ::persistmap::Column<Self, #ty> = ::persistmap::Column::new(#column);
        });

        let key = attr.key.then(|| quote!(.key()));
        let auto = attr.auto.then(|| quote!(.auto_increment()));
        own_fields.push(quote! {
            ::persistmap::FieldDef::new(
                #column,
                <#ty as ::persistmap::SqlField>::FIELD_TYPE,
                <#ty as ::persistmap::SqlField>::NULLABLE,
            )#key #auto
        });
        own_values.push(quote! {
            (#column, ::persistmap::ToValue::to_value(&self.#ident))
        });
    }

    if columns.is_empty() && base_fields.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Entity needs at least one mapped field",
        ));
    }

    Ok(quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            #(#consts)*
        }

        impl #impl_generics ::persistmap::Entity for #name #ty_generics #where_clause {
            fn entity_name() -> &'static str {
                #table
            }

            #[allow(unused_mut)]
            fn fields() -> ::std::vec::Vec<::persistmap::FieldDef> {
                let mut fields = ::std::vec::Vec::new();
                #(#base_fields)*
                ::persistmap::merge_fields(fields, ::std::vec![#(#own_fields),*])
            }

            #[allow(unused_mut)]
            fn values(&self) -> ::std::vec::Vec<(&'static str, ::persistmap::Value)> {
                let mut values = ::std::vec::Vec::new();
                #(#base_values)*
                ::persistmap::merge_values(values, ::std::vec![#(#own_values),*])
            }
        }
    })
}

//! Parsing of struct-level and field-level `#[orm(...)]` attributes.

use proc_macro2::Span;
use syn::ext::IdentExt;
use syn::{DeriveInput, LitStr, Result};

use crate::sql_ident::parse_sql_ident_with_span;

/// Flags and options of one field.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub key: bool,
    pub auto: bool,
    pub ignore: bool,
    pub base: bool,
    pub column: Option<LitStr>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            match ident.to_string().as_str() {
                "key" => attr.key = true,
                "auto" => attr.auto = true,
                "ignore" => attr.ignore = true,
                "base" => attr.base = true,
                "column" => {
                    let _: syn::Token![=] = input.parse()?;
                    attr.column = Some(input.parse()?);
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!(
                            "unknown orm attribute `{other}` (expected key, auto, ignore, base or column)"
                        ),
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(attr)
    }
}

/// Merge every `#[orm(...)]` attribute of a field.
pub(crate) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let parsed: FieldAttr = attr.parse_args()?;
        merged.key |= parsed.key;
        merged.auto |= parsed.auto;
        merged.ignore |= parsed.ignore;
        merged.base |= parsed.base;
        if parsed.column.is_some() {
            merged.column = parsed.column;
        }
    }

    if merged.ignore && (merged.key || merged.auto || merged.base) {
        return Err(syn::Error::new_spanned(
            field,
            "an ignored field cannot also be key, auto or base",
        ));
    }
    if merged.base && (merged.key || merged.auto || merged.column.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "a base field takes its columns from the base entity",
        ));
    }
    Ok(merged)
}

/// Column name of a field: `#[orm(column = "...")]` or the field name.
pub(crate) fn column_name(field: &syn::Field, attr: &FieldAttr) -> Result<String> {
    match &attr.column {
        Some(lit) => parse_sql_ident_with_span(&lit.value(), lit.span(), "column"),
        None => {
            let ident = field
                .ident
                .as_ref()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
            Ok(ident.unraw().to_string())
        }
    }
}

/// Table name: `#[orm(table = "...")]` or the struct name.
pub(crate) fn table_name(input: &DeriveInput) -> Result<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let nested = attr.parse_args::<syn::MetaNameValue>()?;
        if !nested.path.is_ident("table") {
            return Err(syn::Error::new_spanned(
                &nested.path,
                "unknown orm attribute (expected table = \"...\")",
            ));
        }
        if let syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) = &nested.value
        {
            return parse_sql_ident_with_span(&lit.value(), lit.span(), "table");
        }
        return Err(syn::Error::new_spanned(
            &nested.value,
            "table must be a string literal",
        ));
    }
    parse_sql_ident_with_span(&input.ident.to_string(), Span::call_site(), "table")
}

/// Named fields of a struct, or an error naming the derive.
pub(crate) fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<&'a syn::punctuated::Punctuated<syn::Field, syn::Token![,]>> {
    match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        )),
    }
}

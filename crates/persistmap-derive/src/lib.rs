//! Derive macros for persistmap
//!
//! Provides `#[derive(Entity)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod entity;
mod from_row;
mod sql_ident;

/// Derive `Entity` metadata for a struct.
///
/// # Example
///
/// ```ignore
/// use persistmap::Entity;
///
/// #[derive(Entity)]
/// #[orm(table = "Warrior")]
/// struct Warrior {
///     #[orm(key, auto, column = "ID")]
///     id: i32,
///     #[orm(column = "Name")]
///     name: String,
///     #[orm(ignore)]
///     loaded: bool,
/// }
/// ```
///
/// # Generated
///
/// - `COL_*: Column<Self, FieldType>` - Typed column constants, one per mapped field
/// - `impl Entity` - Table name, field metadata and field values
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (defaults to the struct name)
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(key)]` - Primary key member
/// - `#[orm(auto)]` - Database-generated value, skipped on insert
/// - `#[orm(ignore)]` - Not mapped
/// - `#[orm(base)]` - Embedded base entity whose fields come first
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `FromRow` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use persistmap::FromRow;
///
/// #[derive(FromRow)]
/// struct Warrior {
///     #[orm(column = "ID")]
///     id: i32,
///     name: String,
///     race: Option<String>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(ignore)]` - Filled with `Default::default()`
/// - `#[orm(base)]` - Read through the base type's `FromRow`
#[proc_macro_derive(FromRow, attributes(orm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

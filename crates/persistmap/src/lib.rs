//! # persistmap
//!
//! Typed queries compiled to dialect-specific SQL.
//!
//! ## Features
//!
//! - **Query parts**: every statement is an ordered container of tagged parts,
//!   compiled in one pass by the active [`Dialect`]
//! - **Typed predicates**: `Column<E, V>` descriptors build [`Expr`] trees that
//!   are lowered to SQL with NULL-safe comparisons and explicit precedence
//! - **Dialects**: SQL Server, SQLite and SQL Server Compact
//! - **Unit of work**: mutations and DDL are queued and run on `commit()`
//! - **Interceptors**: before-compile and before-execute hooks per subject
//!   type, with optional execution overrides
//! - **Safe defaults**: DELETE and UPDATE require WHERE, UPDATE requires SET
//!
//! ## Example
//!
//! ```ignore
//! use persistmap::prelude::*;
//!
//! #[derive(Entity, FromRow)]
//! struct Warrior {
//!     #[orm(key, auto, column = "ID")]
//!     id: i32,
//!     #[orm(column = "Name")]
//!     name: Option<String>,
//! }
//!
//! let mut ctx = DatabaseContext::new(connection, DialectKind::SqlServer.dialect());
//!
//! // SELECT runs immediately
//! let warriors: Vec<Warrior> = ctx
//!     .from::<Warrior>()
//!     .where_(Warrior::COL_NAME.starts_with("O"))
//!     .order_by(Warrior::COL_NAME)
//!     .select()?;
//!
//! // mutations are queued
//! ctx.insert(&Warrior { id: 0, name: Some("Olaf".into()) }).execute()?;
//! ctx.delete::<Warrior>().where_(Warrior::COL_ID.eq(7)).execute()?;
//! ctx.commit()?;
//! ```

// Lets derive-generated `::persistmap::` paths resolve inside this crate.
extern crate self as persistmap;

pub mod builder;
pub mod compiler;
pub mod connection;
pub mod context;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod expr;
pub mod interceptor;
pub mod parts;
pub mod prelude;
pub mod row;
pub mod script;
pub mod settings;
pub mod translate;
pub mod value;

pub use builder::{
    ColumnOptions, DatabaseBuilder, DeleteBuilder, InsertBuilder, ProcedureBuilder, SelectBuilder,
    TableBuilder, UpdateBuilder,
};
pub use compiler::{CompiledQuery, Compiler, QueryParameter};
pub use connection::{Connection, MockConnection};
pub use context::{Command, DatabaseContext};
pub use dialect::{
    Dialect, DialectKind, RowLimit, SqlServerCeDialect, SqlServerDialect, SqliteDialect,
};
pub use entity::{Column, ColumnRef, Entity, EntityRef, FieldDef, merge_fields, merge_values};
pub use error::{OrmError, OrmResult};
pub use expr::{CompareOp, Expr, IntoOperand, Operand};
pub use interceptor::{
    InterceptAction, Interceptor, InterceptorBuilder, InterceptorRegistry, TracingInterceptor,
};
pub use parts::{OperationType, QueryPart, QueryPartsContainer};
pub use row::{FromRow, Row, RowExt};
pub use script::split_batches;
pub use settings::ContextSettings;
pub use translate::{AliasMap, FunctionRegistry, Translator};
pub use value::{FieldType, FromValue, SqlField, ToValue, Value};

#[cfg(feature = "derive")]
pub use persistmap_derive::{Entity, FromRow};

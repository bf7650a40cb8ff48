//! Convenient imports for typical `persistmap` usage.
//!
//! ```ignore
//! use persistmap::prelude::*;
//! ```

pub use crate::{
    Column, ColumnOptions, Connection, ContextSettings, DatabaseContext, Dialect, DialectKind,
    Entity, Expr, FromRow, OrmError, OrmResult, Row, RowExt, Value,
};

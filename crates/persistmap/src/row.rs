//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value};

/// One result row: ordered `(column, value)` pairs as handed back by a
/// [`Connection`](crate::connection::Connection).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column (builder style).
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((column.into(), value.into()));
    }

    /// Look up a column by name, case-insensitively (SQL Server collation semantics).
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Trait for converting a result row into a Rust struct.
///
/// This trait should typically be derived using `#[derive(FromRow)]`
/// from the `persistmap-derive` crate.
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
pub trait FromRow: Sized {
    /// Convert a result row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(row.clone())
    }
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T: FromValue>(&self, column: &str) -> OrmResult<T>;
}

impl RowExt for Row {
    fn try_get_column<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| OrmError::decode(column, "column not present in result"))?;
        T::from_value(value).map_err(|e| OrmError::decode(column, e.to_string()))
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from!(
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    String => Text,
    &str => Text,
    rust_decimal::Decimal => Decimal,
    chrono::NaiveDate => Date,
    chrono::NaiveDateTime => DateTime,
    uuid::Uuid => Guid,
    Vec<u8> => Bytes,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let row = Row::new().with("ID", 1).with("Name", "Olaf");
        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert_eq!(row.try_get_column::<String>("NAME").unwrap(), "Olaf");
    }

    #[test]
    fn missing_column_is_decode_error() {
        let row = Row::new().with("ID", 1);
        let err = row.try_get_column::<i32>("Race").unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "Race"));
    }

    #[test]
    fn wrong_type_is_decode_error() {
        let row = Row::new().with("ID", "one");
        assert!(row.try_get_column::<i32>("ID").is_err());
    }
}

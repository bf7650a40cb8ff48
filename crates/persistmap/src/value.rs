//! Dynamically typed values and the Rust type → SQL type tags.
//!
//! [`Value`] is what flows through the compiler as a literal and what a
//! [`Row`](crate::row::Row) hands back for a column. [`ToValue`]/[`FromValue`]
//! convert between plain Rust types and `Value`; [`SqlField`] tells the DDL
//! layer which [`FieldType`] a Rust field maps to.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

use crate::error::{OrmError, OrmResult};

/// SQL-facing type tag of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Text,
    Date,
    DateTime,
    Guid,
    Bytes,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A literal or cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Guid(Uuid),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type tag of the value; `None` for `NULL`.
    pub fn field_type(&self) -> Option<FieldType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => FieldType::Bool,
            Value::Int(_) => FieldType::BigInt,
            Value::Float(_) => FieldType::Double,
            Value::Decimal(_) => FieldType::Decimal,
            Value::Text(_) => FieldType::Text,
            Value::Date(_) => FieldType::Date,
            Value::DateTime(_) => FieldType::DateTime,
            Value::Guid(_) => FieldType::Guid,
            Value::Bytes(_) => FieldType::Bytes,
        })
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Guid(_) => "guid",
            Value::Bytes(_) => "bytes",
        }
    }
}

/// Conversion into a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Conversion out of a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> OrmResult<Self>;
}

/// Maps a Rust field type to its [`FieldType`] and nullability.
pub trait SqlField {
    const FIELD_TYPE: FieldType;
    const NULLABLE: bool = false;
}

fn mismatch<T>(expected: &str, got: &Value) -> OrmResult<T> {
    Err(OrmError::Other(format!(
        "expected {expected}, got {}",
        got.kind()
    )))
}

macro_rules! int_value {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }
            }

            impl FromValue for $ty {
                fn from_value(value: &Value) -> OrmResult<Self> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(*v).map_err(|e| OrmError::Other(e.to_string())),
                        Value::Bool(b) => Ok(<$ty>::from(*b)),
                        other => mismatch(stringify!($ty), other),
                    }
                }
            }

            impl SqlField for $ty {
                const FIELD_TYPE: FieldType = FieldType::$field;
            }
        )*
    };
}

int_value!(u8 => TinyInt, i16 => SmallInt, i32 => Int, i64 => BigInt);

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(v) => Ok(*v != 0),
            Value::Text(s) if s == "1" || s == "0" => Ok(s == "1"),
            other => mismatch("bool", other),
        }
    }
}

impl SqlField for bool {
    const FIELD_TYPE: FieldType = FieldType::Bool;
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            Value::Decimal(d) => d
                .to_string()
                .parse()
                .map_err(|_| OrmError::Other(format!("decimal {d} out of range"))),
            other => mismatch("f64", other),
        }
    }
}

impl SqlField for f64 {
    const FIELD_TYPE: FieldType = FieldType::Double;
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> OrmResult<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl SqlField for f32 {
    const FIELD_TYPE: FieldType = FieldType::Float;
}

impl ToValue for Decimal {
    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }
}

impl FromValue for Decimal {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Decimal(d) => Ok(*d),
            Value::Int(v) => Ok(Decimal::from(*v)),
            Value::Text(s) => s
                .parse()
                .map_err(|e: rust_decimal::Error| OrmError::Other(e.to_string())),
            other => mismatch("decimal", other),
        }
    }
}

impl SqlField for Decimal {
    const FIELD_TYPE: FieldType = FieldType::Decimal;
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Guid(g) => Ok(g.to_string()),
            other => mismatch("text", other),
        }
    }
}

impl SqlField for String {
    const FIELD_TYPE: FieldType = FieldType::Text;
}

impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::DateTime(dt) => Ok(dt.date()),
            other => mismatch("date", other),
        }
    }
}

impl SqlField for NaiveDate {
    const FIELD_TYPE: FieldType = FieldType::Date;
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::Date(d) => Ok(d.and_time(chrono::NaiveTime::MIN)),
            Value::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .map_err(|e| OrmError::Other(e.to_string())),
            other => mismatch("datetime", other),
        }
    }
}

impl SqlField for NaiveDateTime {
    const FIELD_TYPE: FieldType = FieldType::DateTime;
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::DateTime(self.naive_utc())
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> OrmResult<Self> {
        NaiveDateTime::from_value(value).map(|dt| dt.and_utc())
    }
}

impl SqlField for DateTime<Utc> {
    const FIELD_TYPE: FieldType = FieldType::DateTime;
}

impl ToValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Guid(*self)
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Guid(g) => Ok(*g),
            Value::Text(s) => Uuid::parse_str(s).map_err(|e| OrmError::Other(e.to_string())),
            other => mismatch("guid", other),
        }
    }
}

impl SqlField for Uuid {
    const FIELD_TYPE: FieldType = FieldType::Guid;
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            other => mismatch("bytes", other),
        }
    }
}

impl SqlField for Vec<u8> {
    const FIELD_TYPE: FieldType = FieldType::Bytes;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> OrmResult<Self> {
        Ok(value.clone())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: SqlField> SqlField for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;
    const NULLABLE: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_maps_to_null() {
        assert_eq!(None::<i32>.to_value(), Value::Null);
        assert_eq!(Some(5i32).to_value(), Value::Int(5));
        assert_eq!(Option::<i32>::from_value(&Value::Null).unwrap(), None);
    }

    #[test]
    fn nullable_field_types() {
        assert_eq!(<Option<String> as SqlField>::FIELD_TYPE, FieldType::Text);
        assert!(<Option<String> as SqlField>::NULLABLE);
        assert!(!<String as SqlField>::NULLABLE);
    }

    #[test]
    fn int_from_value_range_checked() {
        assert_eq!(i32::from_value(&Value::Int(42)).unwrap(), 42);
        assert!(u8::from_value(&Value::Int(300)).is_err());
        assert!(i32::from_value(&Value::Text("x".into())).is_err());
    }

    #[test]
    fn bool_accepts_bit_encodings() {
        assert!(bool::from_value(&Value::Int(1)).unwrap());
        assert!(!bool::from_value(&Value::Text("0".into())).unwrap());
    }
}

use crate::error::{OrmError, OrmResult};
use crate::parts::{OperationType, Slot, ValueCollection};
use crate::value::FieldType;

use super::{
    column_definition, default_rule, render_values, required, Dialect, DialectKind, PartRule,
    RowLimit,
};

/// SQLite.
///
/// Columns can only be added, not dropped or altered, and an auto-increment
/// key is declared inline on its column.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn sql_type(&self, field_type: FieldType) -> &'static str {
        match field_type {
            FieldType::Bool
            | FieldType::TinyInt
            | FieldType::SmallInt
            | FieldType::Int
            | FieldType::BigInt => "INTEGER",
            FieldType::Float | FieldType::Double => "REAL",
            FieldType::Decimal => "NUMERIC",
            FieldType::Text | FieldType::Date | FieldType::DateTime | FieldType::Guid => "TEXT",
            FieldType::Bytes => "BLOB",
        }
    }

    fn rule(&self, op: OperationType) -> Option<PartRule> {
        use OperationType as Op;

        match op {
            Op::Limit => Some(PartRule::new("LIMIT ")),
            Op::Top | Op::RightJoin | Op::FullJoin | Op::DropColumn | Op::AlterColumn => None,
            _ => default_rule(op),
        }
    }

    fn render_values(&self, op: OperationType, values: &ValueCollection) -> OrmResult<String> {
        match op {
            OperationType::RenameTable => Ok(format!(
                "ALTER TABLE {} RENAME TO {}",
                required(values, Slot::Table, op)?,
                required(values, Slot::NewName, op)?,
            )),
            // The key is already declared inline with AUTOINCREMENT.
            OperationType::PrimaryKey if values.flag(Slot::AutoIncrement) => {
                let members = required(values, Slot::MemberName, op)?;
                if members.contains(',') {
                    return Err(OrmError::unsupported(format!(
                        "SQLite cannot combine AUTOINCREMENT with the composite key ({members})"
                    )));
                }
                Ok(String::new())
            }
            _ => render_values(self, op, values),
        }
    }

    /// AUTOINCREMENT declares the column as the key, so only key columns may carry it.
    fn column_definition(&self, values: &ValueCollection) -> OrmResult<String> {
        if values.flag(Slot::AutoIncrement) && !values.flag(Slot::Key) {
            return Err(OrmError::unsupported(format!(
                "SQLite AUTOINCREMENT requires a key column, '{}' is not one",
                values.text(Slot::MemberName).unwrap_or_default()
            )));
        }
        column_definition(self, values)
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
        format!("X'{hex}'")
    }

    fn auto_increment(&self) -> &'static str {
        "PRIMARY KEY AUTOINCREMENT"
    }

    fn add_column_keyword(&self) -> &'static str {
        "ADD COLUMN"
    }

    fn concat(&self, pieces: &[String]) -> String {
        pieces.join(" || ")
    }

    fn trim(&self, operand: &str) -> String {
        format!("TRIM({operand})")
    }

    fn length(&self, operand: &str) -> String {
        format!("LENGTH({operand})")
    }

    fn row_limit(&self) -> RowLimit {
        RowLimit::Limit
    }
}

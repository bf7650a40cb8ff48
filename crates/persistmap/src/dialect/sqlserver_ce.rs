use crate::parts::OperationType;
use crate::value::FieldType;

use super::{default_rule, Dialect, DialectKind, PartRule};

/// SQL Server Compact Edition: SQL Server syntax without procedures,
/// database DDL or batch scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerCeDialect;

impl Dialect for SqlServerCeDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::SqlServerCe
    }

    fn sql_type(&self, field_type: FieldType) -> &'static str {
        match field_type {
            FieldType::Bool => "bit",
            FieldType::TinyInt => "tinyint",
            FieldType::SmallInt => "smallint",
            FieldType::Int => "int",
            FieldType::BigInt => "bigint",
            FieldType::Float => "real",
            FieldType::Double => "float",
            FieldType::Decimal => "numeric(18,4)",
            FieldType::Text => "nvarchar(4000)",
            FieldType::Date | FieldType::DateTime => "datetime",
            FieldType::Guid => "uniqueidentifier",
            FieldType::Bytes => "image",
        }
    }

    fn rule(&self, op: OperationType) -> Option<PartRule> {
        match op {
            OperationType::Top => Some(PartRule::new("TOP (").suffix(")")),
            OperationType::FullJoin => None,
            _ => default_rule(op),
        }
    }
}

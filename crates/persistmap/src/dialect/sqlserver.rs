use crate::parts::OperationType;
use crate::value::FieldType;

use super::{default_rule, Dialect, DialectKind, ListGroup, PartRule};

/// Microsoft SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::SqlServer
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
            FieldType::Decimal => "decimal(18,4)",
            FieldType::Text => "varchar(max)",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Guid => "uniqueidentifier",
            FieldType::Bytes => "varbinary(max)",
        }
    }

    fn rule(&self, op: OperationType) -> Option<PartRule> {
        use OperationType as Op;

        Some(match op {
            Op::Procedure => PartRule::new("EXEC "),
            Op::Parameter => PartRule::new("").list(ListGroup::Parameters, ", "),
            Op::OutputParameter => PartRule::new("")
                .suffix(" OUTPUT")
                .list(ListGroup::Parameters, ", "),
            Op::OutputParameterDeclare | Op::OutputParameterSet => {
                PartRule::new("").standalone()
            }
            Op::OutputParameterSelect => PartRule::new("SELECT ")
                .list(ListGroup::OutputSelect, ", ")
                .standalone(),
            Op::CreateDatabase => PartRule::new("CREATE DATABASE "),
            Op::DropDatabase => PartRule::new("DROP DATABASE "),
            _ => return default_rule(op),
        })
    }

    fn supports_batches(&self) -> bool {
        true
    }

    fn system_database(&self) -> Option<&'static str> {
        Some("master")
    }
}

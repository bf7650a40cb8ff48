//! Dialects: per-tag rendering rules, type names and literal quoting.
//!
//! A dialect is a plain value passed to the compiler; several can coexist in
//! one process. Rules differ between dialects only in keyword spelling,
//! identity syntax, literal quoting and batch support; everything else comes
//! from [`default_rule`].

mod sqlite;
mod sqlserver;
mod sqlserver_ce;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, OrmResult};
use crate::parts::{OperationType, Slot, ValueCollection};
use crate::value::{FieldType, Value};

pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;
pub use sqlserver_ce::SqlServerCeDialect;

/// Decimal/double/float text longer than this is cut before quoting.
pub const NUMERIC_LITERAL_MAX_LEN: usize = 20;

/// Supported target databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    #[default]
    SqlServer,
    Sqlite,
    SqlServerCe,
}

impl DialectKind {
    pub fn dialect(self) -> Arc<dyn Dialect> {
        match self {
            DialectKind::SqlServer => Arc::new(SqlServerDialect),
            DialectKind::Sqlite => Arc::new(SqliteDialect),
            DialectKind::SqlServerCe => Arc::new(SqlServerCeDialect),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DialectKind::SqlServer => "sql_server",
            DialectKind::Sqlite => "sqlite",
            DialectKind::SqlServerCe => "sql_server_ce",
        })
    }
}

/// Where a row limit goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLimit {
    /// `SELECT TOP n ...`
    Top,
    /// `... LIMIT n`
    Limit,
}

/// Sibling parts sharing a list group are joined with the list separator,
/// and only the first one gets the rule prefix (`ORDER BY a, b DESC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListGroup {
    Fields,
    Order,
    Group,
    Parameters,
    OutputSelect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRule {
    pub group: ListGroup,
    pub separator: &'static str,
}

/// How an items part combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildLayout {
    /// Children joined with a separator.
    Joined(&'static str),
    /// Predicate chain folded left: `((p1 AND p2) OR p3)`.
    Fold,
}

/// Rendering rule for one [`OperationType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRule {
    pub prefix: &'static str,
    pub suffix: &'static str,
    pub list: Option<ListRule>,
    pub layout: ChildLayout,
    /// Emitted between an items part's head and its children.
    pub open: &'static str,
    pub close: &'static str,
    /// Renders as its own line (script-level statements such as `DECLARE`).
    pub standalone: bool,
}

impl PartRule {
    pub const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            suffix: "",
            list: None,
            layout: ChildLayout::Joined(", "),
            open: "",
            close: "",
            standalone: false,
        }
    }

    pub const fn suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = suffix;
        self
    }

    pub const fn list(mut self, group: ListGroup, separator: &'static str) -> Self {
        self.list = Some(ListRule { group, separator });
        self
    }

    pub const fn children(
        mut self,
        layout: ChildLayout,
        open: &'static str,
        close: &'static str,
    ) -> Self {
        self.layout = layout;
        self.open = open;
        self.close = close;
        self
    }

    pub const fn standalone(mut self) -> Self {
        self.standalone = true;
        self
    }
}

/// Rules shared by all dialects.
pub fn default_rule(op: OperationType) -> Option<PartRule> {
    use OperationType as Op;

    let rule = match op {
        Op::Select => PartRule::new("SELECT"),
        Op::Distinct => PartRule::new("DISTINCT"),
        Op::Top => PartRule::new("TOP "),
        Op::Field => PartRule::new("").list(ListGroup::Fields, ", "),
        Op::From => PartRule::new("FROM "),
        Op::Join => PartRule::new("INNER JOIN ").children(ChildLayout::Fold, " ON ", ""),
        Op::LeftJoin => PartRule::new("LEFT JOIN ").children(ChildLayout::Fold, " ON ", ""),
        Op::RightJoin => PartRule::new("RIGHT JOIN ").children(ChildLayout::Fold, " ON ", ""),
        Op::FullJoin => PartRule::new("FULL OUTER JOIN ").children(ChildLayout::Fold, " ON ", ""),
        Op::Where => PartRule::new("WHERE ").children(ChildLayout::Fold, "", ""),
        Op::Predicate => PartRule::new(""),
        Op::And => PartRule::new("AND "),
        Op::Or => PartRule::new("OR "),
        Op::OrderBy | Op::ThenBy => PartRule::new("ORDER BY ").list(ListGroup::Order, ", "),
        Op::OrderByDesc | Op::ThenByDesc => PartRule::new("ORDER BY ")
            .suffix(" DESC")
            .list(ListGroup::Order, ", "),
        Op::GroupBy | Op::ThenGroupBy => PartRule::new("GROUP BY ").list(ListGroup::Group, ", "),
        Op::Limit => return None,

        Op::Insert => PartRule::new("INSERT INTO "),
        Op::InsertMembers => PartRule::new("").children(ChildLayout::Joined(", "), "(", ")"),
        Op::InsertValues => {
            PartRule::new("VALUES ").children(ChildLayout::Joined(", "), "(", ")")
        }
        Op::Member | Op::Value | Op::Assignment => PartRule::new(""),
        Op::Update => PartRule::new("UPDATE "),
        Op::Set => PartRule::new("SET ").children(ChildLayout::Joined(", "), "", ""),
        Op::Delete => PartRule::new("DELETE FROM "),

        // Procedures and output parameters are SQL Server only.
        Op::Procedure
        | Op::Parameter
        | Op::OutputParameter
        | Op::OutputParameterDeclare
        | Op::OutputParameterSet
        | Op::OutputParameterSelect
        | Op::CreateDatabase
        | Op::DropDatabase => return None,

        Op::CreateTable => {
            PartRule::new("CREATE TABLE ").children(ChildLayout::Joined(", "), " (", ")")
        }
        Op::Column | Op::PrimaryKey | Op::ForeignKey => PartRule::new(""),
        Op::DropTable => PartRule::new("DROP TABLE "),
        Op::RenameTable => PartRule::new(""),
        Op::AlterTable => PartRule::new("").children(ChildLayout::Joined(";\n"), "", ""),
        Op::AddColumn | Op::DropColumn | Op::AlterColumn => PartRule::new(""),

        Op::Raw => PartRule::new(""),
    };
    Some(rule)
}

/// Keyword spelling, type names and literal rules of one target database.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn kind(&self) -> DialectKind;

    /// SQL type name for a field type.
    fn sql_type(&self, field_type: FieldType) -> &'static str;

    /// Rendering rule for a tag; `None` means the dialect cannot express it.
    fn rule(&self, op: OperationType) -> Option<PartRule> {
        default_rule(op)
    }

    /// Text of a value-collection part.
    fn render_values(&self, op: OperationType, values: &ValueCollection) -> OrmResult<String> {
        render_values(self, op, values)
    }

    /// Quoted literal.
    fn quote_value(&self, value: &Value) -> String {
        quote_value(self, value)
    }

    /// Type a GUID literal is cast to.
    fn guid_literal_type(&self) -> &'static str {
        "VARCHAR2(37)"
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(2 + bytes.len() * 2);
        out.push_str("0x");
        for b in bytes {
            out.push_str(&format!("{b:02X}"));
        }
        out
    }

    /// Column definition inside `CREATE TABLE` / `ADD`.
    fn column_definition(&self, values: &ValueCollection) -> OrmResult<String> {
        column_definition(self, values)
    }

    /// Identity clause appended to an auto-increment column.
    fn auto_increment(&self) -> &'static str {
        "IDENTITY(1,1)"
    }

    /// Keyword sequence that adds a column to an existing table.
    fn add_column_keyword(&self) -> &'static str {
        "ADD"
    }

    fn concat(&self, pieces: &[String]) -> String {
        pieces.join(" + ")
    }

    fn trim(&self, operand: &str) -> String {
        format!("LTRIM(RTRIM({operand}))")
    }

    fn length(&self, operand: &str) -> String {
        format!("LEN({operand})")
    }

    fn row_limit(&self) -> RowLimit {
        RowLimit::Top
    }

    /// Whether scripts may contain `GO` batch separators.
    fn supports_batches(&self) -> bool {
        false
    }

    /// Catalog to switch to for `CREATE/DROP DATABASE`.
    fn system_database(&self) -> Option<&'static str> {
        None
    }
}

/// Shared literal quoting.
pub fn quote_value<D: Dialect + ?Sized>(dialect: &D, value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "'1'" } else { "'0'" }.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) => quote_str(&truncate_numeric(v.to_string())),
        Value::Decimal(d) => quote_str(&truncate_numeric(d.to_string())),
        Value::Text(s) => quote_str(s),
        Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Value::DateTime(dt) => {
            if dt.time() == chrono::NaiveTime::MIN {
                format!("'{}'", dt.format("%Y-%m-%d"))
            } else if dt.and_utc().timestamp_subsec_nanos() == 0 {
                format!("'{}'", dt.format("%Y-%m-%dT%H:%M:%S"))
            } else {
                format!("'{}'", dt.format("%Y-%m-%dT%H:%M:%S%.3f"))
            }
        }
        Value::Guid(g) => format!("CAST('{g}' AS {})", dialect.guid_literal_type()),
        Value::Bytes(b) => dialect.bytes_literal(b),
    }
}

/// `'text'` with embedded quotes doubled.
pub fn quote_str(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn truncate_numeric(mut text: String) -> String {
    if text.len() > NUMERIC_LITERAL_MAX_LEN {
        text.truncate(NUMERIC_LITERAL_MAX_LEN);
    }
    text
}

fn required<'v>(values: &'v ValueCollection, slot: Slot, op: OperationType) -> OrmResult<&'v str> {
    values
        .text(slot)
        .ok_or_else(|| OrmError::validation(format!("{op} part is missing its {slot} slot")))
}

/// Shared column definition: `Name type NULL|NOT NULL [identity]`.
pub fn column_definition<D: Dialect + ?Sized>(
    dialect: &D,
    values: &ValueCollection,
) -> OrmResult<String> {
    let name = required(values, Slot::MemberName, OperationType::Column)?;
    let sql_type = match (values.text(Slot::MemberType), values.field_type(Slot::MemberType)) {
        (Some(custom), _) => custom.to_string(),
        (None, Some(ft)) => dialect.sql_type(ft).to_string(),
        (None, None) => {
            return Err(OrmError::validation(format!(
                "column '{name}' has no type"
            )));
        }
    };
    let nullable = values.flag(Slot::Nullable) && !values.flag(Slot::Key);
    let mut def = format!(
        "{name} {sql_type} {}",
        if nullable { "NULL" } else { "NOT NULL" }
    );
    if values.flag(Slot::AutoIncrement) {
        def.push(' ');
        def.push_str(dialect.auto_increment());
    }
    Ok(def)
}

/// Shared value-collection rendering, dispatched on the part's tag.
pub fn render_values<D: Dialect + ?Sized>(
    dialect: &D,
    op: OperationType,
    values: &ValueCollection,
) -> OrmResult<String> {
    use OperationType as Op;

    let literal = || dialect.quote_value(values.literal(Slot::Value).unwrap_or(&Value::Null));

    Ok(match op {
        Op::Value => literal(),
        Op::Assignment => format!("{} = {}", required(values, Slot::MemberName, op)?, literal()),
        Op::Parameter => match values.text(Slot::MemberName) {
            Some(name) => format!("{name}={}", literal()),
            None => literal(),
        },
        Op::OutputParameter => {
            let name = required(values, Slot::MemberName, op)?;
            format!("{name}={name}")
        }
        Op::OutputParameterDeclare => {
            let name = required(values, Slot::MemberName, op)?;
            let sql_type = values
                .field_type(Slot::MemberType)
                .map(|ft| dialect.sql_type(ft))
                .unwrap_or("sql_variant");
            format!("DECLARE {name} {sql_type}")
        }
        Op::OutputParameterSet => {
            format!("SET {} = {}", required(values, Slot::MemberName, op)?, literal())
        }
        Op::OutputParameterSelect => {
            let name = required(values, Slot::MemberName, op)?;
            format!("{name} AS {}", name.trim_start_matches('@'))
        }
        Op::Column => dialect.column_definition(values)?,
        Op::PrimaryKey => format!("PRIMARY KEY ({})", required(values, Slot::MemberName, op)?),
        Op::ForeignKey => format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            required(values, Slot::MemberName, op)?,
            required(values, Slot::ReferenceTable, op)?,
            required(values, Slot::ReferenceMember, op)?,
        ),
        Op::RenameTable => format!(
            "EXEC sp_rename '{}', '{}'",
            required(values, Slot::Table, op)?,
            required(values, Slot::NewName, op)?,
        ),
        Op::AddColumn => format!(
            "ALTER TABLE {} {} {}",
            required(values, Slot::Table, op)?,
            dialect.add_column_keyword(),
            dialect.column_definition(values)?,
        ),
        Op::DropColumn => format!(
            "ALTER TABLE {} DROP COLUMN {}",
            required(values, Slot::Table, op)?,
            required(values, Slot::MemberName, op)?,
        ),
        Op::AlterColumn => format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            required(values, Slot::Table, op)?,
            dialect.column_definition(values)?,
        ),
        other => {
            return Err(OrmError::unsupported(format!(
                "{other} has no value template in {}",
                dialect.kind()
            )));
        }
    })
}

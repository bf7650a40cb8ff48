use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::*;
use crate::parts::SlotValue;

fn column(name: &str, field_type: FieldType) -> ValueCollection {
    ValueCollection::new()
        .with_text(Slot::Table, "Warrior")
        .with_text(Slot::MemberName, name)
        .with(Slot::MemberType, SlotValue::Type(field_type))
}

#[test]
fn guid_literal_is_cast() {
    let guid = Value::Guid(Uuid::nil());
    let expected = "CAST('00000000-0000-0000-0000-000000000000' AS VARCHAR2(37))";
    assert_eq!(SqlServerDialect.quote_value(&guid), expected);
    assert_eq!(SqliteDialect.quote_value(&guid), expected);
    assert_eq!(SqlServerCeDialect.quote_value(&guid), expected);
}

#[test]
fn bool_literal_is_quoted_bit() {
    assert_eq!(SqlServerDialect.quote_value(&Value::Bool(true)), "'1'");
    assert_eq!(SqliteDialect.quote_value(&Value::Bool(false)), "'0'");
}

#[test]
fn midnight_datetime_renders_as_date() {
    let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let midnight = date.and_hms_opt(0, 0, 0).unwrap();
    assert_eq!(SqlServerDialect.quote_value(&Value::DateTime(midnight)), "'2020-01-01'");
    assert_eq!(SqlServerDialect.quote_value(&Value::Date(date)), "'2020-01-01'");

    let afternoon = date.and_hms_opt(14, 30, 5).unwrap();
    assert_eq!(
        SqlServerDialect.quote_value(&Value::DateTime(afternoon)),
        "'2020-01-01T14:30:05'"
    );
}

#[test]
fn long_numeric_literals_are_truncated() {
    let third = 1.0f64 / 3.0 / 1e7;
    let value = Value::Float(third);
    let text = third.to_string();
    assert!(text.len() > NUMERIC_LITERAL_MAX_LEN);
    assert_eq!(
        SqlServerDialect.quote_value(&value),
        format!("'{}'", &text[..NUMERIC_LITERAL_MAX_LEN])
    );

    assert_eq!(SqlServerDialect.quote_value(&Value::Float(1.5)), "'1.5'");
    let decimal: Decimal = "12345678901234.123456789".parse().unwrap();
    assert_eq!(
        SqlServerDialect.quote_value(&Value::Decimal(decimal)),
        "'12345678901234.12345'"
    );
}

#[test]
fn strings_escape_quotes() {
    assert_eq!(SqlServerDialect.quote_value(&Value::Text("O'Neil".into())), "'O''Neil'");
    assert_eq!(SqlServerDialect.quote_value(&Value::Null), "NULL");
    assert_eq!(SqlServerDialect.quote_value(&Value::Int(-4)), "-4");
}

#[test]
fn byte_literals_per_dialect() {
    let bytes = Value::Bytes(vec![0xDE, 0xAD]);
    assert_eq!(SqlServerDialect.quote_value(&bytes), "0xDEAD");
    assert_eq!(SqliteDialect.quote_value(&bytes), "X'DEAD'");
}

#[test]
fn identity_syntax() {
    let id = column("ID", FieldType::Int)
        .with_flag(Slot::Key, true)
        .with_flag(Slot::AutoIncrement, true);
    assert_eq!(
        SqlServerDialect.column_definition(&id).unwrap(),
        "ID int NOT NULL IDENTITY(1,1)"
    );
    assert_eq!(
        SqlServerCeDialect.column_definition(&id).unwrap(),
        "ID int NOT NULL IDENTITY(1,1)"
    );
    assert_eq!(
        SqliteDialect.column_definition(&id).unwrap(),
        "ID INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT"
    );
}

#[test]
fn sqlite_autoincrement_only_on_a_single_key() {
    let counter = column("Counter", FieldType::Int).with_flag(Slot::AutoIncrement, true);
    assert!(SqliteDialect.column_definition(&counter).unwrap_err().is_unsupported());
    assert_eq!(
        SqlServerDialect.column_definition(&counter).unwrap(),
        "Counter int NOT NULL IDENTITY(1,1)"
    );

    let composite = ValueCollection::new()
        .with_text(Slot::MemberName, "ID, Name")
        .with_flag(Slot::AutoIncrement, true);
    assert!(SqliteDialect
        .render_values(OperationType::PrimaryKey, &composite)
        .unwrap_err()
        .is_unsupported());
}

#[test]
fn nullable_and_overridden_types() {
    let name = column("Name", FieldType::Text).with_flag(Slot::Nullable, true);
    assert_eq!(
        SqlServerDialect.column_definition(&name).unwrap(),
        "Name varchar(max) NULL"
    );
    assert_eq!(SqliteDialect.column_definition(&name).unwrap(), "Name TEXT NULL");
    assert_eq!(
        SqlServerCeDialect.column_definition(&name).unwrap(),
        "Name nvarchar(4000) NULL"
    );

    let custom = name.with_text(Slot::MemberType, "varchar(50)");
    assert_eq!(
        SqlServerDialect.column_definition(&custom).unwrap(),
        "Name varchar(50) NULL"
    );
}

#[test]
fn add_column_keyword() {
    let race = column("Race", FieldType::Text).with_flag(Slot::Nullable, true);
    assert_eq!(
        SqlServerDialect
            .render_values(OperationType::AddColumn, &race)
            .unwrap(),
        "ALTER TABLE Warrior ADD Race varchar(max) NULL"
    );
    assert_eq!(
        SqliteDialect
            .render_values(OperationType::AddColumn, &race)
            .unwrap(),
        "ALTER TABLE Warrior ADD COLUMN Race TEXT NULL"
    );
}

#[test]
fn sqlite_cannot_drop_or_alter_columns() {
    assert!(SqliteDialect.rule(OperationType::DropColumn).is_none());
    assert!(SqliteDialect.rule(OperationType::AlterColumn).is_none());
    assert!(SqlServerDialect.rule(OperationType::DropColumn).is_some());
}

#[test]
fn rename_table() {
    let values = ValueCollection::new()
        .with_text(Slot::Table, "Warrior")
        .with_text(Slot::NewName, "Hero");
    assert_eq!(
        SqlServerDialect
            .render_values(OperationType::RenameTable, &values)
            .unwrap(),
        "EXEC sp_rename 'Warrior', 'Hero'"
    );
    assert_eq!(
        SqliteDialect
            .render_values(OperationType::RenameTable, &values)
            .unwrap(),
        "ALTER TABLE Warrior RENAME TO Hero"
    );
}

#[test]
fn foreign_key_template() {
    let values = ValueCollection::new()
        .with_text(Slot::MemberName, "WarriorID")
        .with_text(Slot::ReferenceTable, "Warrior")
        .with_text(Slot::ReferenceMember, "ID");
    assert_eq!(
        SqlServerDialect
            .render_values(OperationType::ForeignKey, &values)
            .unwrap(),
        "FOREIGN KEY (WarriorID) REFERENCES Warrior(ID)"
    );
}

#[test]
fn missing_slot_is_reported() {
    let err = SqlServerDialect
        .render_values(OperationType::ForeignKey, &ValueCollection::new())
        .unwrap_err();
    assert!(err.to_string().contains("MemberName"));
}

#[test]
fn dialect_kind_resolves_and_deserializes() {
    assert_eq!(DialectKind::Sqlite.dialect().kind(), DialectKind::Sqlite);
    let kind: DialectKind = serde_json::from_str("\"sql_server_ce\"").unwrap();
    assert_eq!(kind, DialectKind::SqlServerCe);
    assert_eq!(DialectKind::SqlServerCe.to_string(), "sql_server_ce");
}

#[test]
fn row_limit_placement() {
    assert_eq!(SqlServerDialect.row_limit(), RowLimit::Top);
    assert_eq!(SqliteDialect.row_limit(), RowLimit::Limit);
    assert_eq!(
        SqlServerCeDialect.rule(OperationType::Top).map(|r| (r.prefix, r.suffix)),
        Some(("TOP (", ")"))
    );
}

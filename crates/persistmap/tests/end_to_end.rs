#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use persistmap::{
    ContextSettings, DatabaseContext, DialectKind, Entity, FromRow, MockConnection, OrmError, Row,
    SqlServerDialect, SqliteDialect, Value,
};

#[derive(Debug, Clone, PartialEq, Entity, FromRow)]
struct Warrior {
    #[orm(key, auto, column = "ID")]
    id: i32,
    #[orm(column = "Name")]
    name: Option<String>,
    #[orm(column = "Race")]
    race: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Entity, FromRow)]
struct Armour {
    #[orm(key, auto, column = "ID")]
    id: i32,
    #[orm(column = "WarriorID")]
    warrior_id: i32,
    #[orm(column = "Name")]
    name: String,
}

#[derive(Debug, Clone, PartialEq, Entity, FromRow)]
#[orm(table = "Warrior")]
struct Person {
    #[orm(key, auto, column = "ID")]
    id: i32,
    #[orm(column = "Name")]
    name: Option<String>,
}

/// Warrior table seen through an embedded base entity.
#[derive(Debug, Clone, PartialEq, Entity, FromRow)]
#[orm(table = "Warrior")]
struct Hero {
    #[orm(base)]
    person: Person,
    #[orm(column = "Race")]
    race: Option<String>,
    #[orm(ignore)]
    selected: bool,
}

fn sqlserver() -> DatabaseContext<MockConnection> {
    DatabaseContext::new(MockConnection::new("Warriors"), Arc::new(SqlServerDialect))
}

fn olaf_row() -> Row {
    Row::new()
        .with("ID", 3)
        .with("Name", "Olaf")
        .with("Race", Value::Null)
}

#[test]
fn derived_metadata() {
    let names: Vec<_> = Warrior::fields().iter().map(|f| f.name).collect();
    assert_eq!(names, ["ID", "Name", "Race"]);
    assert_eq!(Warrior::entity_name(), "Warrior");
    assert_eq!(Armour::COL_WARRIOR_ID.name(), "WarriorID");

    let keys = Warrior::key_fields();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].auto_increment);
    assert!(Warrior::field("race").unwrap().nullable);
    assert!(!Armour::field("Name").unwrap().nullable);
}

#[test]
fn base_fields_come_first_and_ignored_fields_are_unmapped() {
    let names: Vec<_> = Hero::fields().iter().map(|f| f.name).collect();
    assert_eq!(names, ["ID", "Name", "Race"]);
    assert!(matches!(Hero::field("selected"), Err(OrmError::Mapping { .. })));

    let hero = Hero {
        person: Person {
            id: 3,
            name: Some("Olaf".into()),
        },
        race: Some("Elf".into()),
        selected: true,
    };
    let values = hero.values();
    assert_eq!(values[0], ("ID", Value::Int(3)));
    assert_eq!(values[2], ("Race", Value::Text("Elf".into())));
}

#[test]
fn join_query_against_mock_connection() {
    let conn = MockConnection::new("Warriors").with_result(vec![olaf_row()]);
    let mut ctx = DatabaseContext::new(conn, Arc::new(SqlServerDialect));

    let warriors = ctx
        .from::<Warrior>()
        .join::<Armour>(Armour::COL_WARRIOR_ID.eq(Warrior::COL_ID))
        .where_(Armour::COL_NAME.eq("Mail"))
        .order_by(Warrior::COL_NAME)
        .select()
        .unwrap();

    assert_eq!(
        ctx.connection().executed(),
        ["SELECT Warrior.ID, Warrior.Name, Warrior.Race FROM Warrior \
          INNER JOIN Armour ON Armour.WarriorID = Warrior.ID \
          WHERE Armour.Name = 'Mail' ORDER BY Warrior.Name"]
    );
    assert_eq!(warriors.len(), 1);
    assert_eq!(warriors[0].name.as_deref(), Some("Olaf"));
    assert_eq!(warriors[0].race, None);
}

#[test]
fn base_entity_reads_and_writes() {
    let conn = MockConnection::new("Warriors").with_result(vec![olaf_row()]);
    let mut ctx = DatabaseContext::new(conn, Arc::new(SqlServerDialect));

    let heroes = ctx.from::<Hero>().select().unwrap();
    assert_eq!(heroes[0].person.id, 3);
    assert!(!heroes[0].selected);

    ctx.insert(&heroes[0]).execute().unwrap();
    ctx.commit().unwrap();
    assert_eq!(
        ctx.connection().executed()[1],
        "INSERT INTO Warrior (Name, Race) VALUES ('Olaf', NULL)"
    );
}

#[test]
fn pending_commands_run_on_commit() {
    let mut ctx = sqlserver();
    let warrior = Warrior {
        id: 3,
        name: Some("Olaf".into()),
        race: Some("Elf".into()),
    };

    ctx.insert(&warrior).execute().unwrap();
    ctx.update(&warrior).execute().unwrap();
    ctx.delete_entity(&warrior).execute().unwrap();
    assert_eq!(ctx.pending().len(), 3);
    assert!(ctx.connection().executed().is_empty());

    ctx.commit().unwrap();
    assert!(ctx.pending().is_empty());
    assert_eq!(
        ctx.connection().executed(),
        [
            "INSERT INTO Warrior (Name, Race) VALUES ('Olaf', 'Elf')",
            "UPDATE Warrior SET Name = 'Olaf', Race = 'Elf' WHERE Warrior.ID = 3",
            "DELETE FROM Warrior WHERE Warrior.ID = 3",
        ]
    );
}

#[test]
fn procedure_output_round_trip() {
    let conn = MockConnection::new("Warriors").with_result(vec![
        olaf_row(),
        Row::new().with("count", 1),
    ]);
    let mut ctx = DatabaseContext::new(conn, Arc::new(SqlServerDialect));
    let count = Rc::new(Cell::new(0i32));
    let sink = Rc::clone(&count);

    let warriors: Vec<Warrior> = ctx
        .procedure("GetWarriors")
        .add_named_parameter("race", "Elf")
        .add_output_parameter("count", 0i32, move |v| sink.set(v))
        .execute_as()
        .unwrap();

    assert_eq!(warriors.len(), 1);
    assert_eq!(count.get(), 1);
    assert_eq!(
        ctx.connection().executed(),
        ["DECLARE @count int\nSET @count = 0\nEXEC GetWarriors @race='Elf', @count=@count OUTPUT\nSELECT @count AS count"]
    );
}

#[test]
fn execution_override_serves_results() {
    let mut ctx = sqlserver();
    ctx.interceptor::<Armour>().as_execute(|query| {
        assert!(query.sql().contains("FROM Armour"));
        vec![Armour {
            id: 1,
            warrior_id: 3,
            name: "Mail".into(),
        }]
    });

    let armour = ctx.from::<Armour>().first().unwrap();
    assert_eq!(armour.map(|a| a.name), Some("Mail".to_string()));
    assert!(ctx.connection().executed().is_empty());
}

#[test]
fn schema_script_from_settings() {
    let settings = ContextSettings::new()
        .with_dialect(DialectKind::Sqlite)
        .with_logger("tracing");
    let mut ctx = DatabaseContext::with_settings(MockConnection::new("main"), settings);

    ctx.database().table::<Warrior>().create().unwrap();
    ctx.database()
        .table::<Armour>()
        .foreign_key(Armour::COL_WARRIOR_ID, Warrior::COL_ID)
        .create()
        .unwrap();
    ctx.commit().unwrap();

    assert_eq!(
        ctx.connection().executed(),
        [
            "CREATE TABLE Warrior (ID INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT, \
             Name TEXT NULL, Race TEXT NULL)",
            "CREATE TABLE Armour (ID INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT, \
             WarriorID INTEGER NOT NULL, Name TEXT NOT NULL, \
             FOREIGN KEY (WarriorID) REFERENCES Warrior(ID))",
        ]
    );
}

#[test]
fn sqlite_rejects_sql_server_only_features() {
    let mut ctx = DatabaseContext::new(MockConnection::new("main"), Arc::new(SqliteDialect));

    let err = ctx
        .from::<Warrior>()
        .right_join::<Armour>(Armour::COL_WARRIOR_ID.eq(Warrior::COL_ID))
        .compile()
        .unwrap_err();
    assert!(err.is_unsupported());

    let err = ctx.procedure("GetWarriors").execute().unwrap_err();
    assert!(err.is_unsupported());
}

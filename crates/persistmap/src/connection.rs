//! The transport boundary.
//!
//! [`Connection`] is what a [`DatabaseContext`](crate::context::DatabaseContext)
//! executes compiled SQL against. It is synchronous: compilation and
//! execution both happen on the calling thread.

use std::collections::VecDeque;

use crate::error::{OrmError, OrmResult};
use crate::row::Row;

/// A database connection able to run SQL text.
pub trait Connection {
    /// Run a statement that returns rows.
    fn query(&mut self, sql: &str) -> OrmResult<Vec<Row>>;

    /// Run a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str) -> OrmResult<u64>;

    /// Name of the active catalog.
    fn database(&self) -> String;

    /// Switch the active catalog.
    fn set_database(&mut self, name: &str) -> OrmResult<()>;

    fn begin(&mut self) -> OrmResult<()> {
        self.execute("BEGIN TRANSACTION").map(drop)
    }

    fn commit(&mut self) -> OrmResult<()> {
        self.execute("COMMIT TRANSACTION").map(drop)
    }

    fn rollback(&mut self) -> OrmResult<()> {
        self.execute("ROLLBACK TRANSACTION").map(drop)
    }
}

impl<C: Connection + ?Sized> Connection for &mut C {
    fn query(&mut self, sql: &str) -> OrmResult<Vec<Row>> {
        (**self).query(sql)
    }

    fn execute(&mut self, sql: &str) -> OrmResult<u64> {
        (**self).execute(sql)
    }

    fn database(&self) -> String {
        (**self).database()
    }

    fn set_database(&mut self, name: &str) -> OrmResult<()> {
        (**self).set_database(name)
    }

    fn begin(&mut self) -> OrmResult<()> {
        (**self).begin()
    }

    fn commit(&mut self) -> OrmResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> OrmResult<()> {
        (**self).rollback()
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn query(&mut self, sql: &str) -> OrmResult<Vec<Row>> {
        (**self).query(sql)
    }

    fn execute(&mut self, sql: &str) -> OrmResult<u64> {
        (**self).execute(sql)
    }

    fn database(&self) -> String {
        (**self).database()
    }

    fn set_database(&mut self, name: &str) -> OrmResult<()> {
        (**self).set_database(name)
    }

    fn begin(&mut self) -> OrmResult<()> {
        (**self).begin()
    }

    fn commit(&mut self) -> OrmResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> OrmResult<()> {
        (**self).rollback()
    }
}

/// In-memory scripted connection for tests.
///
/// Records every statement, answers queries from a queue of result sets and
/// can be told to fail statements containing a pattern.
#[derive(Debug, Clone, Default)]
pub struct MockConnection {
    database: String,
    results: VecDeque<Vec<Row>>,
    affected: u64,
    fail_on: Option<String>,
    executed: Vec<String>,
    switches: Vec<String>,
}

impl MockConnection {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            affected: 1,
            ..Self::default()
        }
    }

    /// Queue a result set for the next `query`.
    pub fn with_result(mut self, rows: Vec<Row>) -> Self {
        self.results.push_back(rows);
        self
    }

    pub fn push_result(&mut self, rows: Vec<Row>) {
        self.results.push_back(rows);
    }

    /// Row count returned by `execute`.
    pub fn with_affected(mut self, affected: u64) -> Self {
        self.affected = affected;
        self
    }

    /// Fail every statement whose text contains `pattern`.
    pub fn fail_on(mut self, pattern: impl Into<String>) -> Self {
        self.fail_on = Some(pattern.into());
        self
    }

    /// Every statement run so far, transaction control included.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Catalogs switched to, in order.
    pub fn database_switches(&self) -> &[String] {
        &self.switches
    }

    fn run(&mut self, sql: &str) -> OrmResult<()> {
        self.executed.push(sql.to_string());
        match &self.fail_on {
            Some(pattern) if sql.contains(pattern.as_str()) => {
                Err(OrmError::execution(format!("statement failed: {sql}")))
            }
            _ => Ok(()),
        }
    }
}

impl Connection for MockConnection {
    fn query(&mut self, sql: &str) -> OrmResult<Vec<Row>> {
        self.run(sql)?;
        Ok(self.results.pop_front().unwrap_or_default())
    }

    fn execute(&mut self, sql: &str) -> OrmResult<u64> {
        self.run(sql)?;
        Ok(self.affected)
    }

    fn database(&self) -> String {
        self.database.clone()
    }

    fn set_database(&mut self, name: &str) -> OrmResult<()> {
        self.switches.push(name.to_string());
        self.database = name.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_answers_queries_in_order() {
        let mut conn = MockConnection::new("Warriors")
            .with_result(vec![Row::new().with("ID", 1)])
            .with_result(vec![]);
        assert_eq!(conn.query("SELECT 1").unwrap().len(), 1);
        assert!(conn.query("SELECT 2").unwrap().is_empty());
        assert!(conn.query("SELECT 3").unwrap().is_empty());
        assert_eq!(conn.executed(), ["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn mock_fails_on_pattern() {
        let mut conn = MockConnection::new("Warriors").fail_on("Armour");
        assert_eq!(conn.execute("DELETE FROM Warrior").unwrap(), 1);
        assert!(conn.execute("DELETE FROM Armour").unwrap_err().is_execution());
    }

    #[test]
    fn transaction_control_goes_through_execute() {
        let mut conn = MockConnection::new("Warriors");
        {
            let mut boxed: Box<dyn Connection + '_> = Box::new(&mut conn);
            boxed.begin().unwrap();
            boxed.rollback().unwrap();
        }
        assert_eq!(conn.executed(), ["BEGIN TRANSACTION", "ROLLBACK TRANSACTION"]);
    }
}

use super::TableBuilder;
use crate::connection::Connection;
use crate::context::{Command, DatabaseContext};
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::parts::{OperationType as Op, QueryPart, QueryPartsContainer};

/// Database-level DDL on the connection's active catalog.
///
/// `CREATE/DROP DATABASE` run from the dialect's system catalog: the enqueued
/// command switches there first and, after a create, back to the previous
/// catalog when [`restore_database`](crate::ContextSettings::restore_database)
/// is set.
pub struct DatabaseBuilder<'a, C> {
    ctx: &'a mut DatabaseContext<C>,
}

impl<'a, C: Connection> DatabaseBuilder<'a, C> {
    pub(crate) fn new(ctx: &'a mut DatabaseContext<C>) -> Self {
        Self { ctx }
    }

    /// `CREATE DATABASE <active catalog>`
    pub fn create(self) -> OrmResult<()> {
        self.enqueue(Op::CreateDatabase, true)
    }

    /// `DROP DATABASE <active catalog>`
    pub fn drop(self) -> OrmResult<()> {
        self.enqueue(Op::DropDatabase, false)
    }

    /// Table DDL for entity `T`.
    pub fn table<T: Entity>(self) -> TableBuilder<'a, C, T> {
        TableBuilder::new(self.ctx)
    }

    fn enqueue(self, op: Op, restore: bool) -> OrmResult<()> {
        let catalog = self.ctx.connection().database();
        let name = catalog.clone();
        let mut container = QueryPartsContainer::new();
        container.add(QueryPart::delegate(op, move || name.clone()));

        let query = self.ctx.prepare(None, &mut container)?;
        let system = self.ctx.dialect().system_database().map(str::to_string);
        let restore = (restore && system.is_some() && self.ctx.settings().restore_database)
            .then_some(catalog);

        tracing::debug!(
            target: "persistmap.commit",
            operation = %op,
            system = ?system,
            "database DDL enqueued"
        );
        self.ctx.push(Command::new(query, None).switching(system, restore));
        Ok(())
    }
}

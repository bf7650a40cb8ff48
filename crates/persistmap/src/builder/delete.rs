use std::any::TypeId;
use std::marker::PhantomData;

use super::{key_predicate, remember, Filter};
use crate::connection::Connection;
use crate::context::DatabaseContext;
use crate::entity::{Entity, EntityRef};
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::parts::{OperationType as Op, QueryPart, QueryPartsContainer};

/// DELETE builder.
///
/// Refuses to run without a predicate unless [`all`](Self::all) is called.
pub struct DeleteBuilder<'a, C, T> {
    ctx: &'a mut DatabaseContext<C>,
    filter: Filter,
    /// Why the default key predicate could not be built.
    missing_key: Option<OrmError>,
    all: bool,
    error: Option<OrmError>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, C: Connection, T: Entity> DeleteBuilder<'a, C, T> {
    pub(crate) fn new(ctx: &'a mut DatabaseContext<C>) -> Self {
        Self {
            ctx,
            filter: Filter::default(),
            missing_key: None,
            all: false,
            error: None,
            _marker: PhantomData,
        }
    }

    pub(crate) fn from_entity(ctx: &'a mut DatabaseContext<C>, entity: &T) -> Self {
        let mut builder = Self::new(ctx);
        match key_predicate(entity) {
            Ok(predicate) => builder.filter.set(predicate),
            Err(e) => builder.missing_key = Some(e),
        }
        builder
    }

    /// Replace the predicate.
    pub fn where_(mut self, predicate: Expr) -> Self {
        self.missing_key = None;
        self.filter.set(predicate);
        self
    }

    pub fn and(mut self, predicate: Expr) -> Self {
        let result = self.filter.push(Op::And, predicate);
        remember(&mut self.error, result);
        self
    }

    pub fn or(mut self, predicate: Expr) -> Self {
        let result = self.filter.push(Op::Or, predicate);
        remember(&mut self.error, result);
        self
    }

    /// Allow deleting every row.
    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    /// Compile and enqueue the statement.
    pub fn execute(self) -> OrmResult<()> {
        if let Some(error) = self.error.or(self.missing_key) {
            return Err(error);
        }
        if self.filter.is_empty() && !self.all {
            return Err(OrmError::validation(format!(
                "DELETE from {} requires a where clause; call all() to delete every row",
                T::entity_name()
            )));
        }

        let mut container = QueryPartsContainer::new();
        container.add(
            QueryPart::text(Op::Delete, T::entity_name()).with_entity(EntityRef::of::<T>()),
        );
        if let Some(predicate) = self.filter.into_part() {
            container.add(predicate);
        }
        self.ctx.enqueue(Some(TypeId::of::<T>()), container)
    }
}

use std::any::TypeId;
use std::marker::PhantomData;

use super::{key_predicate, listed, remember, Filter};
use crate::connection::Connection;
use crate::context::DatabaseContext;
use crate::entity::{Column, Entity, EntityRef};
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::parts::{OperationType as Op, QueryPart, QueryPartsContainer, Slot, SlotValue, ValueCollection};
use crate::value::{ToValue, Value};

/// UPDATE builder.
///
/// Built from an entity, every non-key field is assigned and the predicate
/// defaults to the entity's key. An explicit `where_` replaces that default.
pub struct UpdateBuilder<'a, C, T> {
    ctx: &'a mut DatabaseContext<C>,
    assignments: Vec<(&'static str, Value)>,
    ignored: Vec<&'static str>,
    filter: Filter,
    /// Why the default key predicate could not be built.
    missing_key: Option<OrmError>,
    all: bool,
    error: Option<OrmError>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, C: Connection, T: Entity> UpdateBuilder<'a, C, T> {
    pub(crate) fn new(ctx: &'a mut DatabaseContext<C>) -> Self {
        Self {
            ctx,
            assignments: Vec::new(),
            ignored: Vec::new(),
            filter: Filter::default(),
            missing_key: None,
            all: false,
            error: None,
            _marker: PhantomData,
        }
    }

    pub(crate) fn from_entity(ctx: &'a mut DatabaseContext<C>, entity: &T) -> Self {
        let mut builder = Self::new(ctx);
        let values = entity.values();
        for field in T::fields() {
            if field.key || field.auto_increment {
                continue;
            }
            if let Some((name, value)) = values
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(field.name))
            {
                builder.assignments.push((*name, value.clone()));
            }
        }
        match key_predicate(entity) {
            Ok(predicate) => builder.filter.set(predicate),
            Err(e) => builder.missing_key = Some(e),
        }
        builder
    }

    /// `SET column = value`; a later call for the same column wins.
    pub fn set<V: ToValue>(mut self, column: Column<T, V>, value: impl Into<V>) -> Self {
        match T::field(column.name()) {
            Ok(field) => {
                let value = value.into().to_value();
                match self
                    .assignments
                    .iter_mut()
                    .find(|(name, _)| name.eq_ignore_ascii_case(field.name))
                {
                    Some(existing) => existing.1 = value,
                    None => self.assignments.push((field.name, value)),
                }
            }
            Err(e) => remember(&mut self.error, Err(e)),
        }
        self
    }

    /// Leave a field out of the SET list.
    pub fn ignore<V>(mut self, column: Column<T, V>) -> Self {
        match T::field(column.name()) {
            Ok(field) => self.ignored.push(field.name),
            Err(e) => remember(&mut self.error, Err(e)),
        }
        self
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

    /// Allow updating every row.
    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    fn build(self) -> OrmResult<(&'a mut DatabaseContext<C>, QueryPartsContainer)> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let entity = EntityRef::of::<T>();

        let mut set = QueryPart::items(Op::Set, None);
        for (name, value) in &self.assignments {
            if listed(&self.ignored, name) {
                continue;
            }
            set = set.with_child(
                QueryPart::values(
                    Op::Assignment,
                    ValueCollection::new()
                        .with_text(Slot::MemberName, *name)
                        .with(Slot::Value, SlotValue::Literal(value.clone())),
                )
                .with_id(*name)
                .with_entity(entity),
            );
        }
        if set.children().is_none_or(|c| c.is_empty()) {
            return Err(OrmError::validation(format!(
                "UPDATE {} requires at least one SET field",
                T::entity_name()
            )));
        }
        if let Some(error) = self.missing_key {
            return Err(error);
        }
        if self.filter.is_empty() && !self.all {
            return Err(OrmError::validation(format!(
                "UPDATE {} requires a where clause; call all() to update every row",
                T::entity_name()
            )));
        }

        let mut container = QueryPartsContainer::new();
        container.add(QueryPart::text(Op::Update, T::entity_name()).with_entity(entity));
        container.add(set);
        if let Some(predicate) = self.filter.into_part() {
            container.add(predicate);
        }
        Ok((self.ctx, container))
    }

    /// Compile and enqueue the statement.
    pub fn execute(self) -> OrmResult<()> {
        let (ctx, container) = self.build()?;
        ctx.enqueue(Some(TypeId::of::<T>()), container)
    }
}

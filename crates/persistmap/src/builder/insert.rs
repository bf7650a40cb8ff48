use std::any::TypeId;
use std::marker::PhantomData;

use super::{listed, remember};
use crate::connection::Connection;
use crate::context::DatabaseContext;
use crate::entity::{Column, Entity, EntityRef};
use crate::error::{OrmError, OrmResult};
use crate::parts::{OperationType as Op, QueryPart, QueryPartsContainer, Slot, SlotValue, ValueCollection};
use crate::value::Value;

/// INSERT builder for one entity instance.
///
/// Auto-increment fields are left to the database.
pub struct InsertBuilder<'a, C, T> {
    ctx: &'a mut DatabaseContext<C>,
    values: Vec<(&'static str, Value)>,
    ignored: Vec<&'static str>,
    error: Option<OrmError>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, C: Connection, T: Entity> InsertBuilder<'a, C, T> {
    pub(crate) fn new(ctx: &'a mut DatabaseContext<C>, values: Vec<(&'static str, Value)>) -> Self {
        Self {
            ctx,
            values,
            ignored: Vec::new(),
            error: None,
            _marker: PhantomData,
        }
    }

    /// Leave a field out of the statement.
    pub fn ignore<V>(mut self, column: Column<T, V>) -> Self {
        match T::field(column.name()) {
            Ok(field) => self.ignored.push(field.name),
            Err(e) => remember(&mut self.error, Err(e)),
        }
        self
    }

    fn build(&self) -> OrmResult<QueryPartsContainer> {
        let entity = EntityRef::of::<T>();
        let mut members = QueryPart::items(Op::InsertMembers, None);
        let mut values = QueryPart::items(Op::InsertValues, None);

        let mut count = 0;
        for field in T::fields() {
            if field.auto_increment || listed(&self.ignored, field.name) {
                continue;
            }
            let value = self
                .values
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(field.name))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| OrmError::mapping(T::entity_name(), field.name))?;

            members = members.with_child(
                QueryPart::text(Op::Member, field.name)
                    .with_id(field.name)
                    .with_entity(entity),
            );
            values = values.with_child(
                QueryPart::values(
                    Op::Value,
                    ValueCollection::new()
                        .with_text(Slot::MemberName, field.name)
                        .with(Slot::Value, SlotValue::Literal(value)),
                )
                .with_id(field.name),
            );
            count += 1;
        }
        if count == 0 {
            return Err(OrmError::validation(format!(
                "INSERT into {} has no field to write",
                T::entity_name()
            )));
        }

        let mut container = QueryPartsContainer::new();
        container.add(QueryPart::text(Op::Insert, T::entity_name()).with_entity(entity));
        container.add(members);
        container.add(values);
        Ok(container)
    }

    /// Compile and enqueue the statement.
    pub fn execute(mut self) -> OrmResult<()> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        let container = self.build()?;
        self.ctx.enqueue(Some(TypeId::of::<T>()), container)
    }
}

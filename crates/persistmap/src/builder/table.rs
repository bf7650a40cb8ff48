use std::any::TypeId;
use std::marker::PhantomData;

use super::{listed, remember};
use crate::connection::Connection;
use crate::context::DatabaseContext;
use crate::entity::{Column, Entity, EntityRef, FieldDef};
use crate::error::{OrmError, OrmResult};
use crate::parts::{
    ItemsPart, OperationType as Op, PartContent, QueryPart, QueryPartsContainer, Slot, SlotValue,
    ValueCollection,
};

/// Per-column overrides of the entity's field metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOptions {
    nullable: Option<bool>,
    sql_type: Option<String>,
    auto_increment: Option<bool>,
}

impl ColumnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Raw SQL type, e.g. `varchar(50)`, replacing the dialect's mapping.
    pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = Some(auto_increment);
        self
    }
}

#[derive(Debug, Clone)]
struct ForeignKey {
    member: &'static str,
    table: &'static str,
    reference: &'static str,
}

/// Table DDL builder for entity `T`.
///
/// # Example
/// ```ignore
/// ctx.database()
///     .table::<Armour>()
///     .column(Armour::COL_NAME, ColumnOptions::new().sql_type("varchar(50)"))
///     .foreign_key(Armour::COL_WARRIOR_ID, Warrior::COL_ID)
///     .create()?;
/// ```
pub struct TableBuilder<'a, C, T> {
    ctx: &'a mut DatabaseContext<C>,
    keys: Vec<&'static str>,
    ignored: Vec<&'static str>,
    options: Vec<(&'static str, ColumnOptions)>,
    foreign_keys: Vec<ForeignKey>,
    alterations: Vec<(Op, &'static str)>,
    error: Option<OrmError>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, C: Connection, T: Entity> TableBuilder<'a, C, T> {
    pub(crate) fn new(ctx: &'a mut DatabaseContext<C>) -> Self {
        Self {
            ctx,
            keys: Vec::new(),
            ignored: Vec::new(),
            options: Vec::new(),
            foreign_keys: Vec::new(),
            alterations: Vec::new(),
            error: None,
            _marker: PhantomData,
        }
    }

    /// Declare a primary key column, replacing the entity's own key fields.
    pub fn key<V>(mut self, column: Column<T, V>) -> Self {
        match T::field(column.name()) {
            Ok(field) if !listed(&self.keys, field.name) => self.keys.push(field.name),
            Ok(_) => {}
            Err(e) => remember(&mut self.error, Err(e)),
        }
        self
    }

    /// Leave a field out of the table.
    pub fn ignore<V>(mut self, column: Column<T, V>) -> Self {
        match T::field(column.name()) {
            Ok(field) => self.ignored.push(field.name),
            Err(e) => remember(&mut self.error, Err(e)),
        }
        self
    }

    /// Override nullability, SQL type or identity of a column.
    ///
    /// Each column takes one declaration; a second one is a validation error.
    pub fn column<V>(mut self, column: Column<T, V>, options: ColumnOptions) -> Self {
        let result = T::field(column.name()).and_then(|field| {
            if self
                .options
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(field.name))
            {
                return Err(OrmError::validation(format!(
                    "column {} of {} is already declared",
                    field.name,
                    T::entity_name()
                )));
            }
            self.options.push((field.name, options));
            Ok(())
        });
        remember(&mut self.error, result);
        self
    }

    /// `FOREIGN KEY (column) REFERENCES R(reference)`
    pub fn foreign_key<R: Entity, V>(
        mut self,
        column: Column<T, V>,
        reference: Column<R, V>,
    ) -> Self {
        let result = T::field(column.name()).and_then(|member| {
            let referenced = R::field(reference.name())?;
            self.foreign_keys.push(ForeignKey {
                member: member.name,
                table: R::entity_name(),
                reference: referenced.name,
            });
            Ok(())
        });
        remember(&mut self.error, result);
        self
    }

    /// Add a column on [`alter`](Self::alter).
    pub fn add_field<V>(self, column: Column<T, V>) -> Self {
        self.alteration(Op::AddColumn, column.name())
    }

    /// Drop a column on [`alter`](Self::alter).
    pub fn drop_field<V>(self, column: Column<T, V>) -> Self {
        self.alteration(Op::DropColumn, column.name())
    }

    /// Redefine a column on [`alter`](Self::alter).
    pub fn alter_field<V>(self, column: Column<T, V>) -> Self {
        self.alteration(Op::AlterColumn, column.name())
    }

    fn alteration(mut self, op: Op, name: &str) -> Self {
        let result = T::field(name).and_then(|field| {
            if self
                .alterations
                .iter()
                .any(|(_, n)| n.eq_ignore_ascii_case(field.name))
            {
                return Err(OrmError::validation(format!(
                    "field {} of {} is already declared",
                    field.name,
                    T::entity_name()
                )));
            }
            self.alterations.push((op, field.name));
            Ok(())
        });
        remember(&mut self.error, result);
        self
    }

    fn take_error(&mut self) -> OrmResult<()> {
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn is_key(&self, field: &FieldDef) -> bool {
        if self.keys.is_empty() {
            field.key
        } else {
            listed(&self.keys, field.name)
        }
    }

    fn column_values(&self, field: &FieldDef, key: bool) -> ValueCollection {
        let options = self
            .options
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(field.name))
            .map(|(_, o)| o.clone())
            .unwrap_or_default();

        let values = ValueCollection::new()
            .with_text(Slot::Table, T::entity_name())
            .with_text(Slot::MemberName, field.name);
        let values = match options.sql_type {
            Some(sql_type) => values.with_text(Slot::MemberType, sql_type),
            None => values.with(Slot::MemberType, SlotValue::Type(field.field_type)),
        };
        values
            .with_flag(Slot::Nullable, options.nullable.unwrap_or(field.nullable))
            .with_flag(Slot::Key, key)
            .with_flag(
                Slot::AutoIncrement,
                options.auto_increment.unwrap_or(field.auto_increment),
            )
    }

    fn enqueue(self, part: QueryPart) -> OrmResult<()> {
        let mut container = QueryPartsContainer::new();
        container.add(part);
        self.ctx.enqueue(Some(TypeId::of::<T>()), container)
    }

    /// `CREATE TABLE T (columns, PRIMARY KEY (..), FOREIGN KEY ..)`
    pub fn create(mut self) -> OrmResult<()> {
        self.take_error()?;
        let entity = EntityRef::of::<T>();
        let mut body = QueryPartsContainer::new();
        let mut keys = Vec::new();
        let mut auto_key = false;

        for field in T::fields() {
            if listed(&self.ignored, field.name) {
                continue;
            }
            let key = self.is_key(&field);
            let values = self.column_values(&field, key);
            if key {
                keys.push(field.name);
                auto_key |= values.flag(Slot::AutoIncrement);
            }
            let part = QueryPart::values(Op::Column, values)
                .with_id(field.name)
                .with_entity(entity);
            if body.contains(Op::Column) {
                body.add_after(part, Op::Column);
            } else {
                body.add(part);
            }
        }
        if body.is_empty() {
            return Err(OrmError::validation(format!(
                "{} has no column to create",
                T::entity_name()
            )));
        }

        if !keys.is_empty() {
            body.add(QueryPart::values(
                Op::PrimaryKey,
                ValueCollection::new()
                    .with_text(Slot::Table, T::entity_name())
                    .with_text(Slot::MemberName, keys.join(", "))
                    .with_flag(Slot::AutoIncrement, auto_key),
            ));
        }
        for fk in &self.foreign_keys {
            body.add(QueryPart::values(
                Op::ForeignKey,
                ValueCollection::new()
                    .with_text(Slot::MemberName, fk.member)
                    .with_text(Slot::ReferenceTable, fk.table)
                    .with_text(Slot::ReferenceMember, fk.reference),
            ));
        }

        let table = QueryPart::new(
            Op::CreateTable,
            PartContent::Items(ItemsPart {
                head: Some(T::entity_name().to_string()),
                children: body,
            }),
        )
        .with_entity(entity);
        self.enqueue(table)
    }

    /// `DROP TABLE T`
    pub fn drop(mut self) -> OrmResult<()> {
        self.take_error()?;
        let part = QueryPart::text(Op::DropTable, T::entity_name())
            .with_entity(EntityRef::of::<T>());
        self.enqueue(part)
    }

    /// Rename the table to the table name of `U`.
    pub fn rename_to<U: Entity>(self) -> OrmResult<()> {
        self.rename_to_name(U::entity_name())
    }

    pub fn rename_to_name(mut self, name: &str) -> OrmResult<()> {
        self.take_error()?;
        let part = QueryPart::values(
            Op::RenameTable,
            ValueCollection::new()
                .with_text(Slot::Table, T::entity_name())
                .with_text(Slot::NewName, name),
        )
        .with_entity(EntityRef::of::<T>());
        self.enqueue(part)
    }

    /// Apply the declared `add_field`/`drop_field`/`alter_field` changes.
    pub fn alter(mut self) -> OrmResult<()> {
        self.take_error()?;
        if self.alterations.is_empty() {
            return Err(OrmError::validation(format!(
                "ALTER TABLE {} has no change",
                T::entity_name()
            )));
        }

        let entity = EntityRef::of::<T>();
        let mut changes = QueryPartsContainer::new();
        for (op, name) in &self.alterations {
            let field = T::field(name)?;
            let values = match op {
                Op::DropColumn => ValueCollection::new()
                    .with_text(Slot::Table, T::entity_name())
                    .with_text(Slot::MemberName, field.name),
                _ => self.column_values(&field, false),
            };
            changes.add(
                QueryPart::values(*op, values)
                    .with_id(field.name)
                    .with_entity(entity),
            );
        }

        let alter = QueryPart::new(
            Op::AlterTable,
            PartContent::Items(ItemsPart {
                head: None,
                children: changes,
            }),
        )
        .with_entity(entity);
        self.enqueue(alter)
    }
}

//! Entity metadata: the field map of a mapped type and typed column descriptors.
//!
//! An [`Entity`] enumerates its mapped fields once, already flattened: fields of
//! a base entity (declared with `#[orm(base)]` in the derive) come first and a
//! field redeclared by the derived type replaces the base declaration in place.
//!
//! ```ignore
//! use persistmap::Entity;
//!
//! #[derive(Entity, FromRow)]
//! struct Warrior {
//!     #[orm(key, auto, column = "ID")]
//!     id: i32,
//!     #[orm(column = "Name")]
//!     name: String,
//! }
//!
//! // Generated: Warrior::COL_ID: Column<Warrior, i32>, Warrior::COL_NAME, ...
//! let pred = Warrior::COL_ID.eq(5);
//! ```

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

use crate::error::{OrmError, OrmResult};
use crate::value::{FieldType, Value};

/// Metadata of one mapped field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Column (member) name.
    pub name: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
    pub key: bool,
    pub auto_increment: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name,
            field_type,
            nullable,
            key: false,
            auto_increment: false,
        }
    }

    pub const fn key(mut self) -> Self {
        self.key = true;
        self
    }

    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

/// A type mapped to a table.
///
/// Usually derived with `#[derive(Entity)]`.
pub trait Entity: 'static {
    /// Table name.
    fn entity_name() -> &'static str;

    /// All mapped fields, base fields first.
    fn fields() -> Vec<FieldDef>;

    /// Current values of all mapped fields, in [`Entity::fields`] order.
    fn values(&self) -> Vec<(&'static str, Value)>;

    /// Look up a mapped field by name (case-insensitive).
    fn field(name: &str) -> OrmResult<FieldDef> {
        Self::fields()
            .into_iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| OrmError::mapping(Self::entity_name(), name))
    }

    /// Key fields.
    fn key_fields() -> Vec<FieldDef> {
        Self::fields().into_iter().filter(|f| f.key).collect()
    }
}

/// Merge base-entity fields with the fields a derived entity declares.
///
/// A derived field with the same name as a base field replaces it at the
/// base field's position; new fields are appended.
pub fn merge_fields(base: Vec<FieldDef>, own: Vec<FieldDef>) -> Vec<FieldDef> {
    let mut merged = base;
    for field in own {
        match merged
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(field.name))
        {
            Some(existing) => *existing = field,
            None => merged.push(field),
        }
    }
    merged
}

/// Same merging rule as [`merge_fields`], for entity values.
pub fn merge_values(
    base: Vec<(&'static str, Value)>,
    own: Vec<(&'static str, Value)>,
) -> Vec<(&'static str, Value)> {
    let mut merged = base;
    for (name, value) in own {
        match merged
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.1 = value,
            None => merged.push((name, value)),
        }
    }
    merged
}

/// Runtime identity of an entity type.
#[derive(Clone, Copy)]
pub struct EntityRef {
    type_id: TypeId,
    name: &'static str,
    fields: fn() -> Vec<FieldDef>,
}

impl EntityRef {
    pub fn of<E: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            name: E::entity_name(),
            fields: E::fields,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> Vec<FieldDef> {
        (self.fields)()
    }

    /// Look up a mapped field by name, raising a mapping error when absent.
    pub fn field(&self, name: &str) -> OrmResult<FieldDef> {
        self.fields()
            .into_iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| OrmError::mapping(self.name, name))
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EntityRef {}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRef").field(&self.name).finish()
    }
}

/// Untyped column reference: owning entity + member name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef {
    pub entity: EntityRef,
    pub name: &'static str,
}

/// Typed column descriptor: a member `name` of entity `E` holding values of type `V`.
///
/// Generated as associated constants (`COL_*`) by `#[derive(Entity)]`.
pub struct Column<E, V> {
    name: &'static str,
    _marker: PhantomData<fn() -> (E, V)>,
}

impl<E, V> Column<E, V> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<E: Entity, V> Column<E, V> {
    pub fn column_ref(&self) -> ColumnRef {
        ColumnRef {
            entity: EntityRef::of::<E>(),
            name: self.name,
        }
    }

    /// Re-target the column to another entity that shares the member, e.g. a
    /// base-entity column used on a derived entity.
    pub fn on<E2: Entity>(&self) -> Column<E2, V> {
        Column::new(self.name)
    }
}

impl<E, V> Clone for Column<E, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, V> Copy for Column<E, V> {}

impl<E, V> fmt::Debug for Column<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column").field(&self.name).finish()
    }
}

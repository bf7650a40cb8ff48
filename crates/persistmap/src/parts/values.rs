//! Named-slot value collections backing DDL and parameter parts.

use std::fmt;

use crate::value::{FieldType, Value};

/// Slot names of a [`ValueCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Table,
    MemberName,
    MemberType,
    Nullable,
    Key,
    AutoIncrement,
    Value,
    ReferenceTable,
    ReferenceMember,
    NewName,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Content of one slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Text(String),
    Flag(bool),
    Type(FieldType),
    Literal(Value),
}

/// Ordered mapping of [`Slot`]s to free-form values.
///
/// The final text is produced by the dialect from these slots, so the same
/// collection renders as `Name varchar(max) NULL` on SQL Server and
/// `Name TEXT NULL` on SQLite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueCollection {
    slots: Vec<(Slot, SlotValue)>,
}

impl ValueCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a slot, replacing a previous value.
    pub fn set(&mut self, slot: Slot, value: SlotValue) {
        match self.slots.iter_mut().find(|(s, _)| *s == slot) {
            Some(existing) => existing.1 = value,
            None => self.slots.push((slot, value)),
        }
    }

    pub fn with(mut self, slot: Slot, value: SlotValue) -> Self {
        self.set(slot, value);
        self
    }

    pub fn with_text(self, slot: Slot, text: impl Into<String>) -> Self {
        self.with(slot, SlotValue::Text(text.into()))
    }

    pub fn with_flag(self, slot: Slot, flag: bool) -> Self {
        self.with(slot, SlotValue::Flag(flag))
    }

    pub fn get(&self, slot: Slot) -> Option<&SlotValue> {
        self.slots.iter().find(|(s, _)| *s == slot).map(|(_, v)| v)
    }

    pub fn text(&self, slot: Slot) -> Option<&str> {
        match self.get(slot) {
            Some(SlotValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Flag slots default to `false` when absent.
    pub fn flag(&self, slot: Slot) -> bool {
        matches!(self.get(slot), Some(SlotValue::Flag(true)))
    }

    pub fn literal(&self, slot: Slot) -> Option<&Value> {
        match self.get(slot) {
            Some(SlotValue::Literal(v)) => Some(v),
            _ => None,
        }
    }

    pub fn field_type(&self, slot: Slot) -> Option<FieldType> {
        match self.get(slot) {
            Some(SlotValue::Type(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Slot, SlotValue)> {
        self.slots.iter()
    }
}

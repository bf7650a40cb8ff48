use crate::error::{OrmError, OrmResult};
use crate::translate::AliasMap;

use super::{OperationType, QueryPart};

/// Ordered parts of exactly one statement.
///
/// Parts render in insertion order. The only ways to place a part elsewhere
/// are [`add_before`](Self::add_before), [`add_after`](Self::add_after) and
/// [`add_to_last`](Self::add_to_last).
#[derive(Debug, Clone, Default)]
pub struct QueryPartsContainer {
    parts: Vec<QueryPart>,
}

impl QueryPartsContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the end.
    pub fn add(&mut self, part: QueryPart) {
        self.parts.push(part);
    }

    /// Insert before the first part tagged `marker`; append if there is none.
    pub fn add_before(&mut self, part: QueryPart, marker: OperationType) {
        match self.parts.iter().position(|p| p.operation() == marker) {
            Some(idx) => self.parts.insert(idx, part),
            None => self.parts.push(part),
        }
    }

    /// Insert after the last part tagged `marker`; append if there is none.
    pub fn add_after(&mut self, part: QueryPart, marker: OperationType) {
        match self.parts.iter().rposition(|p| p.operation() == marker) {
            Some(idx) => self.parts.insert(idx + 1, part),
            None => self.parts.push(part),
        }
    }

    /// Append `part` as a child of the last part whose tag satisfies `predicate`.
    ///
    /// Fails when no such part exists or when it has no child sequence.
    pub fn add_to_last(
        &mut self,
        part: QueryPart,
        predicate: impl Fn(OperationType) -> bool,
    ) -> OrmResult<()> {
        let op = part.operation();
        let target = self
            .parts
            .iter_mut()
            .rev()
            .find(|p| predicate(p.operation()))
            .ok_or_else(|| OrmError::validation(format!("no clause to attach {op} to")))?;
        let target_op = target.operation();
        let children = target.children_mut().ok_or_else(|| {
            OrmError::validation(format!("{target_op} part cannot hold {op} children"))
        })?;
        children.add(part);
        Ok(())
    }

    /// Requalify every part with `aliases`; see [`QueryPart::set_aliases`].
    pub fn set_aliases(&mut self, aliases: &AliasMap) {
        for part in &mut self.parts {
            part.set_aliases(aliases);
        }
    }

    pub fn contains(&self, op: OperationType) -> bool {
        self.parts.iter().any(|p| p.operation() == op)
    }

    pub fn last(&self, op: OperationType) -> Option<&QueryPart> {
        self.parts.iter().rev().find(|p| p.operation() == op)
    }

    pub fn last_mut(&mut self, op: OperationType) -> Option<&mut QueryPart> {
        self.parts.iter_mut().rev().find(|p| p.operation() == op)
    }

    /// Parts tagged `op`, in order.
    pub fn of(&self, op: OperationType) -> impl Iterator<Item = &QueryPart> {
        self.parts.iter().filter(move |p| p.operation() == op)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryPart> {
        self.parts.iter()
    }

    pub fn parts(&self) -> &[QueryPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl<'a> IntoIterator for &'a QueryPartsContainer {
    type Item = &'a QueryPart;
    type IntoIter = std::slice::Iter<'a, QueryPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

//! Fluent statement builders.
//!
//! Every builder borrows the [`DatabaseContext`](crate::context::DatabaseContext)
//! mutably, appends query parts as methods are called and finishes with one
//! terminal call that either runs the statement (selects) or enqueues it.
//!
//! ## Design
//!
//! - Parts are placed by tag, so clauses may be declared in any order.
//! - Misuse (an unknown member, `and` before `where`) is remembered and
//!   reported by the terminal call.
//! - Safe defaults: DELETE and UPDATE require WHERE (unless `all()` is
//!   called); UPDATE requires SET.

pub mod database;
pub mod delete;
pub mod insert;
pub mod procedure;
pub mod select;
pub mod table;
pub mod update;

pub use database::DatabaseBuilder;
pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use procedure::ProcedureBuilder;
pub use select::SelectBuilder;
pub use table::{ColumnOptions, TableBuilder};
pub use update::UpdateBuilder;


use crate::entity::{ColumnRef, Entity, EntityRef};
use crate::error::{OrmError, OrmResult};
use crate::expr::{CompareOp, Expr};
use crate::parts::{OperationType, QueryPart, QueryPartsContainer};
use crate::translate::AliasMap;

/// Keep the first error raised while declaring a statement.
pub(crate) fn remember(slot: &mut Option<OrmError>, result: OrmResult<()>) {
    if let Err(e) = result {
        slot.get_or_insert(e);
    }
}

/// Insert `part` before the earliest present marker, else append.
pub(crate) fn place_before(
    container: &mut QueryPartsContainer,
    part: QueryPart,
    markers: &[OperationType],
) {
    let first = container
        .iter()
        .map(QueryPart::operation)
        .find(|op| markers.contains(op));
    match first {
        Some(marker) => container.add_before(part, marker),
        None => container.add(part),
    }
}

/// A clause part (`WHERE`, `JOIN`) owning `expr` as its first predicate.
pub(crate) fn clause(
    op: OperationType,
    head: Option<String>,
    expr: Expr,
    aliases: &AliasMap,
) -> QueryPart {
    QueryPart::items(op, head).with_child(QueryPart::expression(
        OperationType::Predicate,
        expr,
        aliases.clone(),
    ))
}

/// Chain `expr` onto the last `WHERE`/`JOIN` clause with `AND`/`OR`.
pub(crate) fn chain(
    container: &mut QueryPartsContainer,
    op: OperationType,
    expr: Expr,
    aliases: &AliasMap,
) -> OrmResult<()> {
    container.add_to_last(
        QueryPart::expression(op, expr, aliases.clone()),
        OperationType::is_predicate_clause,
    )
}

/// Predicate chain of a mutation, in declaration order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Filter {
    clauses: Vec<(OperationType, Expr)>,
}

impl Filter {
    pub(crate) fn set(&mut self, expr: Expr) {
        self.clauses = vec![(OperationType::Predicate, expr)];
    }

    pub(crate) fn push(&mut self, op: OperationType, expr: Expr) -> OrmResult<()> {
        if self.clauses.is_empty() {
            return Err(OrmError::validation(format!("{op} requires a preceding where")));
        }
        self.clauses.push((op, expr));
        Ok(())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// `WHERE` part holding the chain; `None` when empty.
    pub(crate) fn into_part(self) -> Option<QueryPart> {
        if self.clauses.is_empty() {
            return None;
        }
        let aliases = AliasMap::new();
        let mut part = QueryPart::items(OperationType::Where, None);
        if let Some(children) = part.children_mut() {
            for (op, expr) in self.clauses {
                children.add(QueryPart::expression(op, expr, aliases.clone()));
            }
        }
        Some(part)
    }
}

/// `key1 = v1 AND key2 = v2` for the key fields of `entity`.
pub(crate) fn key_predicate<T: Entity>(entity: &T) -> OrmResult<Expr> {
    let keys = T::key_fields();
    if keys.is_empty() {
        return Err(OrmError::validation(format!(
            "{} has no key field to identify the row by",
            T::entity_name()
        )));
    }
    let values = entity.values();
    let entity_ref = EntityRef::of::<T>();
    let mut predicates = keys
        .into_iter()
        .map(|key| {
            let value = values
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key.name))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| OrmError::mapping(T::entity_name(), key.name))?;
            let column = Expr::Column(ColumnRef {
                entity: entity_ref,
                name: key.name,
            });
            Ok(Expr::compare(CompareOp::Eq, column, Expr::Literal(value)))
        })
        .collect::<OrmResult<Vec<_>>>()?;
    Ok(if predicates.len() == 1 {
        predicates.remove(0)
    } else {
        Expr::all(predicates)
    })
}

/// Whether `name` is in `list`, ignoring ASCII case.
pub(crate) fn listed(list: &[&str], name: &str) -> bool {
    list.iter().any(|n| n.eq_ignore_ascii_case(name))
}

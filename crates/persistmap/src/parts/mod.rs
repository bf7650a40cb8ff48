//! The query part model: the intermediate representation of one statement.
//!
//! A statement under construction is a [`QueryPartsContainer`] holding
//! [`QueryPart`]s in textual order. Every part carries an [`OperationType`]
//! tag; the compiler dispatches on that tag only and never inspects which
//! [`PartContent`] variant produced the text.

mod container;
mod values;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use crate::entity::EntityRef;
use crate::expr::Expr;
use crate::translate::AliasMap;

pub use container::QueryPartsContainer;
pub use values::{Slot, SlotValue, ValueCollection};

/// Tag of a query part; decides its position, its siblings and its rendering rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    // SELECT
    Select,
    Distinct,
    Top,
    Field,
    From,
    Join,
    LeftJoin,
    RightJoin,
    FullJoin,
    Where,
    /// First predicate of a Join/Where clause.
    Predicate,
    And,
    Or,
    OrderBy,
    OrderByDesc,
    ThenBy,
    ThenByDesc,
    GroupBy,
    ThenGroupBy,
    Limit,

    // INSERT / UPDATE / DELETE
    Insert,
    InsertMembers,
    InsertValues,
    Member,
    Value,
    Update,
    Set,
    Assignment,
    Delete,

    // EXEC
    Procedure,
    Parameter,
    OutputParameter,
    OutputParameterDeclare,
    OutputParameterSet,
    OutputParameterSelect,

    // DDL
    CreateDatabase,
    DropDatabase,
    CreateTable,
    Column,
    PrimaryKey,
    ForeignKey,
    DropTable,
    RenameTable,
    AlterTable,
    AddColumn,
    DropColumn,
    AlterColumn,

    /// Text emitted as is.
    Raw,
}

impl OperationType {
    /// Tags that own a folded predicate chain (`AddToLast` targets).
    pub fn is_predicate_clause(self) -> bool {
        matches!(
            self,
            Self::Join | Self::LeftJoin | Self::RightJoin | Self::FullJoin | Self::Where
        )
    }

    pub fn is_join(self) -> bool {
        matches!(
            self,
            Self::Join | Self::LeftJoin | Self::RightJoin | Self::FullJoin
        )
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A qualified column reference in a projection.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPart {
    pub entity: EntityRef,
    pub member: String,
    /// Table qualifier: alias if one was given, else the table name.
    pub qualifier: String,
    /// Output name (`AS ...`), when it differs from the member.
    pub alias: Option<String>,
}

impl FieldPart {
    pub fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{}.{} AS {}", self.qualifier, self.member, alias),
            None => format!("{}.{}", self.qualifier, self.member),
        }
    }
}

/// A typed predicate plus the aliases used to qualify its column references.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionPart {
    pub expr: Expr,
    pub aliases: AliasMap,
}

/// Text computed lazily at compile time.
///
/// Must be pure: switching the active catalog is a separate queued command,
/// never a side effect of rendering.
#[derive(Clone)]
pub struct DelegatePart(Arc<dyn Fn() -> String + Send + Sync>);

impl DelegatePart {
    pub fn new(f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn render(&self) -> String {
        (self.0)()
    }
}

impl fmt::Debug for DelegatePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DelegatePart(..)")
    }
}

/// A part with its own child sequence, e.g. a `CREATE TABLE` body or a `WHERE` chain.
#[derive(Debug, Clone, Default)]
pub struct ItemsPart {
    /// Text rendered before the children (e.g. the table name).
    pub head: Option<String>,
    pub children: QueryPartsContainer,
}

/// How a part produces its own text.
#[derive(Debug, Clone)]
pub enum PartContent {
    Text(String),
    Field(FieldPart),
    Expression(ExpressionPart),
    Delegate(DelegatePart),
    Values(ValueCollection),
    Items(ItemsPart),
}

/// One fragment of a statement.
#[derive(Debug, Clone)]
pub struct QueryPart {
    operation: OperationType,
    id: Option<String>,
    entity: Option<EntityRef>,
    content: PartContent,
}

impl QueryPart {
    pub fn new(operation: OperationType, content: PartContent) -> Self {
        Self {
            operation,
            id: None,
            entity: None,
            content,
        }
    }

    pub fn text(operation: OperationType, text: impl Into<String>) -> Self {
        Self::new(operation, PartContent::Text(text.into()))
    }

    pub fn field(operation: OperationType, field: FieldPart) -> Self {
        let entity = field.entity;
        let id = field.member.clone();
        Self::new(operation, PartContent::Field(field))
            .with_entity(entity)
            .with_id(id)
    }

    pub fn expression(operation: OperationType, expr: Expr, aliases: AliasMap) -> Self {
        Self::new(
            operation,
            PartContent::Expression(ExpressionPart { expr, aliases }),
        )
    }

    pub fn delegate(
        operation: OperationType,
        f: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        Self::new(operation, PartContent::Delegate(DelegatePart::new(f)))
    }

    pub fn values(operation: OperationType, values: ValueCollection) -> Self {
        Self::new(operation, PartContent::Values(values))
    }

    pub fn items(operation: OperationType, head: Option<String>) -> Self {
        Self::new(
            operation,
            PartContent::Items(ItemsPart {
                head,
                children: QueryPartsContainer::new(),
            }),
        )
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_entity(mut self, entity: EntityRef) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Append a child; only meaningful for items parts.
    pub fn with_child(mut self, child: QueryPart) -> Self {
        if let Some(children) = self.children_mut() {
            children.add(child);
        }
        self
    }

    pub fn operation(&self) -> OperationType {
        self.operation
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn entity(&self) -> Option<&EntityRef> {
        self.entity.as_ref()
    }

    pub fn content(&self) -> &PartContent {
        &self.content
    }

    pub fn children(&self) -> Option<&QueryPartsContainer> {
        match &self.content {
            PartContent::Items(items) => Some(&items.children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut QueryPartsContainer> {
        match &mut self.content {
            PartContent::Items(items) => Some(&mut items.children),
            _ => None,
        }
    }

    /// Requalify this part and its children with `aliases`.
    ///
    /// Expression parts take the whole map; field parts take their entity's
    /// qualifier.
    pub fn set_aliases(&mut self, aliases: &AliasMap) {
        match &mut self.content {
            PartContent::Expression(e) => e.aliases = aliases.clone(),
            PartContent::Field(field) => {
                field.qualifier = aliases.qualifier(&field.entity).to_string();
            }
            PartContent::Items(items) => items.children.set_aliases(aliases),
            PartContent::Text(_) | PartContent::Delegate(_) | PartContent::Values(_) => {}
        }
    }

    pub fn values_mut(&mut self) -> Option<&mut ValueCollection> {
        match &mut self.content {
            PartContent::Values(values) => Some(values),
            _ => None,
        }
    }
}

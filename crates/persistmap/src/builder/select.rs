use std::any::TypeId;
use std::marker::PhantomData;

use super::{chain, clause, listed, place_before, remember};
use crate::compiler::CompiledQuery;
use crate::connection::Connection;
use crate::context::DatabaseContext;
use crate::dialect::RowLimit;
use crate::entity::{Column, ColumnRef, Entity, EntityRef};
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::parts::{FieldPart, OperationType as Op, QueryPart, QueryPartsContainer};
use crate::row::FromRow;
use crate::translate::AliasMap;

const ORDERING: [Op; 6] = [
    Op::GroupBy,
    Op::ThenGroupBy,
    Op::OrderBy,
    Op::OrderByDesc,
    Op::ThenBy,
    Op::ThenByDesc,
];

const AFTER_JOINS: [Op; 7] = [
    Op::Where,
    Op::GroupBy,
    Op::ThenGroupBy,
    Op::OrderBy,
    Op::OrderByDesc,
    Op::ThenBy,
    Op::ThenByDesc,
];

/// An output field taken from a specific source column.
#[derive(Debug, Clone)]
struct Mapping {
    source: ColumnRef,
    output: String,
}

/// SELECT builder rooted at entity `T`, producing rows of `O`.
///
/// # Example
/// ```ignore
/// let warriors: Vec<Warrior> = ctx
///     .from::<Warrior>()
///     .join::<Armour>(Armour::COL_WARRIOR_ID.eq(Warrior::COL_ID))
///     .where_(Armour::COL_NAME.starts_with("Chain"))
///     .order_by(Warrior::COL_NAME)
///     .select()?;
/// ```
pub struct SelectBuilder<'a, C, T, O = T> {
    ctx: &'a mut DatabaseContext<C>,
    container: QueryPartsContainer,
    aliases: AliasMap,
    /// Root entity first, then joined entities in join order.
    sources: Vec<EntityRef>,
    mappings: Vec<Mapping>,
    ignored: Vec<&'static str>,
    distinct: bool,
    limit: Option<u64>,
    error: Option<OrmError>,
    _marker: PhantomData<fn() -> (T, O)>,
}

impl<'a, C: Connection, T: Entity> SelectBuilder<'a, C, T> {
    pub(crate) fn new(ctx: &'a mut DatabaseContext<C>, alias: Option<String>) -> Self {
        let root = EntityRef::of::<T>();
        let mut aliases = AliasMap::new();
        let table = match alias {
            Some(alias) => {
                let table = format!("{} {alias}", root.name());
                aliases.insert(&root, alias);
                table
            }
            None => root.name().to_string(),
        };

        let mut container = QueryPartsContainer::new();
        container.add(QueryPart::text(Op::Select, ""));
        container.add(QueryPart::text(Op::From, table).with_entity(root));

        Self {
            ctx,
            container,
            aliases,
            sources: vec![root],
            mappings: Vec::new(),
            ignored: Vec::new(),
            distinct: false,
            limit: None,
            error: None,
            _marker: PhantomData,
        }
    }
}

impl<'a, C: Connection, T: Entity, O: Entity> SelectBuilder<'a, C, T, O> {
    /// `INNER JOIN J ON predicate`
    pub fn join<J: Entity>(self, on: Expr) -> Self {
        self.add_join::<J>(Op::Join, None, on)
    }

    /// `INNER JOIN J alias ON predicate`
    pub fn join_as<J: Entity>(self, alias: impl Into<String>, on: Expr) -> Self {
        self.add_join::<J>(Op::Join, Some(alias.into()), on)
    }

    pub fn left_join<J: Entity>(self, on: Expr) -> Self {
        self.add_join::<J>(Op::LeftJoin, None, on)
    }

    pub fn left_join_as<J: Entity>(self, alias: impl Into<String>, on: Expr) -> Self {
        self.add_join::<J>(Op::LeftJoin, Some(alias.into()), on)
    }

    pub fn right_join<J: Entity>(self, on: Expr) -> Self {
        self.add_join::<J>(Op::RightJoin, None, on)
    }

    pub fn full_join<J: Entity>(self, on: Expr) -> Self {
        self.add_join::<J>(Op::FullJoin, None, on)
    }

    fn add_join<J: Entity>(mut self, op: Op, alias: Option<String>, on: Expr) -> Self {
        if !self.container.contains(Op::From) {
            remember(
                &mut self.error,
                Err(OrmError::validation(format!("{op} requires a FROM clause"))),
            );
            return self;
        }

        let entity = EntityRef::of::<J>();
        let head = match alias {
            Some(alias) => {
                let head = format!("{} {alias}", entity.name());
                self.aliases.insert(&entity, alias);
                head
            }
            None => entity.name().to_string(),
        };
        if !self.sources.contains(&entity) {
            self.sources.push(entity);
        }

        let part = clause(op, Some(head), on, &self.aliases).with_entity(entity);
        place_before(&mut self.container, part, &AFTER_JOINS);
        self
    }

    /// `WHERE predicate`; a second call chains with `AND`.
    pub fn where_(mut self, predicate: Expr) -> Self {
        if self.container.contains(Op::Where) {
            let result = chain(&mut self.container, Op::And, predicate, &self.aliases);
            remember(&mut self.error, result);
        } else {
            let part = clause(Op::Where, None, predicate, &self.aliases);
            place_before(&mut self.container, part, &ORDERING);
        }
        self
    }

    /// `AND predicate` on the last join or where clause.
    pub fn and(mut self, predicate: Expr) -> Self {
        let result = chain(&mut self.container, Op::And, predicate, &self.aliases);
        remember(&mut self.error, result);
        self
    }

    /// `OR predicate` on the last join or where clause.
    pub fn or(mut self, predicate: Expr) -> Self {
        let result = chain(&mut self.container, Op::Or, predicate, &self.aliases);
        remember(&mut self.error, result);
        self
    }

    pub fn order_by<E: Entity, V>(self, column: Column<E, V>) -> Self {
        self.add_ordering(Op::OrderBy, column)
    }

    pub fn order_by_desc<E: Entity, V>(self, column: Column<E, V>) -> Self {
        self.add_ordering(Op::OrderByDesc, column)
    }

    pub fn then_by<E: Entity, V>(self, column: Column<E, V>) -> Self {
        self.add_ordering(Op::ThenBy, column)
    }

    pub fn then_by_desc<E: Entity, V>(self, column: Column<E, V>) -> Self {
        self.add_ordering(Op::ThenByDesc, column)
    }

    pub fn group_by<E: Entity, V>(self, column: Column<E, V>) -> Self {
        self.add_ordering(Op::GroupBy, column)
    }

    pub fn then_group_by<E: Entity, V>(self, column: Column<E, V>) -> Self {
        self.add_ordering(Op::ThenGroupBy, column)
    }

    fn add_ordering<E: Entity, V>(mut self, op: Op, column: Column<E, V>) -> Self {
        let result = self.ordering_part(op, column).map(|part| {
            match op {
                // grouping precedes ordering
                Op::GroupBy | Op::ThenGroupBy => place_before(
                    &mut self.container,
                    part,
                    &[Op::OrderBy, Op::OrderByDesc, Op::ThenBy, Op::ThenByDesc],
                ),
                _ => self.container.add(part),
            }
        });
        remember(&mut self.error, result);
        self
    }

    fn ordering_part<E: Entity, V>(&self, op: Op, column: Column<E, V>) -> OrmResult<QueryPart> {
        let required: &[Op] = match op {
            Op::ThenBy | Op::ThenByDesc => &[Op::OrderBy, Op::OrderByDesc],
            Op::ThenGroupBy => &[Op::GroupBy],
            _ => &[],
        };
        if !required.is_empty() && !required.iter().any(|r| self.container.contains(*r)) {
            return Err(OrmError::validation(format!(
                "{op} requires a preceding {}",
                required[0]
            )));
        }
        let (entity, member) = self.source_column(column.column_ref())?;
        Ok(QueryPart::field(
            op,
            FieldPart {
                entity,
                member: member.to_string(),
                qualifier: self.aliases.qualifier(&entity).to_string(),
                alias: None,
            },
        ))
    }

    /// Resolve a column against the entities this query reads from.
    fn source_column(&self, column: ColumnRef) -> OrmResult<(EntityRef, &'static str)> {
        let field = column.entity.field(column.name)?;
        if !self.sources.contains(&column.entity) {
            return Err(OrmError::validation(format!(
                "{} is not part of this query",
                column.entity.name()
            )));
        }
        Ok((column.entity, field.name))
    }

    /// `SELECT DISTINCT`
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Return at most `n` rows (`TOP n` or `LIMIT n`, per dialect).
    pub fn top(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Fill output field `output` from `source` (`source AS output`).
    pub fn map<E: Entity, V>(mut self, source: Column<E, V>, output: impl Into<String>) -> Self {
        let output = output.into();
        let resolved = O::field(&output)
            .and_then(|target| Ok((target, self.source_column(source.column_ref())?)));
        match resolved {
            Ok((target, (entity, name))) => {
                self.mappings
                    .retain(|m| !m.output.eq_ignore_ascii_case(target.name));
                self.mappings.push(Mapping {
                    source: ColumnRef { entity, name },
                    output: target.name.to_string(),
                });
            }
            Err(e) => remember(&mut self.error, Err(e)),
        }
        self
    }

    /// Leave an output field out of the projection.
    pub fn ignore<V>(mut self, column: Column<O, V>) -> Self {
        match O::field(column.name()) {
            Ok(field) => self.ignored.push(field.name),
            Err(e) => remember(&mut self.error, Err(e)),
        }
        self
    }

    /// Project into another output type.
    pub fn for_type<O2: Entity>(self) -> SelectBuilder<'a, C, T, O2> {
        SelectBuilder {
            ctx: self.ctx,
            container: self.container,
            aliases: self.aliases,
            sources: self.sources,
            mappings: self.mappings,
            ignored: self.ignored,
            distinct: self.distinct,
            limit: self.limit,
            error: self.error,
            _marker: PhantomData,
        }
    }

    /// One field part per output field, resolved against the sources.
    fn projection(&self) -> OrmResult<Vec<FieldPart>> {
        let mut fields = Vec::new();
        for field in O::fields() {
            if listed(&self.ignored, field.name) {
                continue;
            }

            let mapped = self
                .mappings
                .iter()
                .find(|m| m.output.eq_ignore_ascii_case(field.name));
            let part = match mapped {
                Some(m) => FieldPart {
                    entity: m.source.entity,
                    member: m.source.name.to_string(),
                    qualifier: self.aliases.qualifier(&m.source.entity).to_string(),
                    alias: (!m.source.name.eq_ignore_ascii_case(field.name))
                        .then(|| field.name.to_string()),
                },
                None => {
                    let (entity, source) = self
                        .sources
                        .iter()
                        .find_map(|s| s.field(field.name).ok().map(|f| (*s, f)))
                        .ok_or_else(|| OrmError::mapping(O::entity_name(), field.name))?;
                    FieldPart {
                        entity,
                        member: source.name.to_string(),
                        qualifier: self.aliases.qualifier(&entity).to_string(),
                        alias: None,
                    }
                }
            };
            fields.push(part);
        }

        if fields.is_empty() {
            return Err(OrmError::validation(format!(
                "{} has no field left to select",
                O::entity_name()
            )));
        }
        Ok(fields)
    }

    fn build(mut self) -> OrmResult<(&'a mut DatabaseContext<C>, QueryPartsContainer)> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        let fields = self.projection()?;
        let Self {
            ctx,
            mut container,
            aliases,
            distinct,
            limit,
            ..
        } = self;
        // aliases registered by later joins apply to earlier clauses too
        container.set_aliases(&aliases);

        if distinct {
            container.add_after(QueryPart::text(Op::Distinct, ""), Op::Select);
        }
        if let Some(n) = limit {
            match ctx.dialect().row_limit() {
                RowLimit::Top => {
                    let marker = if distinct { Op::Distinct } else { Op::Select };
                    container.add_after(QueryPart::text(Op::Top, n.to_string()), marker);
                }
                RowLimit::Limit => container.add(QueryPart::text(Op::Limit, n.to_string())),
            }
        }

        for field in fields {
            let marker = [Op::Field, Op::Top, Op::Distinct]
                .into_iter()
                .find(|op| container.contains(*op))
                .unwrap_or(Op::Select);
            container.add_after(QueryPart::field(Op::Field, field), marker);
        }
        Ok((ctx, container))
    }

    /// Compile without executing. `before_compile` interceptors still run.
    pub fn compile(self) -> OrmResult<CompiledQuery> {
        let (ctx, mut container) = self.build()?;
        ctx.prepare(Some(TypeId::of::<O>()), &mut container)
    }
}

impl<'a, C: Connection, T: Entity, O: Entity + FromRow> SelectBuilder<'a, C, T, O> {
    /// Run the query and map every row into `O`.
    pub fn select(self) -> OrmResult<Vec<O>> {
        let (ctx, container) = self.build()?;
        ctx.run_query::<O>(container)
    }

    /// Shorthand for `for_type::<O2>().select()`.
    pub fn select_as<O2: Entity + FromRow>(self) -> OrmResult<Vec<O2>> {
        self.for_type::<O2>().select()
    }

    /// First row, if any.
    pub fn first(self) -> OrmResult<Option<O>> {
        Ok(self.top(1).select()?.into_iter().next())
    }
}

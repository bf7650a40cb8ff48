//! Lowering of [`Expr`] trees to dialect SQL.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::dialect::Dialect;
use crate::entity::{ColumnRef, EntityRef};
use crate::error::{OrmError, OrmResult};
use crate::expr::{CompareOp, Expr};
use crate::value::Value;

/// Entity → table alias, consulted when qualifying column references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasMap {
    entries: Vec<(TypeId, String)>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: &EntityRef, alias: impl Into<String>) {
        let alias = alias.into();
        match self.entries.iter_mut().find(|(t, _)| *t == entity.type_id()) {
            Some(existing) => existing.1 = alias,
            None => self.entries.push((entity.type_id(), alias)),
        }
    }

    pub fn get(&self, entity: &EntityRef) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| *t == entity.type_id())
            .map(|(_, a)| a.as_str())
    }

    /// Alias of `entity`, falling back to its table name.
    pub fn qualifier<'a>(&'a self, entity: &EntityRef) -> &'a str {
        self.get(entity).unwrap_or(entity.name())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Handler lowering a call node: receives the translator, the call target and its arguments.
pub type FunctionHandler =
    Arc<dyn Fn(&Translator<'_>, &Expr, &[Expr]) -> OrmResult<String> + Send + Sync>;

/// Known method-call → SQL function translations.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    handlers: HashMap<String, FunctionHandler>,
}

impl FunctionRegistry {
    /// Registry without any function.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in text functions.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("contains", |t, target, args| like(t, target, args, "%", "%"));
        registry.register("starts_with", |t, target, args| like(t, target, args, "", "%"));
        registry.register("ends_with", |t, target, args| like(t, target, args, "%", ""));
        registry.register("upper", |t, target, _| Ok(format!("UPPER({})", t.operand(target)?)));
        registry.register("lower", |t, target, _| Ok(format!("LOWER({})", t.operand(target)?)));
        registry.register("trim", |t, target, _| Ok(t.dialect().trim(&t.operand(target)?)));
        registry.register("len", |t, target, _| Ok(t.dialect().length(&t.operand(target)?)));
        registry
    }

    /// Shared instance of [`FunctionRegistry::builtin`].
    pub fn builtin_ref() -> &'static FunctionRegistry {
        static BUILTIN: OnceLock<FunctionRegistry> = OnceLock::new();
        BUILTIN.get_or_init(FunctionRegistry::builtin)
    }

    /// Add or replace a function translation.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&Translator<'_>, &Expr, &[Expr]) -> OrmResult<String> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<&FunctionHandler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

fn like(t: &Translator<'_>, target: &Expr, args: &[Expr], pre: &str, post: &str) -> OrmResult<String> {
    let column = t.operand(target)?;
    let pattern = match args {
        [Expr::Literal(Value::Text(s))] => t.literal(&Value::Text(format!("{pre}{s}{post}"))),
        [arg] => {
            let mut pieces = Vec::with_capacity(3);
            if !pre.is_empty() {
                pieces.push(t.literal(&Value::Text(pre.to_string())));
            }
            pieces.push(t.operand(arg)?);
            if !post.is_empty() {
                pieces.push(t.literal(&Value::Text(post.to_string())));
            }
            t.dialect().concat(&pieces)
        }
        _ => {
            return Err(OrmError::translation(format!(
                "LIKE translation expects one argument, got {}",
                args.len()
            )));
        }
    };
    Ok(format!("{column} LIKE {pattern}"))
}

/// Renders expressions for one dialect, qualifying columns through an alias map.
pub struct Translator<'a> {
    dialect: &'a dyn Dialect,
    aliases: &'a AliasMap,
    functions: &'a FunctionRegistry,
}

impl<'a> Translator<'a> {
    pub fn new(
        dialect: &'a dyn Dialect,
        aliases: &'a AliasMap,
        functions: &'a FunctionRegistry,
    ) -> Self {
        Self {
            dialect,
            aliases,
            functions,
        }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect
    }

    /// Boolean SQL text of `expr`.
    pub fn translate(&self, expr: &Expr) -> OrmResult<String> {
        match expr {
            Expr::Column(c) => self.column(c),
            Expr::Literal(v) => Ok(self.literal(v)),
            Expr::Compare { op, lhs, rhs } => self.compare(*op, lhs, rhs),
            Expr::And(items) => self.group(items, "AND"),
            Expr::Or(items) => self.group(items, "OR"),
            Expr::Not(inner) => Ok(format!("NOT ({})", self.translate(inner)?)),
            Expr::InList {
                operand,
                values,
                negated,
            } => {
                if values.is_empty() {
                    // IN () is invalid SQL; an empty list matches nothing.
                    return Ok(if *negated { "1=1" } else { "1=0" }.to_string());
                }
                let list = values
                    .iter()
                    .map(|v| self.literal(v))
                    .collect::<Vec<_>>()
                    .join(", ");
                let keyword = if *negated { "NOT IN" } else { "IN" };
                Ok(format!("{} {keyword} ({list})", self.operand(operand)?))
            }
            Expr::Between {
                operand,
                from,
                to,
                negated,
            } => {
                let keyword = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                Ok(format!(
                    "{} {keyword} {} AND {}",
                    self.operand(operand)?,
                    self.literal(from),
                    self.literal(to)
                ))
            }
            Expr::Call {
                function,
                target,
                args,
            } => {
                let handler = self.functions.get(function).ok_or_else(|| {
                    OrmError::translation(format!("no SQL translation for method '{function}'"))
                })?;
                (handler.as_ref())(self, target, args)
            }
        }
    }

    /// Qualified column reference; the member must be mapped on its entity.
    pub fn column(&self, column: &ColumnRef) -> OrmResult<String> {
        let field = column.entity.field(column.name)?;
        Ok(format!(
            "{}.{}",
            self.aliases.qualifier(&column.entity),
            field.name
        ))
    }

    pub fn literal(&self, value: &Value) -> String {
        self.dialect.quote_value(value)
    }

    /// Operand text, parenthesized when the node is itself a predicate.
    pub fn operand(&self, expr: &Expr) -> OrmResult<String> {
        let sql = self.translate(expr)?;
        Ok(if expr.is_compound() {
            format!("({sql})")
        } else {
            sql
        })
    }

    fn compare(&self, op: CompareOp, lhs: &Expr, rhs: &Expr) -> OrmResult<String> {
        let null_side = match (lhs, rhs) {
            (_, Expr::Literal(Value::Null)) => Some(lhs),
            (Expr::Literal(Value::Null), _) => Some(rhs),
            _ => None,
        };
        if let Some(other) = null_side {
            return match op {
                CompareOp::Eq => Ok(format!("{} IS NULL", self.operand(other)?)),
                CompareOp::Ne => Ok(format!("{} IS NOT NULL", self.operand(other)?)),
                _ => Err(OrmError::translation(format!(
                    "cannot compare with NULL using '{}'",
                    op.as_sql()
                ))),
            };
        }
        Ok(format!(
            "{} {} {}",
            self.operand(lhs)?,
            op.as_sql(),
            self.operand(rhs)?
        ))
    }

    fn group(&self, items: &[Expr], keyword: &str) -> OrmResult<String> {
        match items {
            [] => Err(OrmError::translation(format!("empty {keyword} group"))),
            [single] => self.translate(single),
            _ => {
                let parts = items
                    .iter()
                    .map(|e| self.translate(e))
                    .collect::<OrmResult<Vec<_>>>()?;
                Ok(format!("({})", parts.join(&format!(" {keyword} "))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{SqlServerDialect, SqliteDialect};
    use crate::entity::{Column, Entity, FieldDef};
    use crate::value::FieldType;

    struct Warrior;
    struct Armour;

    impl Entity for Warrior {
        fn entity_name() -> &'static str {
            "Warrior"
        }

        fn fields() -> Vec<FieldDef> {
            vec![
                FieldDef::new("ID", FieldType::Int, false).key(),
                FieldDef::new("Name", FieldType::Text, true),
            ]
        }

        fn values(&self) -> Vec<(&'static str, Value)> {
            Vec::new()
        }
    }

    impl Entity for Armour {
        fn entity_name() -> &'static str {
            "Armour"
        }

        fn fields() -> Vec<FieldDef> {
            vec![FieldDef::new("WarriorID", FieldType::Int, false)]
        }

        fn values(&self) -> Vec<(&'static str, Value)> {
            Vec::new()
        }
    }

    const W_ID: Column<Warrior, i32> = Column::new("ID");
    const W_NAME: Column<Warrior, Option<String>> = Column::new("Name");
    const A_WARRIOR: Column<Armour, i32> = Column::new("WarriorID");

    fn sql(expr: &Expr) -> OrmResult<String> {
        let aliases = AliasMap::new();
        Translator::new(&SqlServerDialect, &aliases, FunctionRegistry::builtin_ref()).translate(expr)
    }

    #[test]
    fn column_to_column_comparison() {
        assert_eq!(sql(&A_WARRIOR.eq(W_ID)).unwrap(), "Armour.WarriorID = Warrior.ID");
    }

    #[test]
    fn alias_replaces_table_name() {
        let mut aliases = AliasMap::new();
        aliases.insert(&EntityRef::of::<Warrior>(), "w");
        let t = Translator::new(&SqlServerDialect, &aliases, FunctionRegistry::builtin_ref());
        assert_eq!(
            t.translate(&A_WARRIOR.eq(W_ID)).unwrap(),
            "Armour.WarriorID = w.ID"
        );
    }

    #[test]
    fn null_comparisons() {
        assert_eq!(sql(&W_NAME.eq(None::<String>)).unwrap(), "Warrior.Name IS NULL");
        assert_eq!(sql(&W_NAME.ne(None::<String>)).unwrap(), "Warrior.Name IS NOT NULL");
        assert_eq!(sql(&W_NAME.is_null()).unwrap(), "Warrior.Name IS NULL");
        assert!(sql(&W_NAME.gt(None::<String>)).unwrap_err().is_translation());
    }

    #[test]
    fn connectives_are_parenthesized() {
        let expr = W_ID.eq(1).and(W_ID.gt(2).or(W_NAME.eq("Olaf")));
        assert_eq!(
            sql(&expr).unwrap(),
            "(Warrior.ID = 1 AND (Warrior.ID > 2 OR Warrior.Name = 'Olaf'))"
        );
        assert_eq!(
            sql(&Expr::not(W_ID.eq(1))).unwrap(),
            "NOT (Warrior.ID = 1)"
        );
    }

    #[test]
    fn like_functions() {
        assert_eq!(
            sql(&W_NAME.contains("la")).unwrap(),
            "Warrior.Name LIKE '%la%'"
        );
        assert_eq!(
            sql(&W_NAME.starts_with("O")).unwrap(),
            "Warrior.Name LIKE 'O%'"
        );
        assert_eq!(
            sql(&W_NAME.ends_with("'f")).unwrap(),
            "Warrior.Name LIKE '%''f'"
        );
    }

    #[test]
    fn dialect_specific_functions() {
        let aliases = AliasMap::new();
        let registry = FunctionRegistry::builtin();
        let lite = Translator::new(&SqliteDialect, &aliases, &registry);
        let expr = W_NAME.len().gt(3i64);
        assert_eq!(sql(&expr).unwrap(), "LEN(Warrior.Name) > 3");
        assert_eq!(lite.translate(&expr).unwrap(), "LENGTH(Warrior.Name) > 3");
        assert_eq!(
            sql(&W_NAME.upper().eq("OLAF")).unwrap(),
            "UPPER(Warrior.Name) = 'OLAF'"
        );
    }

    #[test]
    fn in_list_and_between() {
        assert_eq!(
            sql(&W_ID.in_list([1, 2, 3])).unwrap(),
            "Warrior.ID IN (1, 2, 3)"
        );
        assert_eq!(sql(&W_ID.in_list(Vec::<i32>::new())).unwrap(), "1=0");
        assert_eq!(
            sql(&W_ID.between(1, 10)).unwrap(),
            "Warrior.ID BETWEEN 1 AND 10"
        );
    }

    #[test]
    fn unknown_call_is_translation_error() {
        let expr = Expr::call("soundex", Expr::Column(W_NAME.column_ref()), Vec::new());
        assert!(sql(&expr).unwrap_err().is_translation());
    }

    #[test]
    fn registered_function_is_used() {
        let mut registry = FunctionRegistry::builtin();
        registry.register("soundex", |t, target, _| {
            Ok(format!("SOUNDEX({})", t.operand(target)?))
        });
        let aliases = AliasMap::new();
        let t = Translator::new(&SqlServerDialect, &aliases, &registry);
        let expr = Expr::call("soundex", Expr::Column(W_NAME.column_ref()), Vec::new());
        assert_eq!(t.translate(&expr).unwrap(), "SOUNDEX(Warrior.Name)");
    }

    #[test]
    fn unmapped_member_is_mapping_error() {
        let bogus: Column<Warrior, i32> = Column::new("Bogus");
        assert!(sql(&bogus.eq(1)).unwrap_err().is_mapping());
    }
}

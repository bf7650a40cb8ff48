//! Container → SQL text + bound parameters.
//!
//! Single pass over the parts in order. Each part is dispatched on its
//! [`OperationType`] to the dialect's [`PartRule`]:
//!
//! - the rule prefix/suffix wrap the part's own text
//! - siblings sharing a list group are joined with the list separator and
//!   only the first gets the prefix (`ORDER BY a, b DESC`)
//! - other siblings are joined with a space, or a newline around standalone
//!   parts (`DECLARE`/`SET`/`SELECT` around an `EXEC`)
//! - items parts render their children first, then wrap them with the rule's
//!   open/close text; predicate chains are folded as `(acc AND next)`
//!
//! A tag without a rule is an [`OrmError::Unsupported`] error.

use std::fmt;

use crate::dialect::{ChildLayout, Dialect, PartRule};
use crate::error::{OrmError, OrmResult};
use crate::parts::{ItemsPart, OperationType, PartContent, QueryPart, QueryPartsContainer, Slot};
use crate::translate::{FunctionRegistry, Translator};
use crate::value::{FieldType, Value};

/// A parameter bound into a compiled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameter {
    pub name: Option<String>,
    pub field_type: Option<FieldType>,
    pub value: Value,
    pub output: bool,
}

/// Final SQL plus its parameters, in rendering order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    sql: String,
    parameters: Vec<QueryParameter>,
}

impl CompiledQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    /// Names of output parameters, in declaration order.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.output)
            .filter_map(|p| p.name.as_deref())
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Compiles containers for one dialect.
pub struct Compiler<'a> {
    dialect: &'a dyn Dialect,
    functions: &'a FunctionRegistry,
}

impl<'a> Compiler<'a> {
    /// Compiler using the built-in function translations.
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            dialect,
            functions: FunctionRegistry::builtin_ref(),
        }
    }

    pub fn with_functions(mut self, functions: &'a FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    /// Compile a container. Pure: the container is not modified and
    /// compiling twice yields the same result.
    pub fn compile(&self, container: &QueryPartsContainer) -> OrmResult<CompiledQuery> {
        let mut parameters = Vec::new();
        let sql = self.render_sequence(container.parts(), " ", &mut parameters)?;
        Ok(CompiledQuery { sql, parameters })
    }

    fn rule(&self, op: OperationType) -> OrmResult<PartRule> {
        self.dialect.rule(op).ok_or_else(|| {
            OrmError::unsupported(format!(
                "{op} is not supported by the {} dialect",
                self.dialect.kind()
            ))
        })
    }

    fn render_sequence(
        &self,
        parts: &[QueryPart],
        joiner: &str,
        parameters: &mut Vec<QueryParameter>,
    ) -> OrmResult<String> {
        let mut out = String::new();
        let mut prev: Option<PartRule> = None;

        for part in parts {
            let rule = self.rule(part.operation())?;
            let continued = match (prev.and_then(|p| p.list), rule.list) {
                (Some(a), Some(b)) if a.group == b.group => Some(b.separator),
                _ => None,
            };

            let own = self.render_own(part, &rule, parameters)?;
            let text = match continued {
                Some(_) => format!("{own}{}", rule.suffix),
                None => format!("{}{own}{}", rule.prefix, rule.suffix),
            };
            // e.g. a primary key already declared inline
            if text.is_empty() {
                continue;
            }

            if !out.is_empty() {
                match continued {
                    Some(separator) => out.push_str(separator),
                    None if rule.standalone || prev.is_some_and(|p| p.standalone) => {
                        out.push('\n')
                    }
                    None => out.push_str(joiner),
                }
            }
            out.push_str(&text);
            prev = Some(rule);
        }
        Ok(out)
    }

    fn render_own(
        &self,
        part: &QueryPart,
        rule: &PartRule,
        parameters: &mut Vec<QueryParameter>,
    ) -> OrmResult<String> {
        Ok(match part.content() {
            PartContent::Text(text) => text.clone(),
            PartContent::Field(field) => field.render(),
            PartContent::Expression(e) => {
                Translator::new(self.dialect, &e.aliases, self.functions).translate(&e.expr)?
            }
            PartContent::Delegate(d) => d.render(),
            PartContent::Values(values) => {
                let op = part.operation();
                if matches!(op, OperationType::Parameter | OperationType::OutputParameter) {
                    let value = values.literal(Slot::Value).cloned().unwrap_or(Value::Null);
                    parameters.push(QueryParameter {
                        name: values.text(Slot::MemberName).map(str::to_string),
                        field_type: values
                            .field_type(Slot::MemberType)
                            .or_else(|| value.field_type()),
                        value,
                        output: op == OperationType::OutputParameter,
                    });
                }
                self.dialect.render_values(op, values)?
            }
            PartContent::Items(items) => {
                self.render_items(part.operation(), items, rule, parameters)?
            }
        })
    }

    fn render_items(
        &self,
        op: OperationType,
        items: &ItemsPart,
        rule: &PartRule,
        parameters: &mut Vec<QueryParameter>,
    ) -> OrmResult<String> {
        let body = match rule.layout {
            ChildLayout::Joined(separator) => {
                self.render_sequence(items.children.parts(), separator, parameters)?
            }
            ChildLayout::Fold => self.fold(items.children.parts(), parameters)?,
        };
        if body.is_empty() && rule.layout == ChildLayout::Fold {
            return Err(OrmError::validation(format!("{op} clause has no predicate")));
        }

        let head = items.head.as_deref().unwrap_or_default();
        Ok(format!("{head}{}{body}{}", rule.open, rule.close))
    }

    /// `p1`, `(p1 AND p2)`, `((p1 AND p2) OR p3)`, ...
    fn fold(&self, parts: &[QueryPart], parameters: &mut Vec<QueryParameter>) -> OrmResult<String> {
        let mut acc: Option<String> = None;
        for part in parts {
            let rule = self.rule(part.operation())?;
            let own = self.render_own(part, &rule, parameters)?;
            acc = Some(match acc {
                None => own,
                Some(acc) => format!("({acc} {}{own}{})", rule.prefix, rule.suffix),
            });
        }
        Ok(acc.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{SqlServerCeDialect, SqlServerDialect, SqliteDialect};
    use crate::parts::ValueCollection;

    fn parameter(name: &str, value: Value) -> QueryPart {
        QueryPart::values(
            OperationType::Parameter,
            ValueCollection::new()
                .with_text(Slot::MemberName, name)
                .with(Slot::Value, crate::parts::SlotValue::Literal(value)),
        )
    }

    fn compile(parts: Vec<QueryPart>) -> OrmResult<CompiledQuery> {
        let mut container = QueryPartsContainer::new();
        for part in parts {
            container.add(part);
        }
        Compiler::new(&SqlServerDialect).compile(&container)
    }

    #[test]
    fn single_parameter() {
        let q = compile(vec![parameter("Param", Value::Int(1))]).unwrap();
        assert_eq!(q.sql(), "Param=1");
        assert_eq!(q.parameters().len(), 1);
        assert_eq!(q.parameters()[0].name.as_deref(), Some("Param"));
        assert_eq!(q.parameters()[0].field_type, Some(FieldType::BigInt));
    }

    #[test]
    fn sibling_parameters_are_comma_separated() {
        let q = compile(vec![
            parameter("Param1", Value::Int(1)),
            parameter("Param2", Value::Text("two".into())),
        ])
        .unwrap();
        assert_eq!(q.sql(), "Param1=1, Param2='two'");
    }

    #[test]
    fn output_parameter_appends_output() {
        let out = QueryPart::values(
            OperationType::OutputParameter,
            ValueCollection::new().with_text(Slot::MemberName, "@total"),
        );
        let q = compile(vec![
            QueryPart::text(OperationType::Procedure, "GetTotal"),
            parameter("@id", Value::Int(3)),
            out,
        ])
        .unwrap();
        assert_eq!(q.sql(), "EXEC GetTotal @id=3, @total=@total OUTPUT");
        assert_eq!(q.output_names().collect::<Vec<_>>(), ["@total"]);
    }

    #[test]
    fn standalone_parts_go_on_their_own_line() {
        let name = ValueCollection::new()
            .with_text(Slot::MemberName, "@total")
            .with(Slot::MemberType, crate::parts::SlotValue::Type(FieldType::Int));
        let q = compile(vec![
            QueryPart::values(OperationType::OutputParameterDeclare, name.clone()),
            QueryPart::values(
                OperationType::OutputParameterSet,
                name.clone()
                    .with(Slot::Value, crate::parts::SlotValue::Literal(Value::Int(0))),
            ),
            QueryPart::text(OperationType::Procedure, "GetTotal"),
            QueryPart::values(OperationType::OutputParameter, name.clone()),
            QueryPart::values(OperationType::OutputParameterSelect, name),
        ])
        .unwrap();
        assert_eq!(
            q.sql(),
            "DECLARE @total int\nSET @total = 0\nEXEC GetTotal @total=@total OUTPUT\nSELECT @total AS total"
        );
    }

    #[test]
    fn missing_rule_is_unsupported() {
        let mut container = QueryPartsContainer::new();
        container.add(QueryPart::text(OperationType::Procedure, "GetTotal"));
        let err = Compiler::new(&SqliteDialect).compile(&container).unwrap_err();
        assert!(err.is_unsupported());
        let err = Compiler::new(&SqlServerCeDialect)
            .compile(&container)
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn fold_chains_predicates() {
        let clause = QueryPart::items(OperationType::Where, None)
            .with_child(QueryPart::text(OperationType::Predicate, "a = 1"))
            .with_child(QueryPart::text(OperationType::And, "b = 2"))
            .with_child(QueryPart::text(OperationType::Or, "c = 3"));
        let q = compile(vec![
            QueryPart::text(OperationType::Select, ""),
            QueryPart::text(OperationType::Raw, "*"),
            QueryPart::text(OperationType::From, "T"),
            clause,
        ])
        .unwrap();
        assert_eq!(q.sql(), "SELECT * FROM T WHERE ((a = 1 AND b = 2) OR c = 3)");
    }

    #[test]
    fn empty_predicate_clause_is_rejected() {
        let err = compile(vec![QueryPart::items(OperationType::Where, None)]).unwrap_err();
        assert!(matches!(err, OrmError::Validation(_)));
    }

    #[test]
    fn list_groups_drop_repeated_prefix() {
        let q = compile(vec![
            QueryPart::text(OperationType::OrderBy, "T.a"),
            QueryPart::text(OperationType::ThenByDesc, "T.b"),
            QueryPart::text(OperationType::ThenBy, "T.c"),
        ])
        .unwrap();
        assert_eq!(q.sql(), "ORDER BY T.a, T.b DESC, T.c");
    }

    #[test]
    fn compile_is_idempotent() {
        let mut container = QueryPartsContainer::new();
        container.add(parameter("A", Value::Bool(true)));
        container.add(QueryPart::delegate(OperationType::Raw, || "x".to_string()));
        let compiler = Compiler::new(&SqlServerDialect);
        let first = compiler.compile(&container).unwrap();
        let second = compiler.compile(&container).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.sql(), "A='1' x");
    }
}

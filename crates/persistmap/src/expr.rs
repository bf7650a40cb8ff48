//! Typed predicate expressions.
//!
//! Predicates are built from generated column descriptors instead of parsed
//! lambdas: `Armour::COL_WARRIOR_ID.eq(Warrior::COL_ID)` is the tree the
//! translator lowers to `Armour.WarriorID = Warrior.ID`.
//!
//! - comparisons (`eq`, `ne`, `lt`, `le`, `gt`, `ge`) type-check the right-hand
//!   side against the column's value type through [`IntoOperand`]
//! - `and`/`or`/[`Expr::not`] build the logical tree; every connective renders
//!   with its own parentheses, so SQL precedence never has to match the tree
//! - `contains`/`starts_with`/`ends_with`/`upper`/`lower`/`trim`/`len` become
//!   function-call nodes that the translator resolves by name

use std::marker::PhantomData;
use std::ops::{BitAnd, BitOr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::entity::{Column, ColumnRef, Entity};
use crate::value::{ToValue, Value};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Qualified column reference.
    Column(ColumnRef),

    /// Captured value, rendered with the dialect's quoting rules.
    Literal(Value),

    /// Binary comparison: lhs op rhs
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// AND group: all conditions must be true.
    And(Vec<Expr>),

    /// OR group: at least one condition must be true.
    Or(Vec<Expr>),

    /// NOT: negate the inner expression.
    Not(Box<Expr>),

    /// IN list: operand IN (v1, v2, ...) or operand NOT IN (...)
    InList {
        operand: Box<Expr>,
        values: Vec<Value>,
        negated: bool,
    },

    /// BETWEEN: operand BETWEEN from AND to
    Between {
        operand: Box<Expr>,
        from: Value,
        to: Value,
        negated: bool,
    },

    /// Method call resolved to a SQL function by name.
    Call {
        function: String,
        target: Box<Expr>,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn literal(value: impl ToValue) -> Self {
        Expr::Literal(value.to_value())
    }

    /// Create a NOT expression.
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    /// AND over a list of expressions, rendered as one parenthesized group.
    pub fn all(exprs: Vec<Expr>) -> Self {
        Expr::And(exprs)
    }

    /// OR over a list of expressions, rendered as one parenthesized group.
    pub fn any(exprs: Vec<Expr>) -> Self {
        Expr::Or(exprs)
    }

    /// Method call node; the name must be known to the translator's function registry.
    pub fn call(function: impl Into<String>, target: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            function: function.into(),
            target: Box::new(target),
            args,
        }
    }

    /// `(self AND other)`
    pub fn and(self, other: Expr) -> Self {
        Expr::And(vec![self, other])
    }

    /// `(self OR other)`
    pub fn or(self, other: Expr) -> Self {
        Expr::Or(vec![self, other])
    }

    /// Whether rendering this node as an operand needs its own parentheses.
    pub(crate) fn is_compound(&self) -> bool {
        matches!(
            self,
            Expr::Compare { .. }
                | Expr::And(_)
                | Expr::Or(_)
                | Expr::Not(_)
                | Expr::InList { .. }
                | Expr::Between { .. }
        )
    }

    pub(crate) fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

impl BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Expr) -> Expr {
        self.and(rhs)
    }
}

impl BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        self.or(rhs)
    }
}

/// Something usable where a value of type `V` is expected: a literal of a
/// compatible Rust type, another column holding `V`, or a typed sub-expression.
pub trait IntoOperand<V> {
    fn into_operand(self) -> Expr;
}

impl<E: Entity, V> IntoOperand<V> for Column<E, V> {
    fn into_operand(self) -> Expr {
        Expr::Column(self.column_ref())
    }
}

impl<V> IntoOperand<V> for Operand<V> {
    fn into_operand(self) -> Expr {
        self.expr
    }
}

impl<T: ToValue> IntoOperand<Option<T>> for Option<T> {
    fn into_operand(self) -> Expr {
        Expr::Literal(self.to_value())
    }
}

macro_rules! literal_operand {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoOperand<$ty> for $ty {
                fn into_operand(self) -> Expr {
                    Expr::Literal(self.to_value())
                }
            }

            impl IntoOperand<Option<$ty>> for $ty {
                fn into_operand(self) -> Expr {
                    Expr::Literal(self.to_value())
                }
            }
        )*
    };
}

literal_operand!(
    bool,
    u8,
    i16,
    i32,
    i64,
    f32,
    f64,
    Decimal,
    String,
    NaiveDate,
    NaiveDateTime,
    DateTime<Utc>,
    Uuid,
    Vec<u8>,
);

impl IntoOperand<String> for &str {
    fn into_operand(self) -> Expr {
        Expr::Literal(Value::Text(self.to_string()))
    }
}

impl IntoOperand<Option<String>> for &str {
    fn into_operand(self) -> Expr {
        Expr::Literal(Value::Text(self.to_string()))
    }
}

impl IntoOperand<String> for &String {
    fn into_operand(self) -> Expr {
        Expr::Literal(Value::Text(self.clone()))
    }
}

/// Value types that support text functions.
pub trait TextLike {}

impl TextLike for String {}
impl TextLike for Option<String> {}

/// A typed sub-expression (e.g. `UPPER(col)`) that can be compared like a column.
#[derive(Debug, Clone)]
pub struct Operand<V> {
    expr: Expr,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Operand<V> {
    fn new(expr: Expr) -> Self {
        Self {
            expr,
            _marker: PhantomData,
        }
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }
}

macro_rules! comparison_methods {
    () => {
        /// `self = rhs`; comparing with `None` renders `IS NULL`.
        pub fn eq(self, rhs: impl IntoOperand<V>) -> Expr {
            Expr::compare(CompareOp::Eq, self.lhs(), rhs.into_operand())
        }

        /// `self <> rhs`; comparing with `None` renders `IS NOT NULL`.
        pub fn ne(self, rhs: impl IntoOperand<V>) -> Expr {
            Expr::compare(CompareOp::Ne, self.lhs(), rhs.into_operand())
        }

        pub fn lt(self, rhs: impl IntoOperand<V>) -> Expr {
            Expr::compare(CompareOp::Lt, self.lhs(), rhs.into_operand())
        }

        pub fn le(self, rhs: impl IntoOperand<V>) -> Expr {
            Expr::compare(CompareOp::Le, self.lhs(), rhs.into_operand())
        }

        pub fn gt(self, rhs: impl IntoOperand<V>) -> Expr {
            Expr::compare(CompareOp::Gt, self.lhs(), rhs.into_operand())
        }

        pub fn ge(self, rhs: impl IntoOperand<V>) -> Expr {
            Expr::compare(CompareOp::Ge, self.lhs(), rhs.into_operand())
        }

        pub fn is_null(self) -> Expr {
            Expr::compare(CompareOp::Eq, self.lhs(), Expr::Literal(Value::Null))
        }

        pub fn is_not_null(self) -> Expr {
            Expr::compare(CompareOp::Ne, self.lhs(), Expr::Literal(Value::Null))
        }

        pub fn in_list<T: ToValue>(self, values: impl IntoIterator<Item = T>) -> Expr {
            Expr::InList {
                operand: Box::new(self.lhs()),
                values: values.into_iter().map(|v| v.to_value()).collect(),
                negated: false,
            }
        }

        pub fn not_in_list<T: ToValue>(self, values: impl IntoIterator<Item = T>) -> Expr {
            Expr::InList {
                operand: Box::new(self.lhs()),
                values: values.into_iter().map(|v| v.to_value()).collect(),
                negated: true,
            }
        }

        pub fn between(self, from: impl ToValue, to: impl ToValue) -> Expr {
            Expr::Between {
                operand: Box::new(self.lhs()),
                from: from.to_value(),
                to: to.to_value(),
                negated: false,
            }
        }
    };
}

impl<E: Entity, V> Column<E, V> {
    fn lhs(self) -> Expr {
        Expr::Column(self.column_ref())
    }

    comparison_methods!();
}

impl<V> Operand<V> {
    fn lhs(self) -> Expr {
        self.expr
    }

    comparison_methods!();
}

impl<E: Entity, V: TextLike> Column<E, V> {
    /// `LIKE '%value%'`
    pub fn contains(self, value: impl IntoOperand<String>) -> Expr {
        Expr::call("contains", self.lhs(), vec![value.into_operand()])
    }

    /// `LIKE 'value%'`
    pub fn starts_with(self, value: impl IntoOperand<String>) -> Expr {
        Expr::call("starts_with", self.lhs(), vec![value.into_operand()])
    }

    /// `LIKE '%value'`
    pub fn ends_with(self, value: impl IntoOperand<String>) -> Expr {
        Expr::call("ends_with", self.lhs(), vec![value.into_operand()])
    }

    pub fn upper(self) -> Operand<V> {
        Operand::new(Expr::call("upper", self.lhs(), Vec::new()))
    }

    pub fn lower(self) -> Operand<V> {
        Operand::new(Expr::call("lower", self.lhs(), Vec::new()))
    }

    pub fn trim(self) -> Operand<V> {
        Operand::new(Expr::call("trim", self.lhs(), Vec::new()))
    }

    /// Character length of the value.
    pub fn len(self) -> Operand<i64> {
        Operand::new(Expr::call("len", self.lhs(), Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldDef;
    use crate::value::FieldType;

    struct Warrior;

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

    const ID: Column<Warrior, i32> = Column::new("ID");
    const NAME: Column<Warrior, Option<String>> = Column::new("Name");

    #[test]
    fn comparison_builds_compare_node() {
        let expr = ID.eq(5);
        let Expr::Compare { op, lhs, rhs } = expr else {
            panic!("expected compare");
        };
        assert_eq!(op, CompareOp::Eq);
        assert!(matches!(*lhs, Expr::Column(c) if c.name == "ID"));
        assert_eq!(*rhs, Expr::Literal(Value::Int(5)));
    }

    #[test]
    fn nullable_column_accepts_none_and_plain_values() {
        assert_eq!(
            NAME.eq(None::<String>),
            Expr::compare(CompareOp::Eq, NAME.lhs(), Expr::Literal(Value::Null))
        );
        assert!(matches!(NAME.eq("Olaf"), Expr::Compare { .. }));
    }

    #[test]
    fn connectives_keep_tree_shape() {
        let expr = ID.eq(1).and(ID.eq(2)).or(ID.eq(3));
        let Expr::Or(items) = expr else {
            panic!("expected or");
        };
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Expr::And(_)));
    }

    #[test]
    fn operators_match_methods() {
        assert_eq!(ID.eq(1) & ID.eq(2), ID.eq(1).and(ID.eq(2)));
        assert_eq!(ID.eq(1) | ID.eq(2), ID.eq(1).or(ID.eq(2)));
    }

    #[test]
    fn text_functions_become_calls() {
        assert!(matches!(
            NAME.contains("la"),
            Expr::Call { ref function, .. } if function == "contains"
        ));
        assert!(matches!(NAME.upper().eq("OLAF"), Expr::Compare { .. }));
    }
}

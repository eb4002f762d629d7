//! Where trees.
//!
//! A [`Condition`] is the normalized form of a where clause: attribute
//! predicates combined by explicit AND / OR / NOT groups. Conditions can be
//! built fluently or parsed from JSON (see [`crate::parse`]).
//!
//! # Example
//!
//! ```
//! use quarry_core::{Condition, DialectKind, CompileOptions, compile_where};
//!
//! let filter = Condition::eq("status", "active")
//!     .and(Condition::gt("age", 18).or(Condition::eq("verified", true)));
//!
//! let sql = compile_where(
//!     &filter,
//!     &CompileOptions::default(),
//!     DialectKind::Postgres.policy(),
//! )
//! .unwrap();
//! assert_eq!(sql, "\"status\" = 'active' AND (\"age\" > 18 OR \"verified\" = true)");
//! ```

use super::operator::Op;
use crate::builder::value::{SqlValue, ToSqlValue};
use crate::builder::Operand;

/// How a group combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// All children hold.
    And,
    /// Any child holds.
    Or,
    /// The conjunction of the children does not hold.
    Not,
}

impl GroupKind {
    /// The SQL keyword joining children.
    #[must_use]
    pub const fn joiner(self) -> &'static str {
        match self {
            Self::Or => " OR ",
            Self::And | Self::Not => " AND ",
        }
    }
}

/// A where tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A predicate on one attribute.
    Attribute {
        /// Attribute key: a name, a dotted JSON path, or `$a.b$`.
        key: String,
        /// What must hold for it.
        predicate: Predicate,
    },
    /// An explicit group. An explicit group with nothing in it is false.
    Group {
        /// How the children combine.
        kind: GroupKind,
        /// Children in order.
        children: Vec<Condition>,
    },
    /// An implicit conjunction (a plain object or list). Vanishes when empty.
    All(Vec<Condition>),
    /// Raw SQL.
    Raw(String),
}

/// What must hold for an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Implicit comparison: equality, `IS NULL`, or `IN` for lists.
    Value(Operand),
    /// An explicit operator.
    Op(Op, Operand),
    /// An explicit group of predicates on the same attribute.
    Group {
        /// How the children combine.
        kind: GroupKind,
        /// Children in order.
        children: Vec<Predicate>,
    },
    /// An implicit conjunction of predicates on the same attribute.
    All(Vec<Predicate>),
    /// A predicate on a value inside a JSON document.
    Json {
        /// Path segments below the current position.
        path: Vec<String>,
        /// Explicit cast applied to the extracted value.
        cast: Option<String>,
        /// What must hold for the extracted value.
        predicate: Box<Predicate>,
    },
}

impl Condition {
    /// Creates an attribute condition.
    pub fn attr(key: &str, predicate: Predicate) -> Self {
        Self::Attribute {
            key: key.to_string(),
            predicate,
        }
    }

    /// Creates an operator condition.
    pub fn op(key: &str, op: Op, operand: impl Into<Operand>) -> Self {
        Self::attr(key, Predicate::Op(op, operand.into()))
    }

    /// Creates an implicit comparison (`key = value`, `IS NULL` for null).
    pub fn eq<V: ToSqlValue>(key: &str, value: V) -> Self {
        Self::attr(key, Predicate::Value(Operand::Value(value.to_sql_value())))
    }

    /// Creates an inequality filter (`key != value`).
    pub fn ne<V: ToSqlValue>(key: &str, value: V) -> Self {
        Self::op(key, Op::Ne, value.to_sql_value())
    }

    /// Creates a greater-than filter.
    pub fn gt<V: ToSqlValue>(key: &str, value: V) -> Self {
        Self::op(key, Op::Gt, value.to_sql_value())
    }

    /// Creates a greater-than-or-equal filter.
    pub fn gte<V: ToSqlValue>(key: &str, value: V) -> Self {
        Self::op(key, Op::Gte, value.to_sql_value())
    }

    /// Creates a less-than filter.
    pub fn lt<V: ToSqlValue>(key: &str, value: V) -> Self {
        Self::op(key, Op::Lt, value.to_sql_value())
    }

    /// Creates a less-than-or-equal filter.
    pub fn lte<V: ToSqlValue>(key: &str, value: V) -> Self {
        Self::op(key, Op::Lte, value.to_sql_value())
    }

    /// Creates an IS NULL filter.
    pub fn is_null(key: &str) -> Self {
        Self::op(key, Op::Is, SqlValue::Null)
    }

    /// Creates an IS NOT NULL filter.
    pub fn is_not_null(key: &str) -> Self {
        Self::op(key, Op::IsNot, SqlValue::Null)
    }

    /// Creates an IN list filter.
    pub fn in_list<V: ToSqlValue>(key: &str, values: Vec<V>) -> Self {
        Self::op(key, Op::In, Operand::list(values.into_iter().map(ToSqlValue::to_sql_value)))
    }

    /// Creates a NOT IN list filter.
    pub fn not_in_list<V: ToSqlValue>(key: &str, values: Vec<V>) -> Self {
        Self::op(
            key,
            Op::NotIn,
            Operand::list(values.into_iter().map(ToSqlValue::to_sql_value)),
        )
    }

    /// Creates a LIKE filter. Use `%` for wildcard matching.
    pub fn like(key: &str, pattern: &str) -> Self {
        Self::op(key, Op::Like, pattern)
    }

    /// Creates a starts-with filter (`LIKE 'value%'`).
    pub fn starts_with(key: &str, value: &str) -> Self {
        Self::op(key, Op::StartsWith, value)
    }

    /// Creates an ends-with filter (`LIKE '%value'`).
    pub fn ends_with(key: &str, value: &str) -> Self {
        Self::op(key, Op::EndsWith, value)
    }

    /// Creates a substring filter (`LIKE '%value%'`).
    pub fn substring(key: &str, value: &str) -> Self {
        Self::op(key, Op::Substring, value)
    }

    /// Creates a BETWEEN filter.
    pub fn between<V: ToSqlValue>(key: &str, low: V, high: V) -> Self {
        Self::op(
            key,
            Op::Between,
            Operand::List(vec![low.into(), high.into()]),
        )
    }

    /// Creates a raw SQL condition.
    pub fn raw(sql: &str) -> Self {
        Self::Raw(sql.to_string())
    }

    /// Creates an explicit AND group.
    pub fn and_all<I: IntoIterator<Item = Self>>(children: I) -> Self {
        Self::Group {
            kind: GroupKind::And,
            children: children.into_iter().collect(),
        }
    }

    /// Creates an explicit OR group.
    pub fn or_all<I: IntoIterator<Item = Self>>(children: I) -> Self {
        Self::Group {
            kind: GroupKind::Or,
            children: children.into_iter().collect(),
        }
    }

    /// Combines this condition with another using AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.combine(GroupKind::And, other)
    }

    /// Combines this condition with another using OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.combine(GroupKind::Or, other)
    }

    /// Negates this condition with NOT.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Group {
            kind: GroupKind::Not,
            children: vec![self],
        }
    }

    /// Whether this is an implicit conjunction without children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::All(children) if children.is_empty())
    }

    fn combine(self, kind: GroupKind, other: Self) -> Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        match self {
            Self::Group {
                kind: existing,
                mut children,
            } if existing == kind => {
                children.push(other);
                Self::Group { kind, children }
            }
            this => Self::Group {
                kind,
                children: vec![this, other],
            },
        }
    }
}

impl Predicate {
    /// Creates an explicit operator predicate.
    pub fn op(op: Op, operand: impl Into<Operand>) -> Self {
        Self::Op(op, operand.into())
    }

    /// Creates a JSON path predicate.
    pub fn json(path: &[&str], predicate: Self) -> Self {
        Self::Json {
            path: path.iter().map(|s| (*s).to_string()).collect(),
            cast: None,
            predicate: Box::new(predicate),
        }
    }
}

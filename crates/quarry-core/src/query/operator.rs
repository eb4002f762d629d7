//! Comparison operators.

use std::fmt;
use std::str::FromStr;

use crate::error::CompileError;

/// A comparison operator applied to an attribute.
///
/// The JSON spelling is the camel-case name with a `$` prefix (`$notIn`,
/// `$iLike`, `$anyKeyExists`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `=`, or `IS NULL` against null.
    Eq,
    /// `!=`, or `IS NOT NULL` against null.
    Ne,
    /// `IS`.
    Is,
    /// `IS NOT`.
    IsNot,
    /// `IS NOT` / `NOT IN` / `!=` depending on the operand.
    Not,
    /// `>`.
    Gt,
    /// `>=`.
    Gte,
    /// `<`.
    Lt,
    /// `<=`.
    Lte,
    /// `BETWEEN a AND b`.
    Between,
    /// `NOT BETWEEN a AND b`.
    NotBetween,
    /// `IN (...)`.
    In,
    /// `NOT IN (...)`.
    NotIn,
    /// `LIKE`.
    Like,
    /// `NOT LIKE`.
    NotLike,
    /// `ILIKE`.
    ILike,
    /// `NOT ILIKE`.
    NotILike,
    /// `LIKE 'x%'`.
    StartsWith,
    /// `LIKE '%x'`.
    EndsWith,
    /// `LIKE '%x%'`.
    Substring,
    /// `NOT LIKE 'x%'`.
    NotStartsWith,
    /// `NOT LIKE '%x'`.
    NotEndsWith,
    /// `NOT LIKE '%x%'`.
    NotSubstring,
    /// Regular expression match.
    Regexp,
    /// Negated regular expression match.
    NotRegexp,
    /// Case-insensitive regular expression match.
    IRegexp,
    /// Negated case-insensitive regular expression match.
    NotIRegexp,
    /// `&&`.
    Overlap,
    /// `@>`.
    Contains,
    /// `<@`.
    Contained,
    /// `-|-`.
    Adjacent,
    /// `<<`.
    StrictLeft,
    /// `>>`.
    StrictRight,
    /// `&<`.
    NoExtendLeft,
    /// `&>`.
    NoExtendRight,
    /// `?|`.
    AnyKeyExists,
    /// `?&`.
    AllKeysExist,
    /// `@@`.
    Match,
}

impl Op {
    /// Every operator, in declaration order.
    pub const ALL: [Self; 38] = [
        Self::Eq,
        Self::Ne,
        Self::Is,
        Self::IsNot,
        Self::Not,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Between,
        Self::NotBetween,
        Self::In,
        Self::NotIn,
        Self::Like,
        Self::NotLike,
        Self::ILike,
        Self::NotILike,
        Self::StartsWith,
        Self::EndsWith,
        Self::Substring,
        Self::NotStartsWith,
        Self::NotEndsWith,
        Self::NotSubstring,
        Self::Regexp,
        Self::NotRegexp,
        Self::IRegexp,
        Self::NotIRegexp,
        Self::Overlap,
        Self::Contains,
        Self::Contained,
        Self::Adjacent,
        Self::StrictLeft,
        Self::StrictRight,
        Self::NoExtendLeft,
        Self::NoExtendRight,
        Self::AnyKeyExists,
        Self::AllKeysExist,
        Self::Match,
    ];

    /// Returns the JSON spelling without the `$` prefix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Is => "is",
            Self::IsNot => "isNot",
            Self::Not => "not",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Between => "between",
            Self::NotBetween => "notBetween",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::Like => "like",
            Self::NotLike => "notLike",
            Self::ILike => "iLike",
            Self::NotILike => "notILike",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Substring => "substring",
            Self::NotStartsWith => "notStartsWith",
            Self::NotEndsWith => "notEndsWith",
            Self::NotSubstring => "notSubstring",
            Self::Regexp => "regexp",
            Self::NotRegexp => "notRegexp",
            Self::IRegexp => "iRegexp",
            Self::NotIRegexp => "notIRegexp",
            Self::Overlap => "overlap",
            Self::Contains => "contains",
            Self::Contained => "contained",
            Self::Adjacent => "adjacent",
            Self::StrictLeft => "strictLeft",
            Self::StrictRight => "strictRight",
            Self::NoExtendLeft => "noExtendLeft",
            Self::NoExtendRight => "noExtendRight",
            Self::AnyKeyExists => "anyKeyExists",
            Self::AllKeysExist => "allKeysExist",
            Self::Match => "match",
        }
    }

    /// Returns the SQL token for operators that map to a fixed symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne | Self::Not => "!=",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Between => "BETWEEN",
            Self::NotBetween => "NOT BETWEEN",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like | Self::StartsWith | Self::EndsWith | Self::Substring => "LIKE",
            Self::NotLike | Self::NotStartsWith | Self::NotEndsWith | Self::NotSubstring => {
                "NOT LIKE"
            }
            Self::ILike => "ILIKE",
            Self::NotILike => "NOT ILIKE",
            Self::Regexp => "REGEXP",
            Self::NotRegexp => "NOT REGEXP",
            Self::IRegexp => "~*",
            Self::NotIRegexp => "!~*",
            Self::Overlap => "&&",
            Self::Contains => "@>",
            Self::Contained => "<@",
            Self::Adjacent => "-|-",
            Self::StrictLeft => "<<",
            Self::StrictRight => ">>",
            Self::NoExtendLeft => "&<",
            Self::NoExtendRight => "&>",
            Self::AnyKeyExists => "?|",
            Self::AllKeysExist => "?&",
            Self::Match => "@@",
        }
    }

    /// Whether the operator orders values and therefore rejects null.
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }

    /// Whether the operator is a LIKE derivative that builds its own pattern.
    #[must_use]
    pub const fn is_pattern_derivative(self) -> bool {
        matches!(
            self,
            Self::StartsWith
                | Self::EndsWith
                | Self::Substring
                | Self::NotStartsWith
                | Self::NotEndsWith
                | Self::NotSubstring
        )
    }

    /// Whether the operator matches text and casts non-text columns.
    #[must_use]
    pub const fn is_text_match(self) -> bool {
        matches!(
            self,
            Self::Like | Self::NotLike | Self::ILike | Self::NotILike
        ) || self.is_pattern_derivative()
    }

    /// Whether the operator is a range-only operator.
    #[must_use]
    pub const fn is_range_only(self) -> bool {
        matches!(
            self,
            Self::Adjacent
                | Self::StrictLeft
                | Self::StrictRight
                | Self::NoExtendLeft
                | Self::NoExtendRight
        )
    }

    /// Whether the operator accepts `ANY (...)` / `ALL (...)` on its right.
    #[must_use]
    pub const fn accepts_any_all(self) -> bool {
        matches!(
            self,
            Self::Eq
                | Self::Ne
                | Self::Not
                | Self::Gt
                | Self::Gte
                | Self::Lt
                | Self::Lte
                | Self::Like
                | Self::NotLike
                | Self::ILike
                | Self::NotILike
                | Self::Regexp
                | Self::NotRegexp
                | Self::IRegexp
                | Self::NotIRegexp
        )
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name())
    }
}

impl FromStr for Op {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s
            .strip_prefix('$')
            .ok_or_else(|| CompileError::UnknownOperator(s.to_string()))?;
        Self::ALL
            .into_iter()
            .find(|op| op.name() == name)
            .ok_or_else(|| CompileError::UnknownOperator(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_from_str() {
        assert_eq!("$eq".parse::<Op>().unwrap(), Op::Eq);
        assert_eq!("$notIn".parse::<Op>().unwrap(), Op::NotIn);
        assert_eq!("$iLike".parse::<Op>().unwrap(), Op::ILike);
        assert_eq!("$anyKeyExists".parse::<Op>().unwrap(), Op::AnyKeyExists);
        assert!(matches!(
            "$bogus".parse::<Op>(),
            Err(CompileError::UnknownOperator(_))
        ));
        assert!("eq".parse::<Op>().is_err());
    }

    #[test]
    fn test_op_names_are_unique() {
        for op in Op::ALL {
            assert_eq!(op.to_string().parse::<Op>().unwrap(), op);
        }
    }

    #[test]
    fn test_op_classification() {
        assert!(Op::Gt.is_ordering());
        assert!(!Op::Eq.is_ordering());
        assert!(Op::NotSubstring.is_pattern_derivative());
        assert!(Op::ILike.is_text_match());
        assert!(Op::Adjacent.is_range_only());
        assert!(!Op::In.accepts_any_all());
        assert_eq!(Op::NotEndsWith.symbol(), "NOT LIKE");
    }
}

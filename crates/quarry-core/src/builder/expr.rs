//! Column references and operands.

use chrono::FixedOffset;

use super::value::{SqlValue, ToSqlValue};
use crate::dialect::Dialect;
use crate::error::{CompileError, Result};
use crate::model::DataType;

/// Creates a column reference operand.
///
/// Dotted names reach into joined associations: `Task.Project.name` renders
/// as `[Task->Project].[name]`.
#[must_use]
pub fn col(name: &str) -> Operand {
    Operand::Column(ColumnRef::parse(name))
}

/// Creates a function call operand.
#[must_use]
pub fn func<I>(name: &str, args: I) -> Operand
where
    I: IntoIterator<Item = Operand>,
{
    Operand::Fn {
        name: String::from(name),
        args: args.into_iter().collect(),
    }
}

/// Creates a cast operand.
#[must_use]
pub fn cast(expr: impl Into<Operand>, ty: &str) -> Operand {
    Operand::Cast {
        expr: Box::new(expr.into()),
        ty: String::from(ty),
    }
}

/// Creates a raw SQL operand, inserted verbatim.
#[must_use]
pub fn literal(sql: &str) -> Operand {
    Operand::Literal(String::from(sql))
}

/// A column reference, possibly reaching through association aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Association aliases followed by the column name.
    pub path: Vec<String>,
}

impl ColumnRef {
    /// Parses a dotted reference.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        Self {
            path: name.split('.').map(String::from).collect(),
        }
    }

    /// Returns the column name (the last segment).
    #[must_use]
    pub fn column(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }

    /// Returns the SQL representation.
    #[must_use]
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        match self.path.split_last() {
            None => String::new(),
            Some((column, [])) => dialect.quote_identifier(column),
            Some((column, head)) => format!(
                "{}.{}",
                dialect.quote_identifier(&head.join("->")),
                dialect.quote_identifier(column)
            ),
        }
    }
}

/// A table reference used to qualify columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Optional schema.
    pub schema: Option<String>,
    /// Table name or alias.
    pub name: String,
}

impl TableRef {
    /// Creates an unqualified table reference.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            schema: None,
            name: String::from(name),
        }
    }

    /// Creates a schema-qualified table reference.
    #[must_use]
    pub fn qualified(schema: &str, name: &str) -> Self {
        Self {
            schema: Some(String::from(schema)),
            name: String::from(name),
        }
    }

    /// Returns the SQL representation.
    #[must_use]
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        dialect.quote_table(self.schema.as_deref(), &self.name)
    }
}

/// The right-hand side of a comparison, or an element of one.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A plain value.
    Value(SqlValue),
    /// A column reference.
    Column(ColumnRef),
    /// A function call.
    Fn {
        /// Function name, written as given.
        name: String,
        /// Arguments.
        args: Vec<Operand>,
    },
    /// `CAST(expr AS ty)`.
    Cast {
        /// Expression being cast.
        expr: Box<Operand>,
        /// Target type.
        ty: String,
    },
    /// Raw SQL.
    Literal(String),
    /// A list of operands.
    List(Vec<Operand>),
    /// `ANY (...)`.
    Any(Box<Operand>),
    /// `ALL (...)`.
    All(Box<Operand>),
    /// `VALUES (a), (b)`.
    Values(Vec<Operand>),
    /// An explicitly undefined value, always rejected.
    Undefined,
}

impl<T: ToSqlValue> From<T> for Operand {
    fn from(value: T) -> Self {
        Self::Value(value.to_sql_value())
    }
}

impl From<ColumnRef> for Operand {
    fn from(column: ColumnRef) -> Self {
        Self::Column(column)
    }
}

impl Operand {
    /// Creates a list operand.
    #[must_use]
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Self>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Wraps in `ANY (...)`.
    #[must_use]
    pub fn any(self) -> Self {
        Self::Any(Box::new(self))
    }

    /// Wraps in `ALL (...)`.
    #[must_use]
    pub fn all(self) -> Self {
        Self::All(Box::new(self))
    }

    /// Whether the operand is, or contains, an undefined value.
    #[must_use]
    pub fn contains_undefined(&self) -> bool {
        match self {
            Self::Undefined => true,
            Self::List(items) | Self::Values(items) | Self::Fn { args: items, .. } => {
                items.iter().any(Self::contains_undefined)
            }
            Self::Cast { expr, .. } | Self::Any(expr) | Self::All(expr) => {
                expr.contains_undefined()
            }
            Self::Value(_) | Self::Column(_) | Self::Literal(_) => false,
        }
    }

    /// Returns the plain value, if this is one.
    #[must_use]
    pub const fn as_value(&self) -> Option<&SqlValue> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the SQL representation.
    ///
    /// `hint` is the type of the attribute being compared. Lists render as
    /// array literals when the hint is an array type, and as a parenthesized
    /// list otherwise.
    pub fn to_sql(
        &self,
        dialect: &dyn Dialect,
        hint: Option<&DataType>,
        timezone: FixedOffset,
    ) -> Result<String> {
        match self {
            Self::Value(value) => value.to_sql(dialect, hint, timezone),
            Self::Column(column) => Ok(column.to_sql(dialect)),
            Self::Fn { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| arg.to_sql(dialect, None, timezone))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("{name}({})", args.join(", ")))
            }
            Self::Cast { expr, ty } => Ok(format!(
                "CAST({} AS {})",
                expr.to_sql(dialect, None, timezone)?,
                ty.to_uppercase()
            )),
            Self::Literal(sql) => Ok(sql.clone()),
            Self::List(items) => {
                if hint.is_some_and(DataType::is_array) && dialect.supports_arrays() {
                    let element = hint.and_then(DataType::element);
                    if items.is_empty() {
                        return SqlValue::Array(Vec::new()).to_sql(dialect, hint, timezone);
                    }
                    let rendered = items
                        .iter()
                        .map(|item| item.to_sql(dialect, element, timezone))
                        .collect::<Result<Vec<_>>>()?;
                    return Ok(format!("ARRAY[{}]", rendered.join(",")));
                }
                let rendered = items
                    .iter()
                    .map(|item| item.to_sql(dialect, hint, timezone))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("({})", rendered.join(", ")))
            }
            Self::Values(rows) => {
                let rendered = rows
                    .iter()
                    .map(|row| Ok(format!("({})", row.to_sql(dialect, hint, timezone)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("VALUES {}", rendered.join(", ")))
            }
            Self::Any(_) | Self::All(_) => Err(CompileError::InvalidOperand {
                op: "value",
                reason: String::from("ANY / ALL can only follow a comparison operator"),
            }),
            Self::Undefined => Err(CompileError::InvalidOperand {
                op: "value",
                reason: String::from("undefined"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn render(operand: &Operand) -> String {
        operand
            .to_sql(DialectKind::Mssql.policy(), None, utc())
            .unwrap()
    }

    #[test]
    fn test_column_ref() {
        let mssql = DialectKind::Mssql.policy();
        assert_eq!(ColumnRef::parse("name").to_sql(mssql), "[name]");
        assert_eq!(ColumnRef::parse("Task.name").to_sql(mssql), "[Task].[name]");
        assert_eq!(
            ColumnRef::parse("Task.Project.name").to_sql(mssql),
            "[Task->Project].[name]"
        );
        assert_eq!(ColumnRef::parse("User.*").to_sql(mssql), "[User].*");
    }

    #[test]
    fn test_function_and_cast() {
        assert_eq!(render(&func("UPPER", [col("col2")])), "UPPER([col2])");
        assert_eq!(render(&func("NOW", [])), "NOW()");
        assert_eq!(render(&cast(col("col"), "string")), "CAST([col] AS STRING)");
        assert_eq!(
            render(&func("to_tsvector", [Operand::from("swagger")])),
            "to_tsvector(N'swagger')"
        );
    }

    #[test]
    fn test_list_and_values() {
        assert_eq!(render(&Operand::list([1, 2])), "(1, 2)");
        let values = Operand::Values(vec![
            literal("literal"),
            func("UPPER", [col("col2")]),
            col("col3"),
            1.into(),
        ]);
        assert_eq!(
            render(&values),
            "VALUES (literal), (UPPER([col2])), ([col3]), (1)"
        );
    }

    #[test]
    fn test_list_as_array() {
        let hint = DataType::Array(Box::new(DataType::Integer));
        assert_eq!(
            Operand::list([1, 2])
                .to_sql(DialectKind::Postgres.policy(), Some(&hint), utc())
                .unwrap(),
            "ARRAY[1,2]"
        );
    }

    #[test]
    fn test_undefined_detection() {
        assert!(Operand::Undefined.contains_undefined());
        assert!(Operand::List(vec![1.into(), Operand::Undefined]).contains_undefined());
        assert!(!col("a").contains_undefined());
        assert!(
            Operand::from(1)
                .any()
                .to_sql(DialectKind::Postgres.policy(), None, utc())
                .is_err()
        );
    }
}

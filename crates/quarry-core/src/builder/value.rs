//! SQL values and their literal forms.
//!
//! Values are always inlined: each dialect policy decides how a value is
//! escaped, so user text can never terminate a literal early.

use chrono::{DateTime, FixedOffset, TimeZone};

use crate::dialect::{Dialect, range_type_name};
use crate::error::Result;
use crate::model::DataType;

/// A SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value, including the infinities.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// Timestamp with offset.
    Date(DateTime<FixedOffset>),
    /// JSON document.
    Json(serde_json::Value),
    /// Array of values.
    Array(Vec<SqlValue>),
    /// Range value.
    Range(Box<RangeValue>),
}

/// One end of a range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    /// The bound value.
    pub value: SqlValue,
    /// Whether the bound itself belongs to the range.
    pub inclusive: bool,
}

impl RangeBound {
    /// An inclusive bound.
    #[must_use]
    pub fn inclusive(value: impl ToSqlValue) -> Self {
        Self {
            value: value.to_sql_value(),
            inclusive: true,
        }
    }

    /// An exclusive bound.
    #[must_use]
    pub fn exclusive(value: impl ToSqlValue) -> Self {
        Self {
            value: value.to_sql_value(),
            inclusive: false,
        }
    }
}

/// A range: either empty, or two optional bounds (`None` is unbounded).
#[derive(Debug, Clone, PartialEq)]
pub enum RangeValue {
    /// The empty range.
    Empty,
    /// A bounded or half-bounded range.
    Bounds {
        /// Lower bound.
        lower: Option<RangeBound>,
        /// Upper bound.
        upper: Option<RangeBound>,
    },
}

impl RangeValue {
    /// Half-open range `[lower, upper)`, the default bound inclusivity.
    #[must_use]
    pub fn half_open(lower: impl ToSqlValue, upper: impl ToSqlValue) -> Self {
        Self::from_bounds(lower.to_sql_value(), upper.to_sql_value())
    }

    /// Builds a half-open range where `Null` means unbounded.
    #[must_use]
    pub fn from_bounds(lower: SqlValue, upper: SqlValue) -> Self {
        let bound = |value: SqlValue, inclusive| {
            if value == SqlValue::Null {
                None
            } else {
                Some(RangeBound { value, inclusive })
            }
        };
        Self::Bounds {
            lower: bound(lower, true),
            upper: bound(upper, false),
        }
    }

    /// Guesses the range subtype from the bound values.
    fn inferred_subtype(&self) -> DataType {
        let Self::Bounds { lower, upper } = self else {
            return DataType::Integer;
        };
        let values = lower.iter().chain(upper.iter()).map(|b| &b.value);
        for value in values {
            match value {
                SqlValue::Date(_) => return DataType::Date,
                SqlValue::Float(f) if f.is_finite() => return DataType::Decimal,
                _ => {}
            }
        }
        DataType::Integer
    }
}

fn range_bound_text(dialect: &dyn Dialect, value: &SqlValue, timezone: FixedOffset) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Float(f) if f.is_infinite() => {
            if f.is_sign_negative() {
                String::from("-infinity")
            } else {
                String::from("infinity")
            }
        }
        SqlValue::Date(d) => dialect.format_date(d, timezone),
        SqlValue::Text(s) => s.clone(),
        SqlValue::Int(n) => n.to_string(),
        SqlValue::Float(f) => f.to_string(),
        other => other.to_sql_plain(),
    }
}

impl SqlValue {
    /// Renders the value as an inline literal for `dialect`.
    ///
    /// `hint` is the type of the attribute the value is compared with; it picks
    /// typed empty arrays, range types and date-only formatting. Dates are shown
    /// in `timezone`.
    pub fn to_sql(
        &self,
        dialect: &dyn Dialect,
        hint: Option<&DataType>,
        timezone: FixedOffset,
    ) -> Result<String> {
        match self {
            Self::Null => Ok(String::from("NULL")),
            Self::Bool(b) => Ok(dialect.bool_literal(*b).to_string()),
            Self::Int(n) => Ok(n.to_string()),
            Self::Float(f) => Ok(if f.is_nan() {
                dialect.quote_string("NaN")
            } else if f.is_infinite() {
                let text = if f.is_sign_negative() {
                    "-Infinity"
                } else {
                    "Infinity"
                };
                dialect.quote_string(text)
            } else {
                f.to_string()
            }),
            Self::Text(s) => Ok(dialect.quote_string(s)),
            Self::Blob(bytes) => Ok(dialect.blob_literal(bytes)),
            Self::Date(d) => {
                if hint == Some(&DataType::DateOnly) {
                    let local = d.with_timezone(&timezone);
                    Ok(dialect.quote_string(&local.format("%Y-%m-%d").to_string()))
                } else {
                    Ok(dialect.quote_string(&dialect.format_date(d, timezone)))
                }
            }
            Self::Json(value) => Ok(dialect.quote_string(&value.to_string())),
            Self::Array(items) => {
                if !dialect.supports_arrays() {
                    return Err(dialect.unsupported("array literals"));
                }
                let element = hint.and_then(DataType::element);
                if items.is_empty() {
                    return Ok(match element {
                        Some(dt) => format!("ARRAY[]::{}[]", dialect.data_type_name(dt)),
                        None => String::from("ARRAY[]"),
                    });
                }
                let rendered = items
                    .iter()
                    .map(|item| item.to_sql(dialect, element, timezone))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("ARRAY[{}]", rendered.join(",")))
            }
            Self::Range(range) => {
                if !dialect.supports_ranges() {
                    return Err(dialect.unsupported("range literals"));
                }
                let subtype = hint
                    .and_then(DataType::element)
                    .cloned()
                    .unwrap_or_else(|| range.inferred_subtype());
                let range_type = range_type_name(&subtype);
                let body = match range.as_ref() {
                    RangeValue::Empty => String::from("empty"),
                    RangeValue::Bounds { lower, upper } => {
                        let open = match lower {
                            Some(bound) if !bound.inclusive => '(',
                            _ => '[',
                        };
                        let close = match upper {
                            Some(bound) if bound.inclusive => ']',
                            _ => ')',
                        };
                        let text = |bound: &Option<RangeBound>| {
                            bound.as_ref().map_or_else(String::new, |b| {
                                range_bound_text(dialect, &b.value, timezone)
                            })
                        };
                        format!("{open}{},{}{close}", text(lower), text(upper))
                    }
                };
                Ok(format!("{}::{range_type}", dialect.quote_string(&body)))
            }
        }
    }

    /// Dialect-independent rendering used inside range bodies.
    fn to_sql_plain(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Json(v) => v.to_string(),
            Self::Blob(_) | Self::Date(_) | Self::Array(_) | Self::Range(_) => format!("{self:?}"),
        }
    }

    /// Converts a JSON scalar. `{"$date": ".."}` becomes a timestamp; other
    /// objects and arrays stay JSON documents.
    #[must_use]
    pub fn from_json_scalar(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            Value::String(s) => Self::Text(s.clone()),
            Value::Object(map) => match map.get("$date").and_then(Value::as_str) {
                Some(text) if map.len() == 1 => DateTime::parse_from_rfc3339(text)
                    .map_or_else(|_| Self::Json(value.clone()), Self::Date),
                _ => Self::Json(value.clone()),
            },
            Value::Array(_) => Self::Json(value.clone()),
        }
    }

    /// Whether the value is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the cast a JSON extraction needs before comparing with this value.
    #[must_use]
    pub const fn json_cast(&self) -> Option<&'static str> {
        match self {
            Self::Int(_) | Self::Float(_) => Some("double precision"),
            Self::Bool(_) => Some("boolean"),
            Self::Date(_) => Some("timestamptz"),
            _ => None,
        }
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl<Tz: TimeZone> ToSqlValue for DateTime<Tz> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Date(self.fixed_offset())
    }
}

impl ToSqlValue for serde_json::Value {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Json(self)
    }
}

impl ToSqlValue for RangeValue {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Range(Box::new(self))
    }
}

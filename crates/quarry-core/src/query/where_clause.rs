//! Where-tree compilation.

use chrono::{FixedOffset, Offset, Utc};
use tracing::debug;

use super::condition::{Condition, GroupKind, Predicate};
use super::json;
use super::operator::Op;
use crate::builder::value::{RangeBound, RangeValue, SqlValue};
use crate::builder::{ColumnRef, Operand, TableRef};
use crate::dialect::Dialect;
use crate::error::{CompileError, Result};
use crate::model::{DataType, Model, ModelGraph};

/// Per-call compilation context.
#[derive(Debug, Clone)]
pub struct CompileOptions<'a> {
    /// Table or alias qualifying plain attribute columns.
    pub prefix: Option<TableRef>,
    /// Model whose attributes the keys name.
    pub model: Option<&'a Model>,
    /// Graph used to follow associations.
    pub graph: Option<&'a ModelGraph>,
    /// Offset dates are rendered in.
    pub timezone: FixedOffset,
}

impl Default for CompileOptions<'_> {
    fn default() -> Self {
        Self {
            prefix: None,
            model: None,
            graph: None,
            timezone: Utc.fix(),
        }
    }
}

impl<'a> CompileOptions<'a> {
    /// Creates options with no prefix, no model and UTC dates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Qualifies plain attribute columns with `prefix`.
    #[must_use]
    pub fn prefix(mut self, prefix: TableRef) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Resolves attribute keys against `model`.
    #[must_use]
    pub const fn model(mut self, model: &'a Model) -> Self {
        self.model = Some(model);
        self
    }

    /// Follows associations through `graph`.
    #[must_use]
    pub const fn graph(mut self, graph: &'a ModelGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Renders dates in `timezone`.
    #[must_use]
    pub const fn timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }
}

/// Compiles a where tree to a boolean SQL fragment, without the `WHERE`
/// keyword. An empty tree compiles to an empty string.
pub fn compile_where(
    condition: &Condition,
    options: &CompileOptions<'_>,
    dialect: &dyn Dialect,
) -> Result<String> {
    let sql = WhereCompiler { dialect, options }.condition(condition)?;
    debug!(dialect = dialect.name(), sql = %sql, "compiled where clause");
    Ok(sql)
}

/// Joins fragments with a logical operator.
///
/// Empty fragments are dropped and a single survivor is returned as is.
/// Otherwise every fragment that itself contains `AND` / `OR` is parenthesized.
pub(crate) fn join_with_logical_operator(parts: Vec<String>, joiner: &str) -> String {
    let mut parts: Vec<String> = parts.into_iter().filter(|p| !p.is_empty()).collect();
    if parts.len() <= 1 {
        return parts.pop().unwrap_or_default();
    }
    parts
        .into_iter()
        .map(|part| {
            let upper = part.to_ascii_uppercase();
            if upper.contains(" AND ") || upper.contains(" OR ") {
                format!("({part})")
            } else {
                part
            }
        })
        .collect::<Vec<_>>()
        .join(joiner)
}

/// Renders a group from its compiled children.
///
/// A group without children matches nothing. When every child compiled to
/// nothing, an AND group places no restriction while OR and NOT still match
/// nothing.
fn group_sql(kind: GroupKind, parts: Vec<String>) -> String {
    let childless = parts.is_empty();
    let joined = join_with_logical_operator(parts, kind.joiner());
    if joined.is_empty() {
        return match kind {
            GroupKind::And if !childless => String::new(),
            _ => String::from("0 = 1"),
        };
    }
    match kind {
        GroupKind::Not => format!("NOT ({joined})"),
        GroupKind::And | GroupKind::Or => joined,
    }
}

/// Resolves a dotted `a.b.c` reference through associations, mapping the
/// final attribute to its column when the models are known. The result is not
/// qualified by the prefix.
pub(crate) fn resolve_reference(
    dialect: &dyn Dialect,
    options: &CompileOptions<'_>,
    reference: &str,
) -> (String, Option<DataType>) {
    let mut column = ColumnRef::parse(reference);
    let mut data_type = None;
    if let Some(mut current) = options.model {
        if let Some((last, hops)) = column.path.split_last_mut() {
            let mut reachable = true;
            for hop in hops.iter() {
                let next = current
                    .association(hop)
                    .and_then(|assoc| options.graph?.model(&assoc.target).ok());
                match next {
                    Some(model) => current = model,
                    None => {
                        reachable = false;
                        break;
                    }
                }
            }
            if reachable {
                if let Some(attribute) = current.attribute(last) {
                    data_type = Some(attribute.data_type.clone());
                    *last = attribute.field_name().to_string();
                }
            }
        }
    }
    (column.to_sql(dialect), data_type)
}

/// The left-hand side of a predicate.
#[derive(Debug, Clone)]
struct Target<'k> {
    key: &'k str,
    column: String,
    data_type: Option<DataType>,
    path: Vec<String>,
    cast: Option<String>,
}

impl Target<'_> {
    /// Type hint for values compared with this target.
    fn value_hint(&self) -> Option<&DataType> {
        if self.path.is_empty() {
            self.data_type.as_ref()
        } else {
            None
        }
    }

    fn is_array(&self) -> bool {
        self.value_hint().is_some_and(DataType::is_array)
    }
}

struct WhereCompiler<'a> {
    dialect: &'a dyn Dialect,
    options: &'a CompileOptions<'a>,
}

impl WhereCompiler<'_> {
    fn condition(&self, condition: &Condition) -> Result<String> {
        match condition {
            Condition::Attribute { key, predicate } => {
                let target = self.resolve_key(key)?;
                self.predicate(&target, predicate)
            }
            Condition::Group { kind, children } => {
                let parts = children
                    .iter()
                    .map(|child| self.condition(child))
                    .collect::<Result<Vec<_>>>()?;
                Ok(group_sql(*kind, parts))
            }
            Condition::All(children) => {
                let parts = children
                    .iter()
                    .map(|child| self.condition(child))
                    .collect::<Result<Vec<_>>>()?;
                Ok(join_with_logical_operator(parts, " AND "))
            }
            Condition::Raw(sql) => Ok(sql.clone()),
        }
    }

    fn qualify(&self, field: &str) -> String {
        let column = self.dialect.quote_identifier(field);
        match &self.options.prefix {
            Some(prefix) => format!("{}.{column}", prefix.to_sql(self.dialect)),
            None => column,
        }
    }

    fn resolve_key<'k>(&self, key: &'k str) -> Result<Target<'k>> {
        let (body, cast) = json::split_cast(key);
        let cast = cast.map(String::from);

        if let Some((reference, tail)) = body
            .strip_prefix('$')
            .and_then(|rest| rest.split_once('$'))
        {
            let (column, data_type) = resolve_reference(self.dialect, self.options, reference);
            return Ok(Target {
                key,
                column,
                data_type,
                path: json::path_segments(tail),
                cast,
            });
        }

        let (root, tail) = body.split_once('.').unwrap_or((body, ""));
        let attribute = self.options.model.and_then(|m| m.attribute(root));
        if !tail.is_empty() {
            let is_json = match (self.options.model, attribute) {
                (None, _) => self.dialect.supports_json(),
                (Some(_), Some(attribute)) => attribute.data_type.is_json(),
                (Some(_), None) => false,
            };
            if !is_json {
                let (column, data_type) = resolve_reference(self.dialect, self.options, body);
                return Ok(Target {
                    key,
                    column,
                    data_type,
                    path: Vec::new(),
                    cast,
                });
            }
        }

        let field = attribute.map_or(root, |a| a.field_name());
        Ok(Target {
            key,
            column: self.qualify(field),
            data_type: attribute.map(|a| a.data_type.clone()),
            path: json::path_segments(tail),
            cast,
        })
    }

    fn predicate(&self, target: &Target<'_>, predicate: &Predicate) -> Result<String> {
        match predicate {
            Predicate::Value(operand) => {
                let op = match operand {
                    Operand::List(_) if !target.is_array() => Op::In,
                    _ => Op::Eq,
                };
                self.operator(target, op, operand)
            }
            Predicate::Op(op, operand) => self.operator(target, *op, operand),
            Predicate::Group { kind, children } => {
                let parts = children
                    .iter()
                    .map(|child| self.predicate(target, child))
                    .collect::<Result<Vec<_>>>()?;
                Ok(group_sql(*kind, parts))
            }
            Predicate::All(children) => {
                let parts = children
                    .iter()
                    .map(|child| self.predicate(target, child))
                    .collect::<Result<Vec<_>>>()?;
                Ok(join_with_logical_operator(parts, " AND "))
            }
            Predicate::Json {
                path,
                cast,
                predicate,
            } => {
                if target.path.is_empty()
                    && target.data_type.as_ref().is_some_and(|dt| !dt.is_json())
                {
                    return Err(CompileError::InvalidWhere(format!(
                        "\"{}\" is not a JSON attribute and cannot be traversed",
                        target.key
                    )));
                }
                let mut nested = target.clone();
                nested.path.extend(path.iter().cloned());
                if cast.is_some() {
                    nested.cast.clone_from(cast);
                }
                self.predicate(&nested, predicate)
            }
        }
    }

    fn lhs(&self, target: &Target<'_>, operand: &Operand) -> Result<String> {
        if target.path.is_empty() {
            return Ok(match &target.cast {
                Some(cast) => format!("CAST({} AS {})", target.column, cast.to_uppercase()),
                None => target.column.clone(),
            });
        }
        json::extract(
            self.dialect,
            &target.column,
            &target.path,
            target.cast.as_deref(),
            json::inferred_cast(operand),
        )
    }

    /// Left-hand side for text matching: non-text columns are cast to text.
    fn text_lhs(&self, target: &Target<'_>, operand: &Operand) -> Result<String> {
        let needs_cast = target.path.is_empty()
            && target.cast.is_none()
            && target
                .data_type
                .as_ref()
                .is_some_and(|dt| !dt.is_textual() && !dt.is_json());
        if needs_cast {
            return Ok(format!(
                "CAST({} AS {})",
                target.column,
                self.dialect.cast_type("text")
            ));
        }
        self.lhs(target, operand)
    }

    fn render(&self, operand: &Operand, hint: Option<&DataType>) -> Result<String> {
        operand.to_sql(self.dialect, hint, self.options.timezone)
    }

    fn invalid(op: Op, reason: &str) -> CompileError {
        CompileError::InvalidOperand {
            op: op.name(),
            reason: reason.to_string(),
        }
    }

    fn operator(&self, target: &Target<'_>, op: Op, operand: &Operand) -> Result<String> {
        if operand.contains_undefined() {
            return Err(CompileError::UndefinedValue {
                key: target.key.to_string(),
            });
        }
        let hint = target.value_hint();

        match op {
            Op::Eq | Op::Ne => {
                let lhs = self.lhs(target, operand)?;
                match operand {
                    Operand::Value(SqlValue::Null) => {
                        let test = if op == Op::Eq { "IS NULL" } else { "IS NOT NULL" };
                        Ok(format!("{lhs} {test}"))
                    }
                    Operand::Any(inner) | Operand::All(inner) => {
                        self.any_all(&lhs, op.symbol(), operand, inner, hint)
                    }
                    Operand::List(_) if !target.is_array() => Err(Self::invalid(
                        op,
                        "a list can only be compared with an array attribute",
                    )),
                    _ => Ok(format!("{lhs} {} {}", op.symbol(), self.render(operand, hint)?)),
                }
            }
            Op::Is | Op::IsNot => match operand {
                Operand::Value(SqlValue::Null | SqlValue::Bool(_)) | Operand::Literal(_) => {
                    let lhs = self.lhs(target, operand)?;
                    Ok(format!("{lhs} {} {}", op.symbol(), self.render(operand, hint)?))
                }
                _ => Err(CompileError::InvalidIsOperand),
            },
            Op::Not => match operand {
                Operand::Value(SqlValue::Null | SqlValue::Bool(_)) | Operand::Literal(_) => {
                    self.operator(target, Op::IsNot, operand)
                }
                Operand::List(_) => self.operator(target, Op::NotIn, operand),
                Operand::Any(inner) | Operand::All(inner) => {
                    let lhs = self.lhs(target, operand)?;
                    self.any_all(&lhs, op.symbol(), operand, inner, hint)
                }
                _ => {
                    let lhs = self.lhs(target, operand)?;
                    Ok(format!("{lhs} != {}", self.render(operand, hint)?))
                }
            },
            Op::Gt | Op::Gte | Op::Lt | Op::Lte => {
                let lhs = self.lhs(target, operand)?;
                match operand {
                    Operand::Value(SqlValue::Null) => Err(CompileError::NullComparison {
                        key: target.key.to_string(),
                        op: op.name(),
                    }),
                    Operand::Any(inner) | Operand::All(inner) => {
                        self.any_all(&lhs, op.symbol(), operand, inner, hint)
                    }
                    Operand::List(_) | Operand::Values(_) => {
                        Err(Self::invalid(op, "expects a single value"))
                    }
                    _ => Ok(format!("{lhs} {} {}", op.symbol(), self.render(operand, hint)?)),
                }
            }
            Op::Between | Op::NotBetween => match operand {
                Operand::List(bounds) if bounds.len() == 2 => {
                    let lhs = self.lhs(target, operand)?;
                    Ok(format!(
                        "{lhs} {} {} AND {}",
                        op.symbol(),
                        self.render(&bounds[0], hint)?,
                        self.render(&bounds[1], hint)?
                    ))
                }
                Operand::List(bounds) => Err(CompileError::BetweenArity {
                    key: target.key.to_string(),
                    op: op.name(),
                    len: bounds.len(),
                }),
                _ => Err(CompileError::BetweenArity {
                    key: target.key.to_string(),
                    op: op.name(),
                    len: 1,
                }),
            },
            Op::In | Op::NotIn => match operand {
                Operand::List(items) if items.is_empty() => Ok(if op == Op::In {
                    format!("{} IN (NULL)", self.lhs(target, operand)?)
                } else {
                    String::new()
                }),
                Operand::List(items) => {
                    let lhs = self.lhs(target, operand)?;
                    let rendered = items
                        .iter()
                        .map(|item| self.render(item, hint))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(format!("{lhs} {} ({})", op.symbol(), rendered.join(", ")))
                }
                Operand::Literal(sql) => {
                    let lhs = self.lhs(target, operand)?;
                    Ok(format!("{lhs} {} {sql}", op.symbol()))
                }
                _ => Err(Self::invalid(op, "expects a list or a literal")),
            },
            Op::Like | Op::NotLike | Op::ILike | Op::NotILike => {
                if matches!(op, Op::ILike | Op::NotILike) && !self.dialect.supports_ilike() {
                    return Err(self.dialect.unsupported("ILIKE"));
                }
                let lhs = self.text_lhs(target, operand)?;
                match operand {
                    Operand::Any(inner) | Operand::All(inner) => {
                        self.any_all(&lhs, op.symbol(), operand, inner, None)
                    }
                    Operand::List(_) | Operand::Values(_) => {
                        Err(Self::invalid(op, "expects a single pattern"))
                    }
                    _ => Ok(format!("{lhs} {} {}", op.symbol(), self.render(operand, None)?)),
                }
            }
            Op::StartsWith
            | Op::EndsWith
            | Op::Substring
            | Op::NotStartsWith
            | Op::NotEndsWith
            | Op::NotSubstring => {
                let lhs = self.text_lhs(target, operand)?;
                let pattern = self.pattern(op, operand)?;
                Ok(format!("{lhs} {} {pattern}", op.symbol()))
            }
            Op::Regexp | Op::NotRegexp | Op::IRegexp | Op::NotIRegexp => {
                let negated = matches!(op, Op::NotRegexp | Op::NotIRegexp);
                let insensitive = matches!(op, Op::IRegexp | Op::NotIRegexp);
                let symbol = self
                    .dialect
                    .regexp_operator(negated, insensitive)
                    .ok_or_else(|| self.dialect.unsupported("regular expression matching"))?;
                let lhs = self.lhs(target, operand)?;
                match operand {
                    Operand::Any(inner) | Operand::All(inner) => {
                        self.any_all(&lhs, symbol, operand, inner, None)
                    }
                    Operand::List(_) | Operand::Values(_) => {
                        Err(Self::invalid(op, "expects a single pattern"))
                    }
                    _ => Ok(format!("{lhs} {symbol} {}", self.render(operand, None)?)),
                }
            }
            Op::Overlap | Op::Contains | Op::Contained => {
                if !self.dialect.supports_arrays() && !self.dialect.supports_ranges() {
                    return Err(self.dialect.unsupported("array and range operators"));
                }
                let lhs = self.lhs(target, operand)?;
                let rhs = self.container(op, operand, hint)?;
                Ok(format!("{lhs} {} {rhs}", op.symbol()))
            }
            Op::Adjacent
            | Op::StrictLeft
            | Op::StrictRight
            | Op::NoExtendLeft
            | Op::NoExtendRight => {
                if !self.dialect.supports_ranges() {
                    return Err(self.dialect.unsupported("range operators"));
                }
                let lhs = self.lhs(target, operand)?;
                let rhs = match operand {
                    Operand::List(items) => self.range(op, items, hint)?,
                    Operand::Value(SqlValue::Range(_)) | Operand::Literal(_) => {
                        self.render(operand, hint)?
                    }
                    _ => return Err(Self::invalid(op, "expects a range")),
                };
                Ok(format!("{lhs} {} {rhs}", op.symbol()))
            }
            Op::AnyKeyExists | Op::AllKeysExist => {
                if !self.dialect.supports_jsonb() {
                    return Err(self.dialect.unsupported("JSONB key existence operators"));
                }
                let lhs = self.lhs(target, operand)?;
                let rhs = match operand {
                    Operand::List(items) if items.is_empty() => String::from("ARRAY[]::text[]"),
                    Operand::List(items) => {
                        let keys = items
                            .iter()
                            .map(|item| self.render(item, None))
                            .collect::<Result<Vec<_>>>()?;
                        format!("ARRAY[{}]", keys.join(", "))
                    }
                    Operand::Value(SqlValue::Array(_))
                    | Operand::Column(_)
                    | Operand::Fn { .. }
                    | Operand::Cast { .. }
                    | Operand::Literal(_) => self.render(operand, None)?,
                    _ => return Err(Self::invalid(op, "expects a list of keys")),
                };
                Ok(format!("{lhs} {} {rhs}", op.symbol()))
            }
            Op::Match => {
                if !self.dialect.supports_full_text() {
                    return Err(self.dialect.unsupported("full-text match"));
                }
                let lhs = self.lhs(target, operand)?;
                match operand {
                    Operand::Fn { .. } | Operand::Literal(_) | Operand::Column(_) | Operand::Cast { .. } => {
                        Ok(format!("{lhs} @@ {}", self.render(operand, None)?))
                    }
                    Operand::Value(SqlValue::Text(_)) => {
                        Ok(format!("{lhs} @@ {}", self.render(operand, None)?))
                    }
                    _ => Err(Self::invalid(op, "expects a text search query")),
                }
            }
        }
    }

    /// `lhs op ANY (...)` / `lhs op ALL (...)`.
    fn any_all(
        &self,
        lhs: &str,
        symbol: &str,
        wrapper: &Operand,
        inner: &Operand,
        hint: Option<&DataType>,
    ) -> Result<String> {
        let keyword = if matches!(wrapper, Operand::All(_)) {
            "ALL"
        } else {
            "ANY"
        };
        let body = match inner {
            Operand::List(items) => self.array(items, hint)?,
            Operand::Value(SqlValue::Array(_))
            | Operand::Values(_)
            | Operand::Literal(_)
            | Operand::Column(_)
            | Operand::Fn { .. }
            | Operand::Cast { .. } => self.render(inner, hint)?,
            _ => {
                return Err(CompileError::InvalidOperand {
                    op: "any",
                    reason: String::from("expects an array, VALUES or a literal"),
                })
            }
        };
        Ok(format!("{lhs} {symbol} {keyword} ({body})"))
    }

    /// An array literal of `items`; `element` types an empty array.
    fn array(&self, items: &[Operand], element: Option<&DataType>) -> Result<String> {
        if !self.dialect.supports_arrays() {
            return Err(self.dialect.unsupported("array literals"));
        }
        let element = element.map(|dt| match dt {
            DataType::Array(inner) => inner.as_ref().clone(),
            other => other.clone(),
        });
        if items.is_empty() {
            let hint = element.map(|dt| DataType::Array(Box::new(dt)));
            return self.render(&Operand::Value(SqlValue::Array(Vec::new())), hint.as_ref());
        }
        let rendered = items
            .iter()
            .map(|item| self.render(item, element.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("ARRAY[{}]", rendered.join(",")))
    }

    /// A range literal from `[]` (empty) or `[lower, upper]`. Bounds may be
    /// `{"value": v, "inclusive": bool}` objects.
    fn range(&self, op: Op, items: &[Operand], hint: Option<&DataType>) -> Result<String> {
        if !self.dialect.supports_ranges() {
            return Err(self.dialect.unsupported("range literals"));
        }
        let range = match items {
            [] => RangeValue::Empty,
            [lower, upper] => RangeValue::Bounds {
                lower: Self::range_bound(op, lower, true)?,
                upper: Self::range_bound(op, upper, false)?,
            },
            _ => return Err(Self::invalid(op, "a range needs exactly 2 bounds")),
        };
        let hint = hint.map(|dt| match dt {
            DataType::Range(_) => dt.clone(),
            other => DataType::Range(Box::new(other.clone())),
        });
        self.render(&Operand::Value(SqlValue::Range(Box::new(range))), hint.as_ref())
    }

    fn range_bound(op: Op, bound: &Operand, inclusive: bool) -> Result<Option<RangeBound>> {
        let Operand::Value(value) = bound else {
            return Err(Self::invalid(op, "range bounds must be plain values"));
        };
        Ok(match value {
            SqlValue::Null => None,
            SqlValue::Json(serde_json::Value::Object(map)) if map.contains_key("value") => {
                let value = map
                    .get("value")
                    .map_or(SqlValue::Null, SqlValue::from_json_scalar);
                let inclusive = map
                    .get("inclusive")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(inclusive);
                (!value.is_null()).then_some(RangeBound { value, inclusive })
            }
            other => Some(RangeBound {
                value: other.clone(),
                inclusive,
            }),
        })
    }

    /// Right-hand side of `&&`, `@>` and `<@`.
    fn container(&self, op: Op, operand: &Operand, hint: Option<&DataType>) -> Result<String> {
        match operand {
            Operand::Literal(sql) => Ok(sql.clone()),
            Operand::List(items) => match hint {
                Some(DataType::Range(_)) => self.range(op, items, hint),
                Some(dt) if op == Op::Contained && !dt.is_array() && !dt.is_json() => {
                    self.range(op, items, hint)
                }
                _ => self.array(items, hint),
            },
            Operand::Value(value) => {
                let hint = match (value, hint) {
                    (SqlValue::Range(_), Some(dt)) if !dt.is_range() => {
                        Some(DataType::Range(Box::new(dt.clone())))
                    }
                    _ => hint.cloned(),
                };
                self.render(operand, hint.as_ref())
            }
            _ => Err(Self::invalid(op, "expects an array, a range or a literal")),
        }
    }

    /// The pattern of a LIKE derivative.
    fn pattern(&self, op: Op, operand: &Operand) -> Result<String> {
        let (before, after) = match op {
            Op::StartsWith | Op::NotStartsWith => ("", "%"),
            Op::EndsWith | Op::NotEndsWith => ("%", ""),
            _ => ("%", "%"),
        };
        match operand {
            Operand::Value(SqlValue::Text(text)) => {
                Ok(self.dialect.quote_string(&format!("{before}{text}{after}")))
            }
            Operand::Column(_) | Operand::Fn { .. } | Operand::Cast { .. } | Operand::Literal(_) => {
                let wildcard = self.dialect.quote_string("%");
                let mut parts = Vec::with_capacity(3);
                if !before.is_empty() {
                    parts.push(wildcard.clone());
                }
                parts.push(self.render(operand, None)?);
                if !after.is_empty() {
                    parts.push(wildcard);
                }
                Ok(format!("CONCAT({})", parts.join(", ")))
            }
            _ => Err(Self::invalid(op, "expects a string")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{col, func, literal};
    use crate::dialect::DialectKind;
    use crate::model::Attribute;

    fn model() -> Model {
        Model::new("User", "users")
            .with_attribute(Attribute::new("intAttr1", DataType::Integer))
            .with_attribute(Attribute::new("username", DataType::String))
            .with_attribute(Attribute::new("createdAt", DataType::Date).field("created_at"))
            .with_attribute(Attribute::new("jsonAttr", DataType::Jsonb))
            .with_attribute(Attribute::new(
                "intArrayAttr",
                DataType::Array(Box::new(DataType::Integer)),
            ))
            .with_attribute(Attribute::new(
                "intRangeAttr",
                DataType::Range(Box::new(DataType::Integer)),
            ))
    }

    fn compile(kind: DialectKind, condition: &Condition) -> Result<String> {
        let model = model();
        let options = CompileOptions::new().model(&model);
        compile_where(condition, &options, kind.policy())
    }

    fn mssql(condition: &Condition) -> String {
        compile(DialectKind::Mssql, condition).unwrap()
    }

    fn pg(condition: &Condition) -> String {
        compile(DialectKind::Postgres, condition).unwrap()
    }

    #[test]
    fn test_join_rule() {
        assert_eq!(join_with_logical_operator(vec![], " AND "), "");
        assert_eq!(
            join_with_logical_operator(vec!["a = 1".into(), String::new()], " AND "),
            "a = 1"
        );
        assert_eq!(
            join_with_logical_operator(vec!["a = 1".into(), "b = 2 OR c = 3".into()], " AND "),
            "a = 1 AND (b = 2 OR c = 3)"
        );
    }

    #[test]
    fn test_empty_groups() {
        assert_eq!(mssql(&Condition::All(vec![])), "");
        assert_eq!(mssql(&Condition::and_all([])), "0 = 1");
        assert_eq!(mssql(&Condition::or_all([])), "0 = 1");
        assert_eq!(
            mssql(&Condition::Group {
                kind: GroupKind::Not,
                children: vec![]
            }),
            "0 = 1"
        );
    }

    #[test]
    fn test_groups_whose_children_vanish() {
        let vanishing = || Condition::op("intAttr1", Op::NotIn, Operand::List(vec![]));
        assert_eq!(mssql(&vanishing()), "");
        assert_eq!(mssql(&Condition::and_all([vanishing()])), "");
        assert_eq!(
            mssql(&Condition::and_all([vanishing(), Condition::All(vec![])])),
            ""
        );
        assert_eq!(mssql(&Condition::or_all([vanishing()])), "0 = 1");
        assert_eq!(mssql(&vanishing().not()), "0 = 1");
        assert_eq!(
            mssql(&Condition::and_all([vanishing(), Condition::eq("intAttr1", 1)])),
            "[intAttr1] = 1"
        );
    }

    #[test]
    fn test_implicit_comparisons() {
        assert_eq!(mssql(&Condition::eq("intAttr1", 1)), "[intAttr1] = 1");
        assert_eq!(
            mssql(&Condition::eq("intAttr1", SqlValue::Null)),
            "[intAttr1] IS NULL"
        );
        assert_eq!(
            mssql(&Condition::attr(
                "intAttr1",
                Predicate::Value(Operand::list([1, 2]))
            )),
            "[intAttr1] IN (1, 2)"
        );
        assert_eq!(
            mssql(&Condition::eq("createdAt", "x")),
            "[created_at] = N'x'"
        );
    }

    #[test]
    fn test_prefix_qualifies_columns() {
        let model = model();
        let options = CompileOptions::new()
            .model(&model)
            .prefix(TableRef::new("User"));
        assert_eq!(
            compile_where(
                &Condition::eq("intAttr1", 1),
                &options,
                DialectKind::Mssql.policy()
            )
            .unwrap(),
            "[User].[intAttr1] = 1"
        );
        assert_eq!(
            compile_where(
                &Condition::eq("$intAttr1$", 1),
                &options,
                DialectKind::Mssql.policy()
            )
            .unwrap(),
            "[intAttr1] = 1"
        );
    }

    #[test]
    fn test_not_operator_forms() {
        assert_eq!(
            mssql(&Condition::op("intAttr1", Op::Not, SqlValue::Null)),
            "[intAttr1] IS NOT NULL"
        );
        assert_eq!(
            mssql(&Condition::op("intAttr1", Op::Not, true)),
            "[intAttr1] IS NOT 1"
        );
        assert_eq!(
            mssql(&Condition::op("intAttr1", Op::Not, 1)),
            "[intAttr1] != 1"
        );
        assert_eq!(
            mssql(&Condition::op("intAttr1", Op::Not, Operand::list([1, 2]))),
            "[intAttr1] NOT IN (1, 2)"
        );
    }

    #[test]
    fn test_is_rejects_values() {
        assert_eq!(
            compile(DialectKind::Mssql, &Condition::op("intAttr1", Op::Is, 1)),
            Err(CompileError::InvalidIsOperand)
        );
        assert_eq!(
            mssql(&Condition::op("intAttr1", Op::Is, literal("UNKNOWN"))),
            "[intAttr1] IS UNKNOWN"
        );
    }

    #[test]
    fn test_ordering_rejects_null() {
        assert!(matches!(
            compile(
                DialectKind::Postgres,
                &Condition::op("intAttr1", Op::Gt, SqlValue::Null)
            ),
            Err(CompileError::NullComparison { .. })
        ));
    }

    #[test]
    fn test_between_arity() {
        assert_eq!(
            mssql(&Condition::between("intAttr1", 1, 2)),
            "[intAttr1] BETWEEN 1 AND 2"
        );
        assert!(matches!(
            compile(
                DialectKind::Mssql,
                &Condition::op("intAttr1", Op::Between, Operand::list([1, 2, 3]))
            ),
            Err(CompileError::BetweenArity { len: 3, .. })
        ));
    }

    #[test]
    fn test_in_edge_cases() {
        assert_eq!(
            mssql(&Condition::op("intAttr1", Op::In, Operand::List(vec![]))),
            "[intAttr1] IN (NULL)"
        );
        assert_eq!(
            mssql(&Condition::op("intAttr1", Op::NotIn, Operand::List(vec![]))),
            ""
        );
        assert_eq!(
            mssql(&Condition::op("intAttr1", Op::In, literal("(SELECT 1)"))),
            "[intAttr1] IN (SELECT 1)"
        );
    }

    #[test]
    fn test_undefined_is_rejected() {
        assert_eq!(
            compile(
                DialectKind::Sqlite,
                &Condition::attr("foo", Predicate::Value(Operand::Undefined))
            ),
            Err(CompileError::UndefinedValue {
                key: "foo".to_string()
            })
        );
    }

    #[test]
    fn test_pattern_operators() {
        assert_eq!(
            mssql(&Condition::starts_with("username", "swagger")),
            "[username] LIKE N'swagger%'"
        );
        assert_eq!(
            mssql(&Condition::op("username", Op::NotEndsWith, "swagger")),
            "[username] NOT LIKE N'%swagger'"
        );
        assert_eq!(
            mssql(&Condition::op("username", Op::Substring, col("username"))),
            "[username] LIKE CONCAT(N'%', [username], N'%')"
        );
        assert_eq!(
            mssql(&Condition::ends_with("intAttr1", "id")),
            "CAST([intAttr1] AS TEXT) LIKE N'%id'"
        );
    }

    #[test]
    fn test_regexp_by_dialect() {
        let cond = Condition::op("username", Op::Regexp, "^sw");
        assert_eq!(pg(&cond), "\"username\" ~ '^sw'");
        assert_eq!(
            compile(DialectKind::Mysql, &cond).unwrap(),
            "`username` REGEXP '^sw'"
        );
        assert!(matches!(
            compile(DialectKind::Mssql, &cond),
            Err(CompileError::Unsupported { .. })
        ));
        assert!(compile(
            DialectKind::Mysql,
            &Condition::op("username", Op::IRegexp, "^sw")
        )
        .is_err());
    }

    #[test]
    fn test_any_values() {
        assert_eq!(
            pg(&Condition::op(
                "intAttr1",
                Op::Eq,
                Operand::list([2, 3, 4]).any()
            )),
            "\"intAttr1\" = ANY (ARRAY[2,3,4])"
        );
        assert_eq!(
            pg(&Condition::op(
                "intAttr1",
                Op::Eq,
                Operand::List(vec![]).any()
            )),
            "\"intAttr1\" = ANY (ARRAY[]::INTEGER[])"
        );
        assert_eq!(
            pg(&Condition::op(
                "intAttr1",
                Op::Eq,
                Operand::Values(vec![literal("literal"), func("UPPER", [col("col2")])]).any()
            )),
            "\"intAttr1\" = ANY (VALUES (literal), (UPPER(\"col2\")))"
        );
    }

    #[test]
    fn test_array_and_range_operators() {
        assert_eq!(
            pg(&Condition::op("intArrayAttr", Op::Overlap, Operand::list([1, 2]))),
            "\"intArrayAttr\" && ARRAY[1,2]"
        );
        assert_eq!(
            pg(&Condition::op("intRangeAttr", Op::Contains, 1)),
            "\"intRangeAttr\" @> 1"
        );
        assert_eq!(
            pg(&Condition::op("intAttr1", Op::Contained, Operand::list([1, 2]))),
            "\"intAttr1\" <@ '[1,2)'::int4range"
        );
        assert_eq!(
            pg(&Condition::op("intRangeAttr", Op::Adjacent, Operand::list([1, 2]))),
            "\"intRangeAttr\" -|- '[1,2)'::int4range"
        );
        assert!(compile(
            DialectKind::Mysql,
            &Condition::op("intArrayAttr", Op::Overlap, Operand::list([1, 2]))
        )
        .is_err());
    }

    #[test]
    fn test_key_existence() {
        assert_eq!(
            pg(&Condition::op(
                "jsonAttr",
                Op::AnyKeyExists,
                Operand::list(["a", "b"])
            )),
            "\"jsonAttr\" ?| ARRAY['a', 'b']"
        );
        assert_eq!(
            pg(&Condition::op(
                "jsonAttr",
                Op::AllKeysExist,
                Operand::List(vec![])
            )),
            "\"jsonAttr\" ?& ARRAY[]::text[]"
        );
    }

    #[test]
    fn test_json_paths() {
        assert_eq!(
            pg(&Condition::eq("jsonAttr.nested.attribute", "value")),
            "(\"jsonAttr\"#>>'{nested,attribute}') = 'value'"
        );
        assert_eq!(
            pg(&Condition::attr(
                "jsonAttr",
                Predicate::json(&["nested"], Predicate::op(Op::Gt, 4))
            )),
            "CAST((\"jsonAttr\"#>>'{nested}') AS DOUBLE PRECISION) > 4"
        );
        assert_eq!(
            pg(&Condition::eq("jsonAttr.nested::STRING", "x")),
            "CAST((\"jsonAttr\"#>>'{nested}') AS STRING) = 'x'"
        );
        assert!(matches!(
            compile(
                DialectKind::Postgres,
                &Condition::attr(
                    "intAttr1",
                    Predicate::json(&["nested"], Predicate::op(Op::Eq, 1))
                )
            ),
            Err(CompileError::InvalidWhere(_))
        ));
    }

    #[test]
    fn test_dotted_non_json_key_is_qualified_column() {
        assert_eq!(mssql(&Condition::eq("Task.name", "x")), "[Task].[name] = N'x'");
    }
}

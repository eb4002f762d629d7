//! JSON forms of where trees and order specs.
//!
//! Where trees:
//!
//! ```json
//! {
//!   "$or": [{ "name": "a" }, { "name": { "$startsWith": "b" } }],
//!   "age": { "$gte": 18, "$lt": 65 },
//!   "meta.flags.beta": true,
//!   "$Task.name$": { "$ne": null }
//! }
//! ```
//!
//! Objects and arrays are implicit conjunctions. `$and`, `$or` and `$not` are
//! explicit groups and are emitted before the attribute entries of the same
//! object. Operand escapes (`$col`, `$fn`, `$cast`, `$literal`, `$any`, `$all`,
//! `$values`, `$undefined`, `$date`, `$buffer`, `$number`) stand for values
//! JSON cannot express.
//!
//! Order specs are arrays whose entries are attribute names, token arrays
//! (`["Task", "name", "DESC"]`) or escapes (`$col`, `$literal`, `$fn`,
//! `$random`, `$model`, `$association`, `{"model": .., "as": ..}`).

use serde_json::{Map, Value};

use crate::builder::value::SqlValue;
use crate::builder::{ColumnRef, Operand};
use crate::error::{CompileError, Result};
use crate::query::{Condition, GroupKind, Op, OrderItem, OrderToken, Predicate};

const GROUP_KEYS: [(&str, GroupKind); 3] = [
    ("$and", GroupKind::And),
    ("$or", GroupKind::Or),
    ("$not", GroupKind::Not),
];

const OPERAND_ESCAPES: [&str; 11] = [
    "$col",
    "$fn",
    "$cast",
    "$literal",
    "$any",
    "$all",
    "$values",
    "$undefined",
    "$date",
    "$buffer",
    "$number",
];

fn group_kind(key: &str) -> Option<GroupKind> {
    GROUP_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
}

/// Whether `key` names an attribute through `$a.b$` rather than an operator.
fn is_dollar_reference(key: &str) -> bool {
    key.strip_prefix('$').is_some_and(|rest| rest.contains('$'))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Returns the operand escape key of a single-key object.
fn escape_key(map: &Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    map.keys()
        .next()
        .map(String::as_str)
        .filter(|key| OPERAND_ESCAPES.contains(key))
}

/// Parses a where tree.
pub fn where_from_json(value: &Value) -> Result<Condition> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(sql)) = map.get("$literal").filter(|_| map.len() == 1) {
                return Ok(Condition::Raw(sql.clone()));
            }
            where_object(map)
        }
        Value::Array(items) => Ok(Condition::All(
            items.iter().map(where_from_json).collect::<Result<_>>()?,
        )),
        other => Err(CompileError::InvalidWhere(format!(
            "expected an object, an array or a literal, got {}",
            describe(other)
        ))),
    }
}

fn where_object(map: &Map<String, Value>) -> Result<Condition> {
    let mut children = Vec::with_capacity(map.len());
    for (name, kind) in GROUP_KEYS {
        if let Some(value) = map.get(name) {
            children.push(Condition::Group {
                kind,
                children: group_children(value)?,
            });
        }
    }
    for (key, value) in map {
        if group_kind(key).is_some() {
            continue;
        }
        if key.starts_with('$') && !is_dollar_reference(key) {
            return Err(CompileError::InvalidWhere(format!(
                "{key} is not allowed here; only attributes, $and, $or and $not are"
            )));
        }
        children.push(Condition::Attribute {
            key: key.clone(),
            predicate: predicate_from_json(value)?,
        });
    }
    Ok(Condition::All(children))
}

/// Children of `$and` / `$or` / `$not`: one per array item, or one per entry
/// of an object.
fn group_children(value: &Value) -> Result<Vec<Condition>> {
    match value {
        Value::Array(items) => items.iter().map(where_from_json).collect(),
        Value::Object(map) if escape_key(map) == Some("$literal") => {
            Ok(vec![where_from_json(value)?])
        }
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                let mut single = Map::new();
                single.insert(key.clone(), value.clone());
                where_object(&single)
            })
            .collect(),
        other => Err(CompileError::InvalidWhere(format!(
            "a group expects an array or an object, got {}",
            describe(other)
        ))),
    }
}

/// Parses what an attribute must satisfy.
fn predicate_from_json(value: &Value) -> Result<Predicate> {
    let map = match value {
        Value::Object(map) if escape_key(map).is_none() && is_predicate_object(map) => map,
        _ => return Ok(Predicate::Value(operand_from_json(value)?)),
    };

    let mut children = Vec::with_capacity(map.len());
    for (name, kind) in GROUP_KEYS {
        let Some(inner) = map.get(name) else {
            continue;
        };
        // `$not` with a plain operand is the operator, not a group.
        if kind == GroupKind::Not && !is_predicate_value(inner) {
            children.push(Predicate::Op(Op::Not, operand_from_json(inner)?));
            continue;
        }
        children.push(Predicate::Group {
            kind,
            children: predicate_children(inner)?,
        });
    }
    for (key, inner) in map {
        if group_kind(key).is_some() {
            continue;
        }
        if key.starts_with('$') {
            let op: Op = key.parse()?;
            children.push(Predicate::Op(op, operator_operand(op, inner)?));
        } else {
            let (segment, cast) = match key.split_once("::") {
                Some((segment, cast)) => (segment, Some(cast.to_string())),
                None => (key.as_str(), None),
            };
            children.push(Predicate::Json {
                path: segment.split('.').map(String::from).collect(),
                cast,
                predicate: Box::new(predicate_from_json(inner)?),
            });
        }
    }
    Ok(match children.len() {
        1 => children.remove(0),
        _ => Predicate::All(children),
    })
}

/// Whether an object value holds operators or JSON path keys. Only the empty
/// object is compared as a document.
fn is_predicate_object(map: &Map<String, Value>) -> bool {
    !map.is_empty()
}

/// Whether `value` under `$not` holds operators or attributes to negate.
fn is_predicate_value(value: &Value) -> bool {
    match value {
        Value::Object(map) => escape_key(map).is_none() && is_predicate_object(map),
        Value::Array(items) => items.iter().all(Value::is_object),
        _ => false,
    }
}

fn predicate_children(value: &Value) -> Result<Vec<Predicate>> {
    match value {
        Value::Array(items) => items.iter().map(predicate_from_json).collect(),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                let mut single = Map::new();
                single.insert(key.clone(), value.clone());
                predicate_from_json(&Value::Object(single))
            })
            .collect(),
        other => Ok(vec![Predicate::Value(operand_from_json(other)?)]),
    }
}

/// Operand of an explicit operator. Objects are JSON documents here (for
/// `$contains` on JSONB), unless they are escapes or range bounds.
fn operator_operand(op: Op, value: &Value) -> Result<Operand> {
    if let Value::Object(map) = value {
        if escape_key(map).is_none() && map.keys().any(|key| key.starts_with('$')) {
            return Err(CompileError::InvalidOperand {
                op: op.name(),
                reason: String::from("operators cannot be nested inside an operator"),
            });
        }
    }
    operand_from_json(value)
}

/// Parses an operand.
pub fn operand_from_json(value: &Value) -> Result<Operand> {
    match value {
        Value::Array(items) => Ok(Operand::List(
            items.iter().map(operand_from_json).collect::<Result<_>>()?,
        )),
        Value::Object(map) => match escape_key(map) {
            Some(key) => escape_from_json(key, &map[key]),
            None => Ok(Operand::Value(SqlValue::Json(value.clone()))),
        },
        scalar => Ok(Operand::Value(SqlValue::from_json_scalar(scalar))),
    }
}

fn expect_str<'v>(escape: &'static str, value: &'v Value) -> Result<&'v str> {
    value.as_str().ok_or_else(|| CompileError::InvalidOperand {
        op: escape,
        reason: format!("expected a string, got {}", describe(value)),
    })
}

fn function_from_json(value: &Value) -> Result<(String, Vec<Operand>)> {
    let (name, args) = match value {
        Value::Array(items) => match items.split_first() {
            Some((name, args)) => (expect_str("$fn", name)?, args.to_vec()),
            None => {
                return Err(CompileError::InvalidOperand {
                    op: "$fn",
                    reason: String::from("missing function name"),
                })
            }
        },
        Value::Object(map) => (
            expect_str("$fn", map.get("name").unwrap_or(&Value::Null))?,
            map.get("args")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        ),
        Value::String(name) => (name.as_str(), Vec::new()),
        other => {
            return Err(CompileError::InvalidOperand {
                op: "$fn",
                reason: format!("expected a name and arguments, got {}", describe(other)),
            })
        }
    };
    let args = args
        .iter()
        .map(operand_from_json)
        .collect::<Result<Vec<_>>>()?;
    Ok((name.to_string(), args))
}

fn decode_hex(escape: &'static str, text: &str) -> Result<Vec<u8>> {
    let invalid = || CompileError::InvalidOperand {
        op: escape,
        reason: format!("{text:?} is not hexadecimal"),
    };
    if text.len() % 2 != 0 {
        return Err(invalid());
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            text.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(invalid)
        })
        .collect()
}

fn escape_from_json(key: &str, value: &Value) -> Result<Operand> {
    match key {
        "$col" => Ok(Operand::Column(ColumnRef::parse(expect_str("$col", value)?))),
        "$literal" => Ok(Operand::Literal(expect_str("$literal", value)?.to_string())),
        "$fn" => {
            let (name, args) = function_from_json(value)?;
            Ok(Operand::Fn { name, args })
        }
        "$cast" => match value.as_array().map(Vec::as_slice) {
            Some([expr, ty]) => Ok(Operand::Cast {
                expr: Box::new(operand_from_json(expr)?),
                ty: expect_str("$cast", ty)?.to_string(),
            }),
            _ => Err(CompileError::InvalidOperand {
                op: "$cast",
                reason: String::from("expected [value, type]"),
            }),
        },
        "$any" => Ok(Operand::Any(Box::new(operand_from_json(value)?))),
        "$all" => Ok(Operand::All(Box::new(operand_from_json(value)?))),
        "$values" => match value {
            Value::Array(rows) => Ok(Operand::Values(
                rows.iter().map(operand_from_json).collect::<Result<_>>()?,
            )),
            other => Err(CompileError::InvalidOperand {
                op: "$values",
                reason: format!("expected an array, got {}", describe(other)),
            }),
        },
        "$undefined" => Ok(Operand::Undefined),
        "$date" => {
            let text = expect_str("$date", value)?;
            chrono::DateTime::parse_from_rfc3339(text)
                .map(|date| Operand::Value(SqlValue::Date(date)))
                .map_err(|err| CompileError::InvalidOperand {
                    op: "$date",
                    reason: err.to_string(),
                })
        }
        "$buffer" => Ok(Operand::Value(SqlValue::Blob(decode_hex(
            "$buffer",
            expect_str("$buffer", value)?,
        )?))),
        "$number" => {
            let text = expect_str("$number", value)?;
            text.parse::<f64>()
                .map(|number| Operand::Value(SqlValue::Float(number)))
                .map_err(|err| CompileError::InvalidOperand {
                    op: "$number",
                    reason: err.to_string(),
                })
        }
        other => Err(CompileError::UnknownOperator(other.to_string())),
    }
}

/// Parses an order or group spec.
pub fn order_from_json(value: &Value) -> Result<Vec<OrderItem>> {
    match value {
        Value::Array(items) => items.iter().map(order_item_from_json).collect(),
        Value::Object(_) => Ok(vec![order_item_from_json(value)?]),
        _ => Err(CompileError::InvalidOrder),
    }
}

fn order_item_from_json(value: &Value) -> Result<OrderItem> {
    match value {
        Value::String(name) => Ok(OrderItem::attr(name)),
        Value::Array(tokens) => Ok(OrderItem::Path(
            tokens.iter().map(order_token_from_json).collect::<Result<_>>()?,
        )),
        Value::Object(map) => {
            if map.contains_key("raw") {
                return Err(CompileError::RawSyntax);
            }
            if map.get("$random").is_some_and(|v| v.as_bool() == Some(true)) {
                return Ok(OrderItem::Random);
            }
            match order_token_from_json(value)? {
                OrderToken::Expr(Operand::Column(column)) => Ok(OrderItem::Column(column)),
                OrderToken::Expr(Operand::Literal(sql)) => Ok(OrderItem::Literal(sql)),
                OrderToken::Expr(Operand::Fn { name, args }) => Ok(OrderItem::Fn { name, args }),
                token => Ok(OrderItem::Path(vec![token])),
            }
        }
        other => Err(CompileError::UnknownStructure(other.to_string())),
    }
}

fn order_token_from_json(value: &Value) -> Result<OrderToken> {
    match value {
        Value::String(name) => Ok(OrderToken::Name(name.clone())),
        Value::Object(map) => {
            if map.contains_key("raw") {
                return Err(CompileError::RawSyntax);
            }
            if let Some(name) = map.get("$model").and_then(Value::as_str) {
                return Ok(OrderToken::model(name));
            }
            if let Some(alias) = map.get("$association").and_then(Value::as_str) {
                return Ok(OrderToken::Association(alias.to_string()));
            }
            if let Some(name) = map.get("model").and_then(Value::as_str) {
                return Ok(OrderToken::Model {
                    name: name.to_string(),
                    alias: map.get("as").and_then(Value::as_str).map(String::from),
                });
            }
            match escape_key(map) {
                Some("$col" | "$literal" | "$fn" | "$cast") => {
                    Ok(OrderToken::Expr(operand_from_json(value)?))
                }
                _ => Err(CompileError::UnknownStructure(value.to_string())),
            }
        }
        other => Err(CompileError::UnknownStructure(other.to_string())),
    }
}

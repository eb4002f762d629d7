//! JSON path keys.

use crate::builder::Operand;
use crate::dialect::Dialect;
use crate::error::Result;

/// Splits a trailing `::type` cast off an attribute key.
pub(crate) fn split_cast(key: &str) -> (&str, Option<&str>) {
    match key.rsplit_once("::") {
        Some((body, cast)) if !cast.is_empty() && !cast.contains('.') => (body, Some(cast)),
        _ => (key, None),
    }
}

/// Splits a dotted path tail (`.a.b`) into segments.
pub(crate) fn path_segments(tail: &str) -> Vec<String> {
    tail.split('.')
        .filter(|segment| !segment.is_empty())
        .map(String::from)
        .collect()
}

/// The cast a JSON extraction needs so that it compares with `operand`.
pub(crate) fn inferred_cast(operand: &Operand) -> Option<&'static str> {
    match operand {
        Operand::Value(value) => value.json_cast(),
        Operand::List(items) => items.first().and_then(inferred_cast),
        Operand::Any(inner) | Operand::All(inner) => inferred_cast(inner),
        _ => None,
    }
}

/// Renders the extraction of `path` from the quoted `column`, cast if asked.
///
/// An explicit cast is written as given; an inferred one goes through the
/// dialect's cast mapping.
pub(crate) fn extract(
    dialect: &dyn Dialect,
    column: &str,
    path: &[String],
    explicit_cast: Option<&str>,
    inferred: Option<&str>,
) -> Result<String> {
    let extraction = dialect.json_path_extraction(column, path, false)?;
    Ok(match (explicit_cast, inferred) {
        (Some(cast), _) => format!("CAST({extraction} AS {})", cast.to_uppercase()),
        (None, Some(cast)) => format!("CAST({extraction} AS {})", dialect.cast_type(cast)),
        (None, None) => extraction,
    })
}

//! PostgreSQL dialect.

use super::{Dialect, DialectKind, hex};
use crate::error::Result;

/// PostgreSQL: arrays, ranges, JSONB and case-insensitive matching.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn escapes_nul(&self) -> bool {
        true
    }

    fn blob_literal(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'", hex(bytes))
    }

    fn supports_arrays(&self) -> bool {
        true
    }

    fn supports_ranges(&self) -> bool {
        true
    }

    fn supports_json(&self) -> bool {
        true
    }

    fn supports_jsonb(&self) -> bool {
        true
    }

    fn supports_ilike(&self) -> bool {
        true
    }

    fn supports_full_text(&self) -> bool {
        true
    }

    fn regexp_operator(&self, negated: bool, case_insensitive: bool) -> Option<&'static str> {
        Some(match (negated, case_insensitive) {
            (false, false) => "~",
            (true, false) => "!~",
            (false, true) => "~*",
            (true, true) => "!~*",
        })
    }

    fn json_path_extraction(&self, column: &str, path: &[String], as_json: bool) -> Result<String> {
        let operator = if as_json { "#>" } else { "#>>" };
        let elements: Vec<String> = path.iter().map(String::as_str).map(array_element).collect();
        let path = self.quote_string(&format!("{{{}}}", elements.join(",")));
        Ok(format!("({column}{operator}{path})"))
    }
}

/// Quotes one element of a text-array literal when it would otherwise be
/// read as a separator, a brace, NULL or trimmed whitespace.
fn array_element(segment: &str) -> String {
    let needs_quotes = segment.is_empty()
        || segment.eq_ignore_ascii_case("null")
        || segment
            .chars()
            .any(|c| matches!(c, ',' | '{' | '}' | '"' | '\\') || c.is_whitespace());
    if !needs_quotes {
        return segment.to_string();
    }
    let escaped = segment.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

//! SQLite dialect.

use super::{Dialect, DialectKind, dollar_path};
use crate::error::Result;

/// SQLite: backtick identifiers and numeric booleans.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn identifier_quotes(&self) -> (char, char) {
        ('`', '`')
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn supports_json(&self) -> bool {
        true
    }

    fn json_path_extraction(&self, column: &str, path: &[String], _as_json: bool) -> Result<String> {
        let path = self.quote_string(&dollar_path(path, false));
        Ok(format!("json_extract({column},{path})"))
    }

    fn supports_delete_limit(&self) -> bool {
        true
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (None, None | Some(0)) => String::new(),
            (Some(n), None | Some(0)) => format!(" LIMIT {n}"),
            (Some(n), Some(m)) => format!(" LIMIT {n} OFFSET {m}"),
            (None, Some(m)) => format!(" LIMIT -1 OFFSET {m}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_dialect() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.name(), "sqlite");
        assert_eq!(dialect.quote_identifier("users"), "`users`");
        assert_eq!(dialect.bool_literal(true), "1");
        assert_eq!(dialect.blob_literal(b"payload"), "X'7061796c6f6164'");
        assert!(!dialect.supports_ilike());
    }

    #[test]
    fn test_sqlite_json_extraction() {
        let path = vec!["items".to_string(), "0".to_string(), "name".to_string()];
        assert_eq!(
            SqliteDialect::new()
                .json_path_extraction("`data`", &path, false)
                .unwrap(),
            "json_extract(`data`,'$.items[0].name')"
        );
    }
}

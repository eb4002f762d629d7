//! MySQL and MariaDB dialects.

use super::{Dialect, DialectKind, LimitStyle, dollar_path};
use crate::error::Result;

/// Maps a cast target to what `CAST` accepts on the MySQL family.
fn mysql_cast_type(ty: &str) -> String {
    match ty.to_ascii_lowercase().as_str() {
        "timestamptz" | "timestamp" => "DATETIME".to_string(),
        "double precision" | "boolean" | "integer" | "float" | "bigint" => "DECIMAL".to_string(),
        "text" | "string" | "varchar" => "CHAR".to_string(),
        other => other.to_uppercase(),
    }
}

/// MySQL: backtick identifiers and backslash escapes.
#[derive(Debug, Default, Clone, Copy)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Mysql
    }

    fn identifier_quotes(&self) -> (char, char) {
        ('`', '`')
    }

    fn uses_backslash_escapes(&self) -> bool {
        true
    }

    fn escapes_nul(&self) -> bool {
        true
    }

    fn dates_include_offset(&self) -> bool {
        false
    }

    fn supports_json(&self) -> bool {
        true
    }

    fn regexp_operator(&self, negated: bool, case_insensitive: bool) -> Option<&'static str> {
        match (negated, case_insensitive) {
            (false, false) => Some("REGEXP"),
            (true, false) => Some("NOT REGEXP"),
            _ => None,
        }
    }

    fn json_path_extraction(&self, column: &str, path: &[String], as_json: bool) -> Result<String> {
        let path = self.quote_string(&dollar_path(path, true));
        let extract = format!("json_extract({column},{path})");
        Ok(if as_json {
            extract
        } else {
            format!("json_unquote({extract})")
        })
    }

    fn cast_type(&self, ty: &str) -> String {
        mysql_cast_type(ty)
    }

    fn random_function(&self) -> &'static str {
        "RAND()"
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitComma
    }

    fn supports_delete_limit(&self) -> bool {
        true
    }
}

/// MariaDB: MySQL with unquoted JSON path keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct MariadbDialect;

impl MariadbDialect {
    /// Creates a new MariaDB dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MariadbDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Mariadb
    }

    fn identifier_quotes(&self) -> (char, char) {
        ('`', '`')
    }

    fn uses_backslash_escapes(&self) -> bool {
        true
    }

    fn escapes_nul(&self) -> bool {
        true
    }

    fn dates_include_offset(&self) -> bool {
        false
    }

    fn supports_json(&self) -> bool {
        true
    }

    fn regexp_operator(&self, negated: bool, case_insensitive: bool) -> Option<&'static str> {
        MysqlDialect.regexp_operator(negated, case_insensitive)
    }

    fn json_path_extraction(&self, column: &str, path: &[String], as_json: bool) -> Result<String> {
        let path = self.quote_string(&dollar_path(path, false));
        let extract = format!("json_extract({column},{path})");
        Ok(if as_json {
            extract
        } else {
            format!("json_unquote({extract})")
        })
    }

    fn cast_type(&self, ty: &str) -> String {
        mysql_cast_type(ty)
    }

    fn random_function(&self) -> &'static str {
        "RAND()"
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitComma
    }

    fn supports_delete_limit(&self) -> bool {
        true
    }
}

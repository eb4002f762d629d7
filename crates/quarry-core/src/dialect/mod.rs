//! SQL dialect policies.
//!
//! Every engine quotes, escapes and renders literals slightly differently. All of
//! those differences live behind the [`Dialect`] trait so the compilers never
//! branch on a dialect name. A new engine is supported by adding one policy.

mod db2;
mod mssql;
mod mysql;
mod postgres;
mod snowflake;
mod sqlite;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

pub use db2::{Db2Dialect, IbmiDialect};
pub use mssql::MssqlDialect;
pub use mysql::{MariadbDialect, MysqlDialect};
pub use postgres::PostgresDialect;
pub use snowflake::SnowflakeDialect;
pub use sqlite::SqliteDialect;

use crate::error::{CompileError, Result};
use crate::model::DataType;

/// Identifies a target SQL engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// PostgreSQL.
    Postgres,
    /// MySQL.
    Mysql,
    /// MariaDB.
    Mariadb,
    /// Microsoft SQL Server.
    Mssql,
    /// SQLite.
    #[serde(alias = "sqlite3")]
    Sqlite,
    /// IBM Db2 for LUW.
    Db2,
    /// IBM Db2 for i.
    Ibmi,
    /// Snowflake.
    Snowflake,
}

static POSTGRES: PostgresDialect = PostgresDialect::new();
static MYSQL: MysqlDialect = MysqlDialect::new();
static MARIADB: MariadbDialect = MariadbDialect::new();
static MSSQL: MssqlDialect = MssqlDialect::new();
static SQLITE: SqliteDialect = SqliteDialect::new();
static DB2: Db2Dialect = Db2Dialect::new();
static IBMI: IbmiDialect = IbmiDialect::new();
static SNOWFLAKE: SnowflakeDialect = SnowflakeDialect::new();

impl DialectKind {
    /// All supported dialects.
    pub const ALL: [Self; 8] = [
        Self::Postgres,
        Self::Mysql,
        Self::Mariadb,
        Self::Mssql,
        Self::Sqlite,
        Self::Db2,
        Self::Ibmi,
        Self::Snowflake,
    ];

    /// Returns the policy object for this dialect.
    #[must_use]
    pub fn policy(self) -> &'static dyn Dialect {
        match self {
            Self::Postgres => &POSTGRES,
            Self::Mysql => &MYSQL,
            Self::Mariadb => &MARIADB,
            Self::Mssql => &MSSQL,
            Self::Sqlite => &SQLITE,
            Self::Db2 => &DB2,
            Self::Ibmi => &IBMI,
            Self::Snowflake => &SNOWFLAKE,
        }
    }

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
            Self::Mssql => "mssql",
            Self::Sqlite => "sqlite",
            Self::Db2 => "db2",
            Self::Ibmi => "ibmi",
            Self::Snowflake => "snowflake",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            "mariadb" => Ok(Self::Mariadb),
            "mssql" => Ok(Self::Mssql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "db2" => Ok(Self::Db2),
            "ibmi" => Ok(Self::Ibmi),
            "snowflake" => Ok(Self::Snowflake),
            other => Err(CompileError::UnknownDialect(other.to_string())),
        }
    }
}

/// How a dialect spells LIMIT / OFFSET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStyle {
    /// `LIMIT n OFFSET m`.
    LimitOffset,
    /// `LIMIT m, n`.
    LimitComma,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`.
    OffsetFetch,
    /// `FETCH FIRST n ROWS ONLY`, with `OFFSET m ROWS` in front when skipping.
    FetchFirst,
}

/// Trait for SQL dialect-specific behavior.
///
/// Defaults follow ANSI SQL (double-quoted identifiers, doubled single quotes,
/// `true`/`false` booleans); implementations override what their engine does
/// differently.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Returns the dialect identity.
    fn kind(&self) -> DialectKind;

    /// Returns the name of the dialect.
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Returns the opening and closing identifier quote characters.
    fn identifier_quotes(&self) -> (char, char) {
        ('"', '"')
    }

    /// Quotes an identifier. `*` is left untouched.
    fn quote_identifier(&self, name: &str) -> String {
        if name == "*" {
            return String::from("*");
        }
        let (open, close) = self.identifier_quotes();
        let escaped = name.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    /// Quotes a possibly schema-qualified table reference.
    fn quote_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(table)
            ),
            None => self.quote_identifier(table),
        }
    }

    /// Whether backslash escapes are used inside string literals.
    fn uses_backslash_escapes(&self) -> bool {
        false
    }

    /// Whether a NUL character is written as the two characters `\0`.
    fn escapes_nul(&self) -> bool {
        false
    }

    /// Prefix written before string literals (`N` for national strings).
    fn string_literal_prefix(&self) -> &'static str {
        ""
    }

    /// Escapes the body of a string literal.
    fn escape_string(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        for c in value.chars() {
            if self.uses_backslash_escapes() {
                match c {
                    '\0' => out.push_str("\\0"),
                    '\u{8}' => out.push_str("\\b"),
                    '\t' => out.push_str("\\t"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\u{1a}' => out.push_str("\\Z"),
                    '"' => out.push_str("\\\""),
                    '\'' => out.push_str("\\'"),
                    '\\' => out.push_str("\\\\"),
                    other => out.push(other),
                }
            } else {
                match c {
                    '\'' => out.push_str("''"),
                    '\0' if self.escapes_nul() => out.push_str("\\0"),
                    other => out.push(other),
                }
            }
        }
        out
    }

    /// Renders a complete string literal.
    fn quote_string(&self, value: &str) -> String {
        format!(
            "{}'{}'",
            self.string_literal_prefix(),
            self.escape_string(value)
        )
    }

    /// Renders a boolean literal.
    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "true"
        } else {
            "false"
        }
    }

    /// Whether rendered timestamps carry their UTC offset.
    fn dates_include_offset(&self) -> bool {
        true
    }

    /// Renders a timestamp body (unquoted) in the given offset.
    fn format_date(&self, value: &DateTime<FixedOffset>, timezone: FixedOffset) -> String {
        let local = value.with_timezone(&timezone);
        if self.dates_include_offset() {
            local.format("%Y-%m-%d %H:%M:%S%.3f %:z").to_string()
        } else {
            local.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
        }
    }

    /// Renders a binary literal.
    fn blob_literal(&self, bytes: &[u8]) -> String {
        format!("X'{}'", hex(bytes))
    }

    /// Whether native array literals exist.
    fn supports_arrays(&self) -> bool {
        false
    }

    /// Whether native range types exist.
    fn supports_ranges(&self) -> bool {
        false
    }

    /// Whether JSON path extraction is available.
    fn supports_json(&self) -> bool {
        false
    }

    /// Whether the JSONB key-existence operators exist.
    fn supports_jsonb(&self) -> bool {
        false
    }

    /// Whether `ILIKE` exists.
    fn supports_ilike(&self) -> bool {
        false
    }

    /// Whether the full-text match operator exists.
    fn supports_full_text(&self) -> bool {
        false
    }

    /// Returns the regular-expression operator, if any.
    fn regexp_operator(&self, negated: bool, case_insensitive: bool) -> Option<&'static str> {
        let _ = (negated, case_insensitive);
        None
    }

    /// Builds a JSON extraction expression over an already quoted column.
    ///
    /// `as_json` asks for a JSON-typed result rather than unquoted text.
    fn json_path_extraction(&self, column: &str, path: &[String], as_json: bool) -> Result<String> {
        let _ = (column, path, as_json);
        Err(self.unsupported("JSON path extraction"))
    }

    /// Maps the target of an implicit cast (JSON comparisons, text matching)
    /// to the dialect's spelling.
    fn cast_type(&self, ty: &str) -> String {
        ty.to_uppercase()
    }

    /// Returns the SQL name of a column type, used for typed empty arrays.
    fn data_type_name(&self, dt: &DataType) -> String {
        match dt {
            DataType::String => "VARCHAR(255)".to_string(),
            DataType::Text => "TEXT".to_string(),
            DataType::Integer => "INTEGER".to_string(),
            DataType::BigInt => "BIGINT".to_string(),
            DataType::Float => "REAL".to_string(),
            DataType::Double => "DOUBLE PRECISION".to_string(),
            DataType::Decimal => "DECIMAL".to_string(),
            DataType::Boolean => "BOOLEAN".to_string(),
            DataType::Date => "TIMESTAMP WITH TIME ZONE".to_string(),
            DataType::DateOnly => "DATE".to_string(),
            DataType::Json => "JSON".to_string(),
            DataType::Jsonb => "JSONB".to_string(),
            DataType::Blob => "BYTEA".to_string(),
            DataType::Uuid => "UUID".to_string(),
            DataType::Array(inner) => format!("{}[]", self.data_type_name(inner)),
            DataType::Range(inner) => range_type_name(inner).to_string(),
        }
    }

    /// Returns the random-ordering function call.
    fn random_function(&self) -> &'static str {
        "RANDOM()"
    }

    /// Returns how LIMIT and OFFSET are written.
    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitOffset
    }

    /// Whether DELETE accepts a LIMIT clause.
    fn supports_delete_limit(&self) -> bool {
        false
    }

    /// Renders the LIMIT/OFFSET tail of a SELECT, with a leading space.
    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (self.limit_style(), limit, offset) {
            (_, None, None | Some(0)) => String::new(),
            (LimitStyle::LimitOffset, Some(n), None | Some(0)) => format!(" LIMIT {n}"),
            (LimitStyle::LimitOffset, Some(n), Some(m)) => format!(" LIMIT {n} OFFSET {m}"),
            (LimitStyle::LimitOffset, None, Some(m)) => format!(" OFFSET {m}"),
            (LimitStyle::LimitComma, Some(n), None | Some(0)) => format!(" LIMIT {n}"),
            (LimitStyle::LimitComma, Some(n), Some(m)) => format!(" LIMIT {m}, {n}"),
            (LimitStyle::LimitComma, None, Some(m)) => format!(" LIMIT {m}, 18446744073709551615"),
            (LimitStyle::OffsetFetch, Some(n), offset) => {
                format!(" OFFSET {} ROWS FETCH NEXT {n} ROWS ONLY", offset.unwrap_or(0))
            }
            (LimitStyle::OffsetFetch | LimitStyle::FetchFirst, None, Some(m)) => {
                format!(" OFFSET {m} ROWS")
            }
            (LimitStyle::FetchFirst, Some(n), None | Some(0)) => {
                format!(" FETCH FIRST {n} ROWS ONLY")
            }
            (LimitStyle::FetchFirst, Some(n), Some(m)) => {
                format!(" OFFSET {m} ROWS FETCH NEXT {n} ROWS ONLY")
            }
        }
    }

    /// Whether the engine requires ORDER BY before OFFSET/FETCH.
    fn offset_requires_order(&self) -> bool {
        false
    }

    /// Builds the error returned when a feature cannot be expressed.
    fn unsupported(&self, feature: &'static str) -> CompileError {
        CompileError::Unsupported {
            dialect: self.name(),
            feature,
        }
    }
}

/// Returns the range type used for a range subtype.
#[must_use]
pub fn range_type_name(subtype: &DataType) -> &'static str {
    match subtype {
        DataType::BigInt => "int8range",
        DataType::Float | DataType::Double | DataType::Decimal => "numrange",
        DataType::Date => "tstzrange",
        DataType::DateOnly => "daterange",
        DataType::Range(inner) => range_type_name(inner),
        _ => "int4range",
    }
}

/// Lowercase hexadecimal encoding.
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Splits a JSON path into `$`-style segments, turning numeric segments into
/// array subscripts.
pub(crate) fn dollar_path(path: &[String], quote_keys: bool) -> String {
    let mut out = String::from("$");
    for segment in path {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            out.push_str(&format!("[{segment}]"));
        } else if quote_keys {
            let escaped = segment.replace('\\', "\\\\").replace('"', "\\\"");
            out.push_str(&format!(".\"{escaped}\""));
        } else {
            out.push('.');
            out.push_str(segment);
        }
    }
    out
}

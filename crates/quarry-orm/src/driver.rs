//! Raw driver errors, as handed over by the execution layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A raw database error before classification.
///
/// Every field except `message` is optional: drivers expose very different
/// amounts of metadata. mssql batches sub-errors for a single statement in
/// `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverError {
    /// Symbolic or SQLSTATE-like code (`23505`, `SQLITE_CONSTRAINT_UNIQUE`, `ER_DUP_ENTRY`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Numeric vendor error number (mysql, mariadb).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i64>,
    /// SQLSTATE, when reported apart from `code`.
    #[serde(alias = "sqlState", skip_serializing_if = "Option::is_none")]
    pub sql_state: Option<String>,
    /// Primary error message.
    #[serde(alias = "messagePrimary")]
    pub message: String,
    /// Secondary detail line (postgres `DETAIL`).
    #[serde(alias = "messageDetail", skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Constraint name, when the driver reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    /// Table name, when the driver reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// The statement that failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Batched sub-errors raised by the same statement.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<DriverError>,
}

impl DriverError {
    /// Creates an error carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Sets the code.
    #[must_use]
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the vendor error number.
    #[must_use]
    pub const fn errno(mut self, errno: i64) -> Self {
        self.errno = Some(errno);
        self
    }

    /// Sets the detail line.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the failing statement.
    #[must_use]
    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Appends a batched sub-error.
    #[must_use]
    pub fn with_error(mut self, error: Self) -> Self {
        self.errors.push(error);
        self
    }

    /// The code, falling back to the SQLSTATE.
    #[must_use]
    pub fn code_or_state(&self) -> Option<&str> {
        self.code.as_deref().or(self.sql_state.as_deref())
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code_or_state() {
            Some(code) => write!(f, "{code}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DriverError {}

/// Maps a SQLite extended result code to its symbolic name.
#[must_use]
pub const fn sqlite_code_name(code: i64) -> Option<&'static str> {
    Some(match code {
        5 => "SQLITE_BUSY",
        19 => "SQLITE_CONSTRAINT",
        275 => "SQLITE_CONSTRAINT_CHECK",
        517 => "SQLITE_BUSY_SNAPSHOT",
        787 => "SQLITE_CONSTRAINT_FOREIGNKEY",
        1299 => "SQLITE_CONSTRAINT_NOTNULL",
        1555 => "SQLITE_CONSTRAINT_PRIMARYKEY",
        1811 => "SQLITE_CONSTRAINT_TRIGGER",
        2067 => "SQLITE_CONSTRAINT_UNIQUE",
        _ => return None,
    })
}

impl From<&sqlx::Error> for DriverError {
    fn from(err: &sqlx::Error) -> Self {
        let sqlx::Error::Database(db) = err else {
            return Self::new(err.to_string());
        };

        let is_sqlite = db
            .try_downcast_ref::<sqlx::sqlite::SqliteError>()
            .is_some();
        let code = db.code().map(|code| {
            code.parse::<i64>()
                .ok()
                .filter(|_| is_sqlite)
                .and_then(sqlite_code_name)
                .map_or_else(|| code.to_string(), String::from)
        });

        Self {
            code,
            message: db.message().to_string(),
            constraint: db.constraint().map(String::from),
            table: db.table().map(String::from),
            ..Self::default()
        }
    }
}

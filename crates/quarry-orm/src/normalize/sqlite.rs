//! SQLite: classification by result code and message text.
//!
//! SQLite reports strictly less than the server dialects: no constraint
//! name for unique violations and nothing at all for foreign keys.

use std::sync::LazyLock;

use quarry_core::Model;
use regex::Regex;

use super::{group, unique_error, ErrorClassifier};
use crate::constraint::{ConstraintError, ConstraintKind, FieldValue, NormalizedError};
use crate::driver::DriverError;

static CHECK_FAILED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CHECK constraint failed: (.+)").expect("Invalid check pattern"));
static NOT_UNIQUE_COLUMNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"columns (.*?) are").expect("Invalid legacy unique pattern"));
static UNIQUE_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"UNIQUE constraint failed: (.*)").expect("Invalid unique pattern")
});

/// Classifies errors from SQLite drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteClassifier;

impl SqliteClassifier {
    fn constraint(err: &DriverError, model: Option<&Model>) -> ConstraintError {
        let code = err.code.as_deref().unwrap_or_default();
        if code == "SQLITE_CONSTRAINT_FOREIGNKEY"
            || err.message.contains("FOREIGN KEY constraint failed")
        {
            return ConstraintError::new(ConstraintKind::ForeignKey, err.clone());
        }
        if code == "SQLITE_CONSTRAINT_CHECK" || err.message.contains("CHECK constraint failed") {
            let index = CHECK_FAILED.captures(&err.message)
                .and_then(|caps| group(&caps, 1));
            return ConstraintError::new(ConstraintKind::Check, err.clone()).index(index);
        }
        if code == "SQLITE_CONSTRAINT_NOTNULL" || code == "SQLITE_CONSTRAINT_TRIGGER" {
            return ConstraintError::database(err.clone());
        }
        Self::unique(err, model)
    }

    fn unique(err: &DriverError, model: Option<&Model>) -> ConstraintError {
        let mut table = None;
        let names: Vec<String> = if let Some(caps) = NOT_UNIQUE_COLUMNS.captures(&err.message) {
            // Older SQLite: `columns x, y are not unique`.
            caps[1].split(", ").map(String::from).collect()
        } else if let Some(caps) = UNIQUE_FAILED.captures(&err.message) {
            caps[1]
                .split(", ")
                .map(|qualified| match qualified.split_once('.') {
                    Some((t, column)) => {
                        table.get_or_insert_with(|| t.to_string());
                        column.to_string()
                    }
                    None => qualified.to_string(),
                })
                .collect()
        } else {
            Vec::new()
        };

        let message = model
            .and_then(|model| model.unique_index_for(&names))
            .and_then(|index| index.msg.clone());
        let fields = names
            .iter()
            .map(|name| FieldValue::new(name.as_str(), None))
            .collect();
        unique_error(err, fields, message, model).table(table.or_else(|| err.table.clone()))
    }
}

impl ErrorClassifier for SqliteClassifier {
    fn classify(&self, err: &DriverError, model: Option<&Model>) -> NormalizedError {
        let classified = match err.code.as_deref() {
            Some(code) if code.starts_with("SQLITE_CONSTRAINT") => Self::constraint(err, model),
            Some(code) if code.starts_with("SQLITE_BUSY") => {
                ConstraintError::new(ConstraintKind::Timeout, err.clone()).message(err.message.clone())
            }
            _ => ConstraintError::database(err.clone()),
        };
        classified.into()
    }
}

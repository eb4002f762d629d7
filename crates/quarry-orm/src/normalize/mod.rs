//! Per-dialect classification of raw driver errors.
//!
//! Each dialect reads whatever signal its driver exposes (SQLSTATE, vendor
//! errno, or the message text) and fills in as much of [`ConstraintError`]
//! as it can. Anything unrecognized becomes a [`ConstraintKind::Database`]
//! error that still carries the raw error.

mod db2;
mod mssql;
mod mysql;
mod postgres;
mod sqlite;

use quarry_core::{DialectKind, Model};
use regex::Captures;
use tracing::{debug, warn};

use crate::constraint::{ConstraintError, ConstraintKind, FieldValue, NormalizedError, ValidationItem};
use crate::driver::DriverError;

pub use db2::Db2Classifier;
pub use mssql::MssqlClassifier;
pub use mysql::MysqlClassifier;
pub use postgres::PostgresClassifier;
pub use sqlite::SqliteClassifier;

/// Turns a raw driver error into a normalized one.
pub trait ErrorClassifier: Send + Sync {
    /// Classifies `err`. `model` is the model the statement targeted, used
    /// to map index names to fields and custom messages.
    fn classify(&self, err: &DriverError, model: Option<&Model>) -> NormalizedError;
}

/// Classifier for dialects without usable signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericClassifier;

impl ErrorClassifier for GenericClassifier {
    fn classify(&self, err: &DriverError, _model: Option<&Model>) -> NormalizedError {
        ConstraintError::database(err.clone()).into()
    }
}

static POSTGRES: PostgresClassifier = PostgresClassifier;
static MYSQL: MysqlClassifier = MysqlClassifier::mysql();
static MARIADB: MysqlClassifier = MysqlClassifier::mariadb();
static MSSQL: MssqlClassifier = MssqlClassifier;
static SQLITE: SqliteClassifier = SqliteClassifier;
static DB2: Db2Classifier = Db2Classifier;
static GENERIC: GenericClassifier = GenericClassifier;

/// Returns the classifier used for `dialect`.
#[must_use]
pub fn classifier_for(dialect: DialectKind) -> &'static dyn ErrorClassifier {
    match dialect {
        DialectKind::Postgres => &POSTGRES,
        DialectKind::Mysql => &MYSQL,
        DialectKind::Mariadb => &MARIADB,
        DialectKind::Mssql => &MSSQL,
        DialectKind::Sqlite => &SQLITE,
        DialectKind::Db2 | DialectKind::Ibmi => &DB2,
        DialectKind::Snowflake => &GENERIC,
    }
}

/// Classifies a raw driver error for `dialect`.
#[must_use]
pub fn normalize(err: &DriverError, dialect: DialectKind, model: Option<&Model>) -> NormalizedError {
    let normalized = classifier_for(dialect).classify(err, model);
    if normalized.is_generic() {
        warn!(
            dialect = %dialect,
            code = ?err.code_or_state(),
            "Unrecognized database error, keeping it as a generic error"
        );
    } else {
        debug!(dialect = %dialect, kind = ?normalized.kind(), "Classified database error");
    }
    normalized
}

/// Capture group `i` as an owned string.
fn group(caps: &Captures<'_>, i: usize) -> Option<String> {
    caps.get(i).map(|m| m.as_str().to_string())
}

/// `<field> must be unique`, unless a model index covering the field
/// carries its own message.
fn unique_item_message(field: &str, model: Option<&Model>) -> String {
    let field = field.replace('"', "");
    model
        .and_then(|model| {
            model
                .indexes
                .iter()
                .rev()
                .filter(|index| index.fields.contains(&field))
                .find_map(|index| index.msg.clone())
        })
        .unwrap_or_else(|| format!("{field} must be unique"))
}

/// Builds a unique violation from parsed fields, one validation item each.
fn unique_error(
    cause: &DriverError,
    fields: Vec<FieldValue>,
    message: Option<String>,
    model: Option<&Model>,
) -> ConstraintError {
    let items = fields
        .iter()
        .map(|field| ValidationItem {
            message: unique_item_message(&field.name, model),
            field: field.name.clone(),
            value: field.value.clone(),
        })
        .collect();
    let err = ConstraintError::new(ConstraintKind::Unique, cause.clone())
        .fields(Some(fields))
        .items(items);
    match message {
        Some(message) => err.message(message),
        None => err,
    }
}

/// Pairs field names with values, padding missing values with `None`.
fn zip_fields<'a, I>(names: I, values: &[&str]) -> Vec<FieldValue>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| FieldValue::new(name, values.get(i).map(|v| (*v).to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use quarry_core::Index;

    use super::*;

    #[test]
    fn test_unique_item_message_uses_index_msg() {
        let model = Model::new("User", "users")
            .with_index(Index::unique(["email"]).msg("email already taken"));
        assert_eq!(
            unique_item_message("email", Some(&model)),
            "email already taken"
        );
        assert_eq!(
            unique_item_message("\"username\"", Some(&model)),
            "username must be unique"
        );
        assert_eq!(unique_item_message("id", None), "id must be unique");
    }

    #[test]
    fn test_zip_fields_pads_values() {
        let fields = zip_fields(["a", "b"], &["1"]);
        assert_eq!(
            fields,
            vec![
                FieldValue::new("a", Some("1".to_string())),
                FieldValue::new("b", None)
            ]
        );
    }

    #[test]
    fn test_snowflake_is_always_generic() {
        let err = DriverError::new("Duplicate entry").errno(1062);
        let normalized = normalize(&err, DialectKind::Snowflake, None);
        assert!(normalized.is_generic());
        assert_eq!(normalized.primary().map(|e| &e.cause), Some(&err));
    }

    #[test]
    fn test_ibmi_shares_db2_classifier() {
        let err = DriverError::new(
            "[IBM][CLI Driver][DB2/LINUXX8664] SQL0545N  The requested operation is not allowed because a row does not satisfy the check constraint \"CHK_AGE\".",
        );
        assert_eq!(
            normalize(&err, DialectKind::Ibmi, None).kind(),
            ConstraintKind::Check
        );
    }
}

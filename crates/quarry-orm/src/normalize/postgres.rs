//! PostgreSQL: classification by SQLSTATE.

use std::sync::LazyLock;

use quarry_core::Model;
use regex::Regex;

use super::{group, unique_error, zip_fields, ErrorClassifier};
use crate::constraint::{ConstraintError, ConstraintKind, NormalizedError};
use crate::driver::DriverError;

const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";
const EXCLUSION_VIOLATION: &str = "23P01";
const CHECK_VIOLATION: &str = "23514";
const UNDEFINED_OBJECT: &str = "42704";

static KEY_DETAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Key \((.*?)\)=\((.*?)\)").expect("Invalid key detail pattern"));
static FOREIGN_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"violates foreign key constraint "(.+?)""#).expect("Invalid foreign key pattern")
});
static ON_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"on table "(.+?)""#).expect("Invalid table pattern"));
static CHECK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"violates check constraint "(.+?)""#).expect("Invalid check pattern")
});
static RELATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)relation "(.+?)""#).expect("Invalid relation pattern"));
static DDL_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(CONSTRAINT|INDEX)").expect("Invalid DDL object pattern"));
static NAMED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:constraint|index) "(.+?)""#).expect("Invalid named object pattern")
});

/// Classifies errors from PostgreSQL drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresClassifier;

impl PostgresClassifier {
    fn foreign_key(err: &DriverError) -> ConstraintError {
        let index = FOREIGN_KEY.captures(&err.message)
            .and_then(|caps| group(&caps, 1));
        let table = ON_TABLE.captures(&err.message).and_then(|caps| group(&caps, 1));
        ConstraintError::new(ConstraintKind::ForeignKey, err.clone())
            .message(err.message.clone())
            .index(index.or_else(|| err.constraint.clone()))
            .table(table.or_else(|| err.table.clone()))
    }

    fn unique(err: &DriverError, model: Option<&Model>) -> ConstraintError {
        let detail = err.detail.as_deref().map(|detail| detail.replace('"', ""));
        let Some(caps) = detail.as_deref().and_then(|d| KEY_DETAIL.captures(d)) else {
            return ConstraintError::new(ConstraintKind::Unique, err.clone())
                .message(err.message.clone())
                .index(err.constraint.clone())
                .table(err.table.clone());
        };

        let names: Vec<&str> = caps[1].split(", ").collect();
        let values: Vec<&str> = caps[2].split(", ").collect();
        let fields = zip_fields(names.iter().copied(), &values);
        let owned: Vec<String> = names.iter().map(|n| (*n).to_string()).collect();
        let message = model
            .and_then(|model| model.unique_index_for(&owned))
            .and_then(|index| index.msg.clone());

        unique_error(err, fields, message, model)
            .index(err.constraint.clone())
            .table(err.table.clone())
    }

    fn exclusion(err: &DriverError) -> ConstraintError {
        let fields = err
            .detail
            .as_deref()
            .and_then(|detail| KEY_DETAIL.captures(detail))
            .map(|caps| {
                let values: Vec<&str> = caps[2].split(", ").collect();
                zip_fields(caps[1].split(", "), &values)
            });
        ConstraintError::new(ConstraintKind::Exclusion, err.clone())
            .fields(fields)
            .index(err.constraint.clone())
            .table(err.table.clone())
    }

    fn check(err: &DriverError) -> ConstraintError {
        let index = CHECK.captures(&err.message)
            .and_then(|caps| group(&caps, 1));
        let table = RELATION.captures(&err.message).and_then(|caps| group(&caps, 1));
        ConstraintError::new(ConstraintKind::Check, err.clone())
            .message(err.message.clone())
            .index(index.or_else(|| err.constraint.clone()))
            .table(table.or_else(|| err.table.clone()))
    }

    fn unknown_constraint(err: &DriverError) -> Option<ConstraintError> {
        let sql = err.sql.as_deref()?;
        DDL_OBJECT.captures(sql)?;
        let index = NAMED_OBJECT.captures(&err.message)
            .and_then(|caps| group(&caps, 1));
        let table = RELATION.captures(&err.message).and_then(|caps| group(&caps, 1));
        Some(
            ConstraintError::new(ConstraintKind::UnknownConstraint, err.clone())
                .index(index)
                .table(table),
        )
    }
}

impl ErrorClassifier for PostgresClassifier {
    fn classify(&self, err: &DriverError, model: Option<&Model>) -> NormalizedError {
        let classified = match err.code_or_state() {
            Some(FOREIGN_KEY_VIOLATION) => Self::foreign_key(err),
            Some(UNIQUE_VIOLATION) => Self::unique(err, model),
            Some(EXCLUSION_VIOLATION) => Self::exclusion(err),
            Some(CHECK_VIOLATION) => Self::check(err),
            Some(UNDEFINED_OBJECT) => {
                Self::unknown_constraint(err).unwrap_or_else(|| ConstraintError::database(err.clone()))
            }
            _ => ConstraintError::database(err.clone()),
        };
        classified.into()
    }
}

#[cfg(test)]
mod tests {
    use quarry_core::Index;

    use super::*;

    #[test]
    fn test_patterns_compile() {
        for pattern in [
            &KEY_DETAIL,
            &FOREIGN_KEY,
            &ON_TABLE,
            &CHECK,
            &RELATION,
            &DDL_OBJECT,
            &NAMED_OBJECT,
        ] {
            assert!(!LazyLock::force(pattern).as_str().is_empty());
        }
    }
    use crate::constraint::FieldValue;

    fn classify(err: &DriverError, model: Option<&Model>) -> ConstraintError {
        PostgresClassifier
            .classify(err, model)
            .primary()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_unique_with_detail() {
        let err = DriverError::new("duplicate key value violates unique constraint \"users_email_key\"")
            .code("23505")
            .detail("Key (\"email\", tenant)=(a@b.c, 3) already exists.");
        let classified = classify(&err, None);

        assert_eq!(classified.kind, ConstraintKind::Unique);
        assert_eq!(classified.message, "Validation error");
        assert_eq!(
            classified.fields,
            Some(vec![
                FieldValue::new("email", Some("a@b.c".to_string())),
                FieldValue::new("tenant", Some("3".to_string())),
            ])
        );
        assert_eq!(classified.items[0].message, "email must be unique");
        assert_eq!(classified.cause, err);
    }

    #[test]
    fn test_unique_uses_index_message() {
        let model = Model::new("User", "users")
            .with_index(Index::unique(["tenant", "email"]).msg("already registered"));
        let err = DriverError::new("duplicate key")
            .code("23505")
            .detail("Key (email, tenant)=(a@b.c, 3) already exists.");
        let classified = classify(&err, Some(&model));

        assert_eq!(classified.message, "already registered");
        assert_eq!(classified.items[1].message, "already registered");
    }

    #[test]
    fn test_unique_without_detail() {
        let err = DriverError::new("duplicate key value").code("23505");
        let classified = classify(&err, None);
        assert_eq!(classified.kind, ConstraintKind::Unique);
        assert_eq!(classified.message, "duplicate key value");
        assert_eq!(classified.fields, None);
    }

    #[test]
    fn test_foreign_key() {
        let err = DriverError::new(
            "insert or update on table \"tasks\" violates foreign key constraint \"tasks_project_id_fkey\"",
        )
        .code("23503");
        let classified = classify(&err, None);
        assert_eq!(classified.kind, ConstraintKind::ForeignKey);
        assert_eq!(classified.table.as_deref(), Some("tasks"));
        assert_eq!(classified.index.as_deref(), Some("tasks_project_id_fkey"));
        assert_eq!(classified.fields, None);
    }

    #[test]
    fn test_exclusion() {
        let mut err = DriverError::new("conflicting key value violates exclusion constraint")
            .code("23P01")
            .detail("Key (period)=([2024-01-01,2024-02-01)) conflicts with existing key.");
        err.constraint = Some("bookings_period_excl".to_string());
        let classified = classify(&err, None);
        assert_eq!(classified.kind, ConstraintKind::Exclusion);
        assert_eq!(classified.message, "Exclusion constraint error");
        assert_eq!(classified.index.as_deref(), Some("bookings_period_excl"));
        assert_eq!(classified.field_names(), vec!["period"]);
    }

    #[test]
    fn test_check() {
        let err = DriverError::new(
            "new row for relation \"users\" violates check constraint \"users_age_check\"",
        )
        .code("23514");
        let classified = classify(&err, None);
        assert_eq!(classified.kind, ConstraintKind::Check);
        assert_eq!(classified.index.as_deref(), Some("users_age_check"));
        assert_eq!(classified.table.as_deref(), Some("users"));
    }

    #[test]
    fn test_unknown_constraint_needs_constraint_sql() {
        let err = DriverError::new("constraint \"users_email_key\" of relation \"users\" does not exist")
            .code("42704")
            .sql("ALTER TABLE \"users\" DROP CONSTRAINT \"users_email_key\";");
        let classified = classify(&err, None);
        assert_eq!(classified.kind, ConstraintKind::UnknownConstraint);
        assert_eq!(classified.index.as_deref(), Some("users_email_key"));
        assert_eq!(classified.table.as_deref(), Some("users"));

        let other = DriverError::new("type \"foo\" does not exist")
            .code("42704")
            .sql("SELECT 'x'::foo");
        assert_eq!(classify(&other, None).kind, ConstraintKind::Database);
    }
}

//! SQL Server: classification by message text, with batched sub-errors.

use std::sync::LazyLock;

use quarry_core::Model;
use regex::Regex;

use super::{group, unique_error, zip_fields, ErrorClassifier};
use crate::constraint::{ConstraintError, ConstraintKind, FieldValue, NormalizedError};
use crate::driver::DriverError;

static UNIQUE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Violation of (?:UNIQUE|PRIMARY) KEY constraint '([^']*)'\. Cannot insert duplicate key in object '.*'\.(:? The duplicate key value is \((.*)\).)?").expect("Invalid unique key pattern")
});
static UNIQUE_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Cannot insert duplicate key row in object .* with unique index '(.*)'\.(:? The duplicate key value is \((.*)\).)?").expect("Invalid unique index pattern")
});
static FOREIGN_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"The (?:DELETE|INSERT|MERGE|UPDATE) statement conflicted with the (?:FOREIGN KEY|REFERENCE) constraint "(.*)"\. The conflict occurred in database "(.*)", table "(.*)", column '(.*)'\."#).expect("Invalid foreign key pattern")
});
static CHECK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"The (?:INSERT|UPDATE) statement conflicted with the CHECK constraint "(.*)"\. The conflict occurred in database "(.*)", table "(.*)""#).expect("Invalid check pattern")
});
static NESTED_CONSTRAINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Could not (?:create|drop) constraint(?: or index)?\. See previous errors\.").expect("Invalid nested constraint pattern")
});
static NAMED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:constraint|index) \[(.+?)\]").expect("Invalid named object pattern")
});
static TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)table \[(.+?)\]").expect("Invalid table pattern"));

/// Classifies errors from SQL Server drivers.
///
/// The driver reports every message raised by a statement; the earlier ones
/// are kept as generic errors in front of the classified one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlClassifier;

impl MssqlClassifier {
    fn unique(err: &DriverError, model: Option<&Model>) -> Option<ConstraintError> {
        let caps = UNIQUE_KEY
            .captures(&err.message)
            .or_else(|| UNIQUE_INDEX.captures(&err.message))?;
        let name = group(&caps, 1)?;
        let index = model.and_then(|model| model.unique_index_named(&name));

        let fields = match (caps.get(3), index) {
            (Some(values), Some(index)) => {
                let values: Vec<&str> = values.as_str().split(',').map(str::trim).collect();
                zip_fields(index.fields.iter().map(String::as_str), &values)
            }
            (Some(values), None) => {
                vec![FieldValue::new(name.as_str(), Some(values.as_str().to_string()))]
            }
            (None, _) => Vec::new(),
        };
        let message = index.and_then(|index| index.msg.clone());
        Some(unique_error(err, fields, message, model).index(Some(name)))
    }

    fn foreign_key(err: &DriverError) -> Option<ConstraintError> {
        let caps = FOREIGN_KEY.captures(&err.message)?;
        Some(
            ConstraintError::new(ConstraintKind::ForeignKey, err.clone())
                .index(group(&caps, 1))
                .table(group(&caps, 3))
                .fields(group(&caps, 4).map(|column| vec![FieldValue::new(column, None)])),
        )
    }

    fn check(err: &DriverError) -> Option<ConstraintError> {
        let caps = CHECK.captures(&err.message)?;
        Some(
            ConstraintError::new(ConstraintKind::Check, err.clone())
                .message(err.message.clone())
                .index(group(&caps, 1))
                .table(group(&caps, 3)),
        )
    }

    /// A nested "could not create/drop constraint" message means the
    /// constraint named in the statement does not exist.
    fn unknown_constraint(err: &DriverError) -> Option<ConstraintError> {
        let position = err
            .errors
            .iter()
            .rposition(|sub| NESTED_CONSTRAINT.is_match(&sub.message))?;
        let sql = err.sql.as_deref().unwrap_or_default();
        let constraint = NAMED_OBJECT.captures(sql).and_then(|caps| group(&caps, 1));
        let table = TABLE.captures(sql).and_then(|caps| group(&caps, 1));
        let message = position
            .checked_sub(1)
            .and_then(|previous| err.errors.get(previous))
            .map_or_else(
                || ConstraintKind::UnknownConstraint.default_message().to_string(),
                |previous| previous.message.clone(),
            );
        Some(
            ConstraintError::new(ConstraintKind::UnknownConstraint, err.clone())
                .message(message)
                .index(constraint)
                .table(table),
        )
    }

    fn with_sub_errors(err: &DriverError, classified: Option<ConstraintError>) -> NormalizedError {
        if err.errors.is_empty() {
            return classified
                .unwrap_or_else(|| ConstraintError::database(err.clone()))
                .into();
        }
        let mut errors: Vec<ConstraintError> = err
            .errors
            .iter()
            .cloned()
            .map(ConstraintError::database)
            .collect();
        errors.extend(classified);
        NormalizedError::Aggregate(errors)
    }
}

impl ErrorClassifier for MssqlClassifier {
    fn classify(&self, err: &DriverError, model: Option<&Model>) -> NormalizedError {
        let classified = Self::unique(err, model)
            .or_else(|| Self::foreign_key(err))
            .or_else(|| Self::check(err))
            .or_else(|| Self::unknown_constraint(err));
        Self::with_sub_errors(err, classified)
    }
}

#[cfg(test)]
mod tests {
    use quarry_core::Index;

    use super::*;

    #[test]
    fn test_patterns_compile() {
        for pattern in [
            &UNIQUE_KEY,
            &UNIQUE_INDEX,
            &FOREIGN_KEY,
            &CHECK,
            &NESTED_CONSTRAINT,
            &NAMED_OBJECT,
            &TABLE,
        ] {
            assert!(!LazyLock::force(pattern).as_str().is_empty());
        }
    }

    #[test]
    fn test_unique_key_with_values() {
        let err = DriverError::new(
            "Violation of UNIQUE KEY constraint 'UQ_users_email'. Cannot insert duplicate key in object 'dbo.users'. The duplicate key value is (a@b.c).",
        );
        let normalized = MssqlClassifier.classify(&err, None);
        let classified = normalized.primary().unwrap();
        assert!(matches!(normalized, NormalizedError::Single(_)));
        assert_eq!(classified.kind, ConstraintKind::Unique);
        assert_eq!(classified.index.as_deref(), Some("UQ_users_email"));
        assert_eq!(
            classified.fields,
            Some(vec![FieldValue::new("UQ_users_email", Some("a@b.c".to_string()))])
        );
    }

    #[test]
    fn test_unique_index_maps_fields() {
        let model = Model::new("Member", "members").with_index(
            Index::unique(["team_id", "user_id"])
                .name("IX_members")
                .msg("duplicate membership"),
        );
        let err = DriverError::new(
            "Cannot insert duplicate key row in object 'dbo.members' with unique index 'IX_members'. The duplicate key value is (4, 7).",
        );
        let normalized = MssqlClassifier.classify(&err, Some(&model));
        let classified = normalized.primary().unwrap();
        assert_eq!(classified.message, "duplicate membership");
        assert_eq!(classified.field_names(), vec!["team_id", "user_id"]);
        assert_eq!(
            classified.fields.as_ref().unwrap()[1].value.as_deref(),
            Some("7")
        );
    }

    #[test]
    fn test_foreign_key() {
        let err = DriverError::new(
            "The INSERT statement conflicted with the FOREIGN KEY constraint \"FK_tasks_project\". The conflict occurred in database \"app\", table \"dbo.projects\", column 'id'.",
        );
        let normalized = MssqlClassifier.classify(&err, None);
        let classified = normalized.primary().unwrap();
        assert_eq!(classified.kind, ConstraintKind::ForeignKey);
        assert_eq!(classified.index.as_deref(), Some("FK_tasks_project"));
        assert_eq!(classified.table.as_deref(), Some("dbo.projects"));
        assert_eq!(classified.field_names(), vec!["id"]);
    }

    #[test]
    fn test_nested_errors_aggregate_with_unknown_constraint_last() {
        let err = DriverError::new("Could not drop constraint. See previous errors.")
            .sql("ALTER TABLE [users] DROP CONSTRAINT [missing_fk];")
            .with_error(DriverError::new("'missing_fk' is not a constraint."))
            .with_error(DriverError::new("Could not drop constraint. See previous errors."));
        let normalized = MssqlClassifier.classify(&err, None);

        let NormalizedError::Aggregate(errors) = &normalized else {
            panic!("expected an aggregate, got {normalized:?}");
        };
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].kind, ConstraintKind::Database);
        let last = &errors[2];
        assert_eq!(last.kind, ConstraintKind::UnknownConstraint);
        assert_eq!(last.message, "'missing_fk' is not a constraint.");
        assert_eq!(last.index.as_deref(), Some("missing_fk"));
        assert_eq!(last.table.as_deref(), Some("users"));
        assert_eq!(last.cause, err);
    }

    #[test]
    fn test_nested_errors_without_signal() {
        let err = DriverError::new("batch failed")
            .with_error(DriverError::new("first"))
            .with_error(DriverError::new("second"));
        let normalized = MssqlClassifier.classify(&err, None);
        assert!(normalized.is_generic());
        assert_eq!(normalized.errors().len(), 2);
    }
}

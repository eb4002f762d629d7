//! Db2 (LUW and IBM i): classification by SQLCODE message prefix.

use std::sync::LazyLock;

use quarry_core::Model;
use regex::Regex;

use super::{group, unique_error, ErrorClassifier};
use crate::constraint::{ConstraintError, ConstraintKind, NormalizedError};
use crate::driver::DriverError;

static DUPLICATE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"SQL0803N .*?identified by "(\d+)" constrains table "([^"]*)\.([^"]*)" from having duplicate values"#).expect("Invalid duplicate key pattern")
});
static RELATIONSHIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"relationship "([\w.]+)""#).expect("Invalid relationship pattern")
});
static QUOTED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([\w.]+)""#).expect("Invalid quoted name pattern"));
static CHECK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"check constraint "([^"]+)""#).expect("Invalid check pattern"));
static UNDEFINED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"SQL0204N\s+"(.*)" is an undefined name\."#).expect("Invalid undefined name pattern")
});
static TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)table "(.+?)""#).expect("Invalid table pattern"));

/// Classifies errors from Db2 drivers.
///
/// Db2 only names the violated index by its numeric id, so unique
/// violations carry the table but no fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct Db2Classifier;

impl Db2Classifier {
    fn unique(err: &DriverError, model: Option<&Model>) -> ConstraintError {
        let caps = DUPLICATE_KEY.captures(&err.message);
        let table = caps.as_ref().and_then(|caps| group(caps, 3));
        let index = caps.as_ref().and_then(|caps| group(caps, 1));
        unique_error(err, Vec::new(), Some(err.message.clone()), model)
            .table(table)
            .index(index)
    }

    fn foreign_key(err: &DriverError) -> ConstraintError {
        let index = RELATIONSHIP
            .captures(&err.message)
            .or_else(|| QUOTED_NAME.captures(&err.message))
            .and_then(|caps| group(&caps, 1));
        ConstraintError::new(ConstraintKind::ForeignKey, err.clone()).index(index)
    }

    fn check(err: &DriverError) -> ConstraintError {
        let index = CHECK.captures(&err.message)
            .and_then(|caps| group(&caps, 1));
        ConstraintError::new(ConstraintKind::Check, err.clone())
            .message(err.message.clone())
            .index(index)
    }

    fn unknown_constraint(err: &DriverError) -> Option<ConstraintError> {
        let caps = UNDEFINED_NAME.captures(&err.message)?;
        let table = err
            .sql
            .as_deref()
            .and_then(|sql| TABLE.captures(sql))
            .and_then(|caps| group(&caps, 1));
        Some(
            ConstraintError::new(ConstraintKind::UnknownConstraint, err.clone())
                .message(caps[0].to_string())
                .index(group(&caps, 1))
                .table(table),
        )
    }
}

impl ErrorClassifier for Db2Classifier {
    fn classify(&self, err: &DriverError, model: Option<&Model>) -> NormalizedError {
        let message = err.message.as_str();
        let classified = if message.contains("SQL0803N") {
            Self::unique(err, model)
        } else if ["SQL0530N", "SQL0531N", "SQL0532N"]
            .iter()
            .any(|code| message.contains(code))
        {
            Self::foreign_key(err)
        } else if message.contains("SQL0545N") {
            Self::check(err)
        } else {
            Self::unknown_constraint(err).unwrap_or_else(|| ConstraintError::database(err.clone()))
        };
        classified.into()
    }
}

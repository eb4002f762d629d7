//! MySQL and MariaDB: classification by vendor errno.

use std::sync::LazyLock;

use quarry_core::Model;
use regex::Regex;

use super::{group, unique_error, zip_fields, ErrorClassifier};
use crate::constraint::{ConstraintError, ConstraintKind, FieldValue, NormalizedError, RelType};
use crate::driver::DriverError;

const ER_DUP_ENTRY: i64 = 1062;
const ER_ROW_IS_REFERENCED: i64 = 1451;
const ER_NO_REFERENCED_ROW: i64 = 1452;
const ER_LOCK_WAIT_TIMEOUT: i64 = 1205;
const ER_LOCK_DEADLOCK: i64 = 1213;
const ER_CHECK_CONSTRAINT_VIOLATED: i64 = 3819;
const ER_CONSTRAINT_NOT_FOUND: i64 = 3940;
const ER_CANT_DROP_FIELD_OR_KEY: i64 = 1091;

static MYSQL_DUPLICATE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duplicate entry '([\S\s]*)' for key '?((.|\s)*?)'?$").expect("Invalid duplicate entry pattern")
});
static MARIADB_DUPLICATE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duplicate entry '([\S\s]*)' for key '?([^']*?)'?\s.*$").expect("Invalid duplicate entry pattern")
});

// No backreferences in `regex`, so each identifier quote gets its own pattern.
static FOREIGN_KEY_BACKTICK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"CONSTRAINT `(.*)` FOREIGN KEY \(`(.*)`\) REFERENCES `(.*)` \(`(.*)`\)").expect("Invalid foreign key pattern")
});
static FOREIGN_KEY_DOUBLE_QUOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"CONSTRAINT "(.*)" FOREIGN KEY \("(.*)"\) REFERENCES "(.*)" \("(.*)"\)"#).expect("Invalid foreign key pattern")
});
static CHECK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Check constraint '(.+?)' is violated").expect("Invalid check pattern")
});
static NAMED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:constraint|index) `(.+?)`").expect("Invalid named object pattern")
});
static TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)table `(.+?)`").expect("Invalid table pattern"));

/// Classifies errors from MySQL or MariaDB drivers.
///
/// Both share errnos; they differ in how the duplicate-key message ends and
/// in which errno reports a missing constraint.
#[derive(Debug, Clone, Copy)]
pub struct MysqlClassifier {
    mariadb: bool,
}

impl MysqlClassifier {
    /// Classifier for MySQL.
    #[must_use]
    pub const fn mysql() -> Self {
        Self { mariadb: false }
    }

    /// Classifier for MariaDB.
    #[must_use]
    pub const fn mariadb() -> Self {
        Self { mariadb: true }
    }

    const fn constraint_not_found(&self) -> i64 {
        if self.mariadb {
            ER_CANT_DROP_FIELD_OR_KEY
        } else {
            ER_CONSTRAINT_NOT_FOUND
        }
    }

    /// Resolves the errno, accepting it as a numeric string code too.
    fn errno(err: &DriverError) -> Option<i64> {
        err.errno
            .or_else(|| err.code.as_deref().and_then(|code| code.parse().ok()))
            .or_else(|| match err.code.as_deref() {
                Some("ER_DUP_ENTRY") => Some(ER_DUP_ENTRY),
                Some("ER_ROW_IS_REFERENCED_2" | "ER_ROW_IS_REFERENCED") => {
                    Some(ER_ROW_IS_REFERENCED)
                }
                Some("ER_NO_REFERENCED_ROW_2" | "ER_NO_REFERENCED_ROW") => {
                    Some(ER_NO_REFERENCED_ROW)
                }
                Some("ER_LOCK_WAIT_TIMEOUT") => Some(ER_LOCK_WAIT_TIMEOUT),
                Some("ER_LOCK_DEADLOCK") => Some(ER_LOCK_DEADLOCK),
                Some("ER_CHECK_CONSTRAINT_VIOLATED") => Some(ER_CHECK_CONSTRAINT_VIOLATED),
                Some("ER_CONSTRAINT_NOT_FOUND") => Some(ER_CONSTRAINT_NOT_FOUND),
                Some("ER_CANT_DROP_FIELD_OR_KEY") => Some(ER_CANT_DROP_FIELD_OR_KEY),
                _ => None,
            })
    }

    fn duplicate_entry(&self, err: &DriverError, model: Option<&Model>) -> ConstraintError {
        let pattern = if self.mariadb {
            &MARIADB_DUPLICATE_ENTRY
        } else {
            &MYSQL_DUPLICATE_ENTRY
        };
        let Some(caps) = pattern.captures(&err.message) else {
            return unique_error(err, Vec::new(), None, model);
        };

        let value = &caps[1];
        // mysql 8 reports the key as `table.key`.
        let key = caps[2].rsplit('.').next().unwrap_or(&caps[2]).to_string();
        let index = model.and_then(|model| model.unique_index_named(&key));

        let fields = match index {
            Some(index) => {
                let values: Vec<&str> = value.split('-').collect();
                zip_fields(index.fields.iter().map(String::as_str), &values)
            }
            None => vec![FieldValue::new(key.clone(), Some(value.to_string()))],
        };
        let message = index.and_then(|index| index.msg.clone());
        unique_error(err, fields, message, model).index(Some(key))
    }

    fn foreign_key(err: &DriverError, errno: i64) -> ConstraintError {
        // e.g. CONSTRAINT `fk_name` FOREIGN KEY (`owner_id`) REFERENCES `users` (`id`)
        let patterns = [('`', &FOREIGN_KEY_BACKTICK), ('"', &FOREIGN_KEY_DOUBLE_QUOTE)];
        let parsed = patterns.into_iter().find_map(|(quote, pattern)| {
            pattern.captures(&err.message).map(|caps| {
                let separator = format!("{quote}, ");
                let fields = caps[2]
                    .split(separator.as_str())
                    .map(|field| FieldValue::new(field.trim_start_matches(quote), None))
                    .collect::<Vec<_>>();
                (group(&caps, 1), group(&caps, 3), fields)
            })
        });

        let reltype = if errno == ER_ROW_IS_REFERENCED {
            RelType::Parent
        } else {
            RelType::Child
        };
        let classified = ConstraintError::new(ConstraintKind::ForeignKey, err.clone()).reltype(reltype);
        match parsed {
            Some((index, table, fields)) => classified.index(index).table(table).fields(Some(fields)),
            None => classified,
        }
    }

    fn check(err: &DriverError) -> ConstraintError {
        let index = CHECK.captures(&err.message)
            .and_then(|caps| group(&caps, 1));
        ConstraintError::new(ConstraintKind::Check, err.clone())
            .message(err.message.clone())
            .index(index)
    }

    fn unknown_constraint(err: &DriverError) -> ConstraintError {
        let sql = err.sql.as_deref().unwrap_or_default();
        let index = NAMED_OBJECT.captures(sql).and_then(|caps| group(&caps, 1));
        let table = TABLE.captures(sql).and_then(|caps| group(&caps, 1));
        ConstraintError::new(ConstraintKind::UnknownConstraint, err.clone())
            .message(err.message.clone())
            .index(index)
            .table(table)
    }
}

impl ErrorClassifier for MysqlClassifier {
    fn classify(&self, err: &DriverError, model: Option<&Model>) -> NormalizedError {
        let classified = match Self::errno(err) {
            Some(ER_DUP_ENTRY) => self.duplicate_entry(err, model),
            Some(errno @ (ER_ROW_IS_REFERENCED | ER_NO_REFERENCED_ROW)) => {
                Self::foreign_key(err, errno)
            }
            Some(ER_CHECK_CONSTRAINT_VIOLATED) => Self::check(err),
            Some(ER_LOCK_WAIT_TIMEOUT | ER_LOCK_DEADLOCK) => {
                ConstraintError::new(ConstraintKind::Timeout, err.clone()).message(err.message.clone())
            }
            Some(errno) if errno == self.constraint_not_found() => Self::unknown_constraint(err),
            _ => ConstraintError::database(err.clone()),
        };
        classified.into()
    }
}

//! Normalized constraint errors.

use std::fmt;

use serde::Serialize;

use crate::driver::DriverError;

/// Classification of a failed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// A unique or primary key constraint was violated.
    Unique,
    /// A foreign key constraint was violated.
    ForeignKey,
    /// A CHECK constraint was violated.
    Check,
    /// A postgres exclusion constraint was violated.
    Exclusion,
    /// The statement referenced a constraint or index that does not exist.
    UnknownConstraint,
    /// Lock wait timeout, deadlock or busy database.
    Timeout,
    /// Anything the classifier could not recognize.
    Database,
}

impl ConstraintKind {
    /// Default message for the kind.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Unique => "Validation error",
            Self::ForeignKey => "Foreign key constraint error",
            Self::Check => "Check constraint error",
            Self::Exclusion => "Exclusion constraint error",
            Self::UnknownConstraint => "Unknown constraint error",
            Self::Timeout => "Timeout error",
            Self::Database => "Database error",
        }
    }
}

/// Which side of a foreign key failed (mysql, mariadb).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelType {
    /// A referenced parent row cannot be removed.
    Parent,
    /// A child row points at a missing parent.
    Child,
}

/// A column involved in the failure, with the offending value when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    /// Column name.
    pub name: String,
    /// Value as reported by the database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FieldValue {
    /// Creates a field entry.
    #[must_use]
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Per-field validation message attached to unique violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationItem {
    /// Human readable message, e.g. `username must be unique`.
    pub message: String,
    /// The offending column.
    pub field: String,
    /// The offending value, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A dialect-independent description of a failed write.
///
/// The raw driver error is always kept in `cause` and exposed through
/// [`std::error::Error::source`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintError {
    /// Classification.
    pub kind: ConstraintKind,
    /// Message: the kind's default, a model index `msg`, or the driver text.
    pub message: String,
    /// Table, when the dialect reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Columns in the order the database listed them. `None` when the
    /// dialect cannot tell.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldValue>>,
    /// Index or constraint name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Foreign key side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reltype: Option<RelType>,
    /// One item per unique field.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ValidationItem>,
    /// The raw driver error.
    pub cause: DriverError,
}

impl ConstraintError {
    /// Creates an error of `kind` with its default message.
    #[must_use]
    pub fn new(kind: ConstraintKind, cause: DriverError) -> Self {
        Self {
            kind,
            message: kind.default_message().to_string(),
            table: None,
            fields: None,
            index: None,
            reltype: None,
            items: Vec::new(),
            cause,
        }
    }

    /// A generic database error: the driver message is kept as is.
    #[must_use]
    pub fn database(cause: DriverError) -> Self {
        let mut err = Self::new(ConstraintKind::Database, cause);
        err.message.clone_from(&err.cause.message);
        err
    }

    /// Replaces the message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets the table.
    #[must_use]
    pub fn table(mut self, table: Option<String>) -> Self {
        self.table = table;
        self
    }

    /// Sets the fields.
    #[must_use]
    pub fn fields(mut self, fields: Option<Vec<FieldValue>>) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the index or constraint name.
    #[must_use]
    pub fn index(mut self, index: Option<String>) -> Self {
        self.index = index;
        self
    }

    /// Sets the foreign key side.
    #[must_use]
    pub const fn reltype(mut self, reltype: RelType) -> Self {
        self.reltype = Some(reltype);
        self
    }

    /// Sets the validation items.
    #[must_use]
    pub fn items(mut self, items: Vec<ValidationItem>) -> Self {
        self.items = items;
        self
    }

    /// Field names, in order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .flatten()
            .map(|field| field.name.as_str())
            .collect()
    }
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ConstraintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Outcome of normalization: one error, or an ordered batch of them.
///
/// In a batch, the last error carries the most specific classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "errors", rename_all = "snake_case")]
pub enum NormalizedError {
    /// A single classified error.
    Single(Box<ConstraintError>),
    /// Several errors raised by one statement.
    Aggregate(Vec<ConstraintError>),
}

impl NormalizedError {
    /// All errors, in order.
    #[must_use]
    pub fn errors(&self) -> &[ConstraintError] {
        match self {
            Self::Single(err) => std::slice::from_ref(err.as_ref()),
            Self::Aggregate(errors) => errors,
        }
    }

    /// The most specific error.
    #[must_use]
    pub fn primary(&self) -> Option<&ConstraintError> {
        self.errors().last()
    }

    /// Kind of the most specific error.
    #[must_use]
    pub fn kind(&self) -> ConstraintKind {
        self.primary()
            .map_or(ConstraintKind::Database, |err| err.kind)
    }

    /// Whether the classifier fell back to a generic database error.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.errors()
            .iter()
            .all(|err| err.kind == ConstraintKind::Database)
    }
}

impl From<ConstraintError> for NormalizedError {
    fn from(err: ConstraintError) -> Self {
        Self::Single(Box::new(err))
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(err) => err.fmt(f),
            Self::Aggregate(errors) => {
                let messages: Vec<_> = errors.iter().map(ToString::to_string).collect();
                write!(f, "{}", messages.join("\n\n"))
            }
        }
    }
}

impl std::error::Error for NormalizedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.primary()
            .map(|err| &err.cause as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_source_is_the_driver_error() {
        let cause = DriverError::new("UNIQUE constraint failed: users.email");
        let err = ConstraintError::new(ConstraintKind::Unique, cause.clone());
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), cause.to_string());
    }

    #[test]
    fn test_database_keeps_driver_message() {
        let err = ConstraintError::database(DriverError::new("syntax error"));
        assert_eq!(err.kind, ConstraintKind::Database);
        assert_eq!(err.to_string(), "syntax error");
    }

    #[test]
    fn test_aggregate_primary_is_last() {
        let first = ConstraintError::database(DriverError::new("first"));
        let last = ConstraintError::new(ConstraintKind::UnknownConstraint, DriverError::new("last"));
        let normalized = NormalizedError::Aggregate(vec![first, last]);
        assert_eq!(normalized.kind(), ConstraintKind::UnknownConstraint);
        assert_eq!(normalized.errors().len(), 2);
        assert!(!normalized.is_generic());
        assert_eq!(normalized.source().unwrap().to_string(), "last");
    }

    #[test]
    fn test_serialize_single() {
        let err = ConstraintError::new(ConstraintKind::ForeignKey, DriverError::new("fk"))
            .reltype(RelType::Child)
            .index(Some("fk_owner".to_string()));
        let value = serde_json::to_value(NormalizedError::from(err)).unwrap();
        assert_eq!(value["type"], "single");
        assert_eq!(value["errors"]["kind"], "foreign_key");
        assert_eq!(value["errors"]["reltype"], "child");
        assert_eq!(value["errors"]["index"], "fk_owner");
    }
}

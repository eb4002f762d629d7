//! Error types for query compilation.

use thiserror::Error;

/// Errors raised while compiling a where tree, an order spec or a statement.
///
/// These are usage errors: they are detected before any SQL reaches a database.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A where value was explicitly undefined.
    #[error("WHERE parameter \"{key}\" has invalid \"undefined\" value")]
    UndefinedValue {
        /// The attribute key holding the undefined value.
        key: String,
    },

    /// BETWEEN received something other than two bounds.
    #[error("{op} on \"{key}\" expects an array of exactly 2 elements, got {len}")]
    BetweenArity {
        /// The attribute key.
        key: String,
        /// The operator spelling.
        op: &'static str,
        /// The number of elements received.
        len: usize,
    },

    /// `is` / `isNot` got an operand that is not null, a boolean or a literal.
    #[error(
        "Operators Op.is and Op.isNot can only be used with null, true, false or a literal."
    )]
    InvalidIsOperand,

    /// An ordering comparison was given `null`.
    #[error("{op} on \"{key}\" cannot be compared with null")]
    NullComparison {
        /// The attribute key.
        key: String,
        /// The operator spelling.
        op: &'static str,
    },

    /// An order hop names a model with no association from the current model.
    #[error("Unable to find a valid association for model, '{model}'")]
    UnknownAssociation {
        /// The model that could not be reached.
        model: String,
    },

    /// An order or group item has a shape that cannot be resolved.
    #[error("Unknown structure passed to order / group: {0}")]
    UnknownStructure(String),

    /// The legacy `{raw: ...}` form was used.
    #[error("The `{{raw: \"...\"}}` syntax is no longer supported.  Use a literal instead.")]
    RawSyntax,

    /// The order spec is neither a list nor a literal, function or column.
    #[error("Order must be type of array or instance of a literal, function or column.")]
    InvalidOrder,

    /// An unknown `$`-prefixed operator name.
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// An operator received an operand it cannot use.
    #[error("Invalid operand for {op}: {reason}")]
    InvalidOperand {
        /// The operator spelling.
        op: &'static str,
        /// What was wrong with the operand.
        reason: String,
    },

    /// The where tree itself is malformed.
    #[error("Invalid where: {0}")]
    InvalidWhere(String),

    /// A model name is not present in the model graph.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// The dialect cannot express a feature.
    #[error("{feature} is not supported by the {dialect} dialect")]
    Unsupported {
        /// The dialect name.
        dialect: &'static str,
        /// The feature that was requested.
        feature: &'static str,
    },

    /// An unrecognized dialect name.
    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    /// A statement builder was used inconsistently.
    #[error("Invalid statement: {0}")]
    InvalidStatement(String),
}

/// Result type alias for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_messages() {
        assert_eq!(
            CompileError::UndefinedValue {
                key: "foo".to_string()
            }
            .to_string(),
            "WHERE parameter \"foo\" has invalid \"undefined\" value"
        );
        assert_eq!(
            CompileError::UnknownAssociation {
                model: "Project".to_string()
            }
            .to_string(),
            "Unable to find a valid association for model, 'Project'"
        );
        assert_eq!(
            CompileError::UnknownStructure("Project".to_string()).to_string(),
            "Unknown structure passed to order / group: Project"
        );
        assert!(CompileError::RawSyntax.to_string().starts_with(
            "The `{raw: \"...\"}` syntax is no longer supported."
        ));
    }
}

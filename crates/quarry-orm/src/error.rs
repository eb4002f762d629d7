//! Error types for the ORM layer.

use thiserror::Error;

use crate::constraint::NormalizedError;

/// Errors raised while compiling or running a statement.
#[derive(Debug, Error)]
pub enum OrmError {
    /// The statement could not be compiled.
    #[error("compile error: {0}")]
    Compile(#[from] quarry_core::CompileError),

    /// A driver error that is not tied to a statement (pool, I/O, decoding).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The statement failed and the failure was classified.
    #[error("{0}")]
    Constraint(NormalizedError),

    /// Invalid JSON input.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OrmError {
    /// The normalized error, if the statement reached the database and failed.
    #[must_use]
    pub const fn constraint(&self) -> Option<&NormalizedError> {
        match self {
            Self::Constraint(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias for ORM operations.
pub type Result<T> = std::result::Result<T, OrmError>;

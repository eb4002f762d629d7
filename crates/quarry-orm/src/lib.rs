//! # quarry-orm
//!
//! Classification of failed writes, plus a small SQLite executor built on
//! the quarry-core compilers.
//!
//! Every dialect's driver reports constraint violations differently. The
//! [`normalize`] entry point turns a raw [`DriverError`] into a
//! [`NormalizedError`]: unique, foreign key, check, exclusion, unknown
//! constraint, timeout, or a generic database error. The raw error is
//! always kept as the `cause`.
//!
//! ```
//! use quarry_core::DialectKind;
//! use quarry_orm::{normalize, ConstraintKind, DriverError};
//!
//! let raw = DriverError::new("UNIQUE constraint failed: Users.username")
//!     .code("SQLITE_CONSTRAINT_UNIQUE");
//! let normalized = normalize(&raw, DialectKind::Sqlite, None);
//! let err = normalized.primary().unwrap();
//!
//! assert_eq!(err.kind, ConstraintKind::Unique);
//! assert_eq!(err.table.as_deref(), Some("Users"));
//! assert_eq!(err.field_names(), vec!["username"]);
//! assert_eq!(err.cause, raw);
//! ```

pub mod constraint;
pub mod driver;
pub mod error;
pub mod executor;
pub mod normalize;

pub use constraint::{
    ConstraintError, ConstraintKind, FieldValue, NormalizedError, RelType, ValidationItem,
};
pub use driver::DriverError;
pub use error::{OrmError, Result};
pub use executor::Executor;
pub use normalize::{classifier_for, normalize, ErrorClassifier};

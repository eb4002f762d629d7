//! Values, operands and statement builders.
//!
//! # Example
//!
//! ```rust
//! use quarry_core::builder::{SelectQuery, TableRef};
//! use quarry_core::{Condition, DialectKind};
//!
//! let sql = SelectQuery::new(DialectKind::Postgres.policy())
//!     .columns(&["id", "name"])
//!     .from(TableRef::new("users"))
//!     .where_clause(Condition::eq("active", true))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(sql, "SELECT \"id\", \"name\" FROM \"users\" WHERE \"active\" = true");
//! ```

mod delete;
mod expr;
mod select;
mod update;
pub mod value;

pub use delete::BulkDeleteQuery;
pub use expr::{cast, col, func, literal, ColumnRef, Operand, TableRef};
pub use select::SelectQuery;
pub use update::BulkUpdateQuery;
pub use value::{RangeBound, RangeValue, SqlValue, ToSqlValue};

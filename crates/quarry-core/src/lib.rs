//! # quarry-core
//!
//! Compiles ORM-style query descriptions to SQL fragments for several
//! dialects.
//!
//! This crate provides:
//! - A where-tree compiler covering comparison, pattern, array, range and
//!   JSON operators
//! - ORDER BY / GROUP BY compilation through model associations
//! - Dialect policies for quoting, escaping, literals and paging
//! - SELECT, bulk DELETE and bulk UPDATE builders using the typestate pattern
//!
//! Values are always inlined as escaped literals.
//!
//! ## Where trees
//!
//! ```rust
//! use quarry_core::parse::where_from_json;
//! use quarry_core::{compile_where, CompileOptions, DialectKind};
//! use serde_json::json;
//!
//! let condition = where_from_json(&json!({
//!     "name": { "$startsWith": "al" },
//!     "$or": [{ "age": { "$gte": 18 } }, { "verified": true }]
//! }))
//! .unwrap();
//!
//! let sql = compile_where(
//!     &condition,
//!     &CompileOptions::default(),
//!     DialectKind::Postgres.policy(),
//! )
//! .unwrap();
//! assert_eq!(
//!     sql,
//!     "(\"age\" >= 18 OR \"verified\" = true) AND \"name\" LIKE 'al%'"
//! );
//! ```
//!
//! ## Injection safety
//!
//! ```rust
//! use quarry_core::{compile_where, CompileOptions, Condition, DialectKind};
//!
//! let user_input = "'; DROP TABLE users; --";
//! let sql = compile_where(
//!     &Condition::eq("name", user_input),
//!     &CompileOptions::default(),
//!     DialectKind::Mysql.policy(),
//! )
//! .unwrap();
//! assert_eq!(sql, "`name` = '\\'; DROP TABLE users; --'");
//! ```

pub mod builder;
pub mod dialect;
pub mod error;
pub mod model;
pub mod parse;
pub mod query;

pub use builder::{
    col, BulkDeleteQuery, BulkUpdateQuery, Operand, SelectQuery, SqlValue, TableRef,
};
pub use dialect::{Dialect, DialectKind};
pub use error::{CompileError, Result};
pub use model::{Association, AssociationKind, Attribute, DataType, Index, Model, ModelGraph};
pub use query::{
    compile_group, compile_order, compile_where, CompileOptions, Condition, GroupKind, Op,
    OrderItem, OrderToken, Predicate,
};

//! Where trees, operators and ORDER BY / GROUP BY compilation.

mod condition;
mod json;
mod operator;
mod order;
mod where_clause;

pub use condition::{Condition, GroupKind, Predicate};
pub use operator::Op;
pub use order::{compile_group, compile_order, OrderItem, OrderToken};
pub use where_clause::{compile_where, CompileOptions};

//! Bulk DELETE statement builder using the typestate pattern.

use std::marker::PhantomData;

use chrono::FixedOffset;

use super::expr::TableRef;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::model::Model;
use crate::query::{compile_where, CompileOptions, Condition};

// Typestate markers

/// Marker: No table specified yet.
pub struct NoTable;
/// Marker: Table has been specified.
pub struct HasTable;

/// A DELETE over every row matching a where tree.
///
/// Uses the typestate pattern to ensure that:
/// - `build()` is only available when a table is specified
/// - `where_clause()` is only available after the table is specified
pub struct BulkDeleteQuery<'a, Table> {
    dialect: &'a dyn Dialect,
    options: CompileOptions<'a>,
    table: Option<TableRef>,
    where_clause: Option<Condition>,
    limit: Option<u64>,
    _state: PhantomData<Table>,
}

impl<'a> BulkDeleteQuery<'a, NoTable> {
    /// Creates a DELETE builder for `dialect`.
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            dialect,
            options: CompileOptions::default(),
            table: None,
            where_clause: None,
            limit: None,
            _state: PhantomData,
        }
    }

    /// Specifies the table to delete from.
    #[must_use]
    pub fn from(self, table: TableRef) -> BulkDeleteQuery<'a, HasTable> {
        BulkDeleteQuery {
            dialect: self.dialect,
            options: self.options,
            table: Some(table),
            where_clause: self.where_clause,
            limit: self.limit,
            _state: PhantomData,
        }
    }

    /// Deletes from the table of `model`, resolving where keys against it.
    #[must_use]
    pub fn from_model(mut self, model: &'a Model) -> BulkDeleteQuery<'a, HasTable> {
        let table = model.schema.as_deref().map_or_else(
            || TableRef::new(&model.table),
            |schema| TableRef::qualified(schema, &model.table),
        );
        self.options = self.options.model(model);
        self.from(table)
    }
}

// Methods available after FROM
impl BulkDeleteQuery<'_, HasTable> {
    /// Adds a WHERE clause. Calling it again ANDs the conditions.
    ///
    /// **Important**: DELETE without WHERE deletes all rows!
    #[must_use]
    pub fn where_clause(mut self, condition: Condition) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Caps the number of deleted rows. Only some dialects accept it.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Renders dates in `timezone`.
    #[must_use]
    pub fn timezone(mut self, timezone: FixedOffset) -> Self {
        self.options = self.options.timezone(timezone);
        self
    }

    /// Returns true if a WHERE clause is specified.
    #[must_use]
    pub const fn has_where_clause(&self) -> bool {
        self.where_clause.is_some()
    }

    /// Builds the DELETE statement.
    ///
    /// **Warning**: If no WHERE clause is specified, this will delete ALL rows.
    pub fn build(self) -> Result<String> {
        let mut sql = String::from("DELETE FROM ");

        if let Some(ref table) = self.table {
            sql.push_str(&table.to_sql(self.dialect));
        }

        if let Some(ref condition) = self.where_clause {
            let fragment = compile_where(condition, &self.options, self.dialect)?;
            if !fragment.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&fragment);
            }
        }

        if let Some(n) = self.limit {
            if !self.dialect.supports_delete_limit() {
                return Err(self.dialect.unsupported("DELETE with LIMIT"));
            }
            sql.push_str(&format!(" LIMIT {n}"));
        }

        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Operand;
    use crate::dialect::DialectKind;
    use crate::error::CompileError;
    use crate::model::{Attribute, DataType};
    use crate::query::Predicate;

    #[test]
    fn test_simple_delete() {
        let sql = BulkDeleteQuery::new(DialectKind::Postgres.policy())
            .from(TableRef::new("users"))
            .where_clause(Condition::eq("id", 1))
            .build()
            .unwrap();

        assert_eq!(sql, "DELETE FROM \"users\" WHERE \"id\" = 1");
    }

    #[test]
    fn test_delete_all() {
        let query =
            BulkDeleteQuery::new(DialectKind::Sqlite.policy()).from(TableRef::new("temp_data"));
        assert!(!query.has_where_clause());
        assert_eq!(query.build().unwrap(), "DELETE FROM `temp_data`");
    }

    #[test]
    fn test_delete_from_model_maps_fields() {
        let model = Model::new("User", "user")
            .schema("app")
            .with_attribute(Attribute::new("createdAt", DataType::Date).field("created_at"));
        let sql = BulkDeleteQuery::new(DialectKind::Postgres.policy())
            .from_model(&model)
            .where_clause(Condition::is_null("createdAt"))
            .build()
            .unwrap();

        assert_eq!(
            sql,
            "DELETE FROM \"app\".\"user\" WHERE \"created_at\" IS NULL"
        );
    }

    #[test]
    fn test_delete_limit() {
        let sql = BulkDeleteQuery::new(DialectKind::Mysql.policy())
            .from(TableRef::new("users"))
            .where_clause(Condition::eq("status", "stale"))
            .limit(10)
            .build()
            .unwrap();
        assert_eq!(sql, "DELETE FROM `users` WHERE `status` = 'stale' LIMIT 10");

        let result = BulkDeleteQuery::new(DialectKind::Postgres.policy())
            .from(TableRef::new("users"))
            .limit(10)
            .build();
        assert_eq!(
            result,
            Err(CompileError::Unsupported {
                dialect: "postgres",
                feature: "DELETE with LIMIT",
            })
        );
    }

    #[test]
    fn test_delete_rejects_undefined() {
        let result = BulkDeleteQuery::new(DialectKind::Mysql.policy())
            .from(TableRef::new("users"))
            .where_clause(Condition::attr("id", Predicate::Value(Operand::Undefined)))
            .build();

        assert!(matches!(result, Err(CompileError::UndefinedValue { .. })));
    }

    #[test]
    fn test_delete_sql_injection_prevention() {
        let malicious = "1'; DROP TABLE users; --";
        let sql = BulkDeleteQuery::new(DialectKind::Postgres.policy())
            .from(TableRef::new("users"))
            .where_clause(Condition::eq("id", malicious))
            .build()
            .unwrap();

        assert_eq!(
            sql,
            "DELETE FROM \"users\" WHERE \"id\" = '1''; DROP TABLE users; --'"
        );
    }
}

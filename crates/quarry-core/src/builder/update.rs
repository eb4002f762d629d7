//! Bulk UPDATE statement builder using the typestate pattern.

use std::marker::PhantomData;

use chrono::FixedOffset;

use super::expr::{Operand, TableRef};
use crate::dialect::Dialect;
use crate::error::{CompileError, Result};
use crate::model::Model;
use crate::query::{compile_where, CompileOptions, Condition};

// Typestate markers

/// Marker: No table specified yet.
pub struct NoTable;
/// Marker: Table has been specified.
pub struct HasTable;
/// Marker: No SET clause specified yet.
pub struct NoSet;
/// Marker: SET clause has been specified.
pub struct HasSet;

/// An assignment in the SET clause.
struct Assignment {
    attribute: String,
    value: Operand,
}

/// An UPDATE over every row matching a where tree.
///
/// `build()` needs a table and at least one assignment. Attribute names are
/// mapped to their fields when the table comes from a model, and values are
/// rendered with the attribute's type.
pub struct BulkUpdateQuery<'a, Table, Set> {
    dialect: &'a dyn Dialect,
    options: CompileOptions<'a>,
    table: Option<TableRef>,
    assignments: Vec<Assignment>,
    where_clause: Option<Condition>,
    _state: PhantomData<(Table, Set)>,
}

impl<'a> BulkUpdateQuery<'a, NoTable, NoSet> {
    /// Creates an UPDATE builder for `dialect`.
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            dialect,
            options: CompileOptions::default(),
            table: None,
            assignments: vec![],
            where_clause: None,
            _state: PhantomData,
        }
    }

    /// Specifies the table to update.
    #[must_use]
    pub fn table(self, table: TableRef) -> BulkUpdateQuery<'a, HasTable, NoSet> {
        BulkUpdateQuery {
            dialect: self.dialect,
            options: self.options,
            table: Some(table),
            assignments: self.assignments,
            where_clause: self.where_clause,
            _state: PhantomData,
        }
    }

    /// Updates the table of `model`.
    #[must_use]
    pub fn model(mut self, model: &'a Model) -> BulkUpdateQuery<'a, HasTable, NoSet> {
        let table = model.schema.as_deref().map_or_else(
            || TableRef::new(&model.table),
            |schema| TableRef::qualified(schema, &model.table),
        );
        self.options = self.options.model(model);
        self.table(table)
    }
}

impl<'a, Set> BulkUpdateQuery<'a, HasTable, Set> {
    /// Adds a SET assignment.
    #[must_use]
    pub fn set(
        mut self,
        attribute: &str,
        value: impl Into<Operand>,
    ) -> BulkUpdateQuery<'a, HasTable, HasSet> {
        self.assignments.push(Assignment {
            attribute: String::from(attribute),
            value: value.into(),
        });
        BulkUpdateQuery {
            dialect: self.dialect,
            options: self.options,
            table: self.table,
            assignments: self.assignments,
            where_clause: self.where_clause,
            _state: PhantomData,
        }
    }

    /// Adds a WHERE clause. Calling it again ANDs the conditions.
    #[must_use]
    pub fn where_clause(mut self, condition: Condition) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Renders dates in `timezone`.
    #[must_use]
    pub fn timezone(mut self, timezone: FixedOffset) -> Self {
        self.options = self.options.timezone(timezone);
        self
    }
}

impl BulkUpdateQuery<'_, HasTable, HasSet> {
    fn assignment_sql(&self, assignment: &Assignment) -> Result<String> {
        if assignment.value.contains_undefined() {
            return Err(CompileError::UndefinedValue {
                key: assignment.attribute.clone(),
            });
        }
        let attribute = self
            .options
            .model
            .and_then(|model| model.attribute(&assignment.attribute));
        let field = attribute.map_or(assignment.attribute.as_str(), |a| a.field_name());
        let value = assignment.value.to_sql(
            self.dialect,
            attribute.map(|a| &a.data_type),
            self.options.timezone,
        )?;
        Ok(format!("{}={value}", self.dialect.quote_identifier(field)))
    }

    /// Builds the UPDATE statement.
    pub fn build(self) -> Result<String> {
        let mut sql = String::from("UPDATE ");

        if let Some(ref table) = self.table {
            sql.push_str(&table.to_sql(self.dialect));
        }

        sql.push_str(" SET ");
        let assignments = self
            .assignments
            .iter()
            .map(|assignment| self.assignment_sql(assignment))
            .collect::<Result<Vec<_>>>()?;
        sql.push_str(&assignments.join(","));

        if let Some(ref condition) = self.where_clause {
            let fragment = compile_where(condition, &self.options, self.dialect)?;
            if !fragment.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&fragment);
            }
        }

        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::value::SqlValue;
    use crate::builder::col;
    use crate::dialect::DialectKind;
    use crate::model::{Attribute, DataType};

    #[test]
    fn test_simple_update() {
        let sql = BulkUpdateQuery::new(DialectKind::Postgres.policy())
            .table(TableRef::new("users"))
            .set("name", "Bob")
            .where_clause(Condition::eq("id", 1))
            .build()
            .unwrap();

        assert_eq!(sql, "UPDATE \"users\" SET \"name\"='Bob' WHERE \"id\" = 1");
    }

    #[test]
    fn test_update_multiple_columns() {
        let sql = BulkUpdateQuery::new(DialectKind::Mysql.policy())
            .table(TableRef::new("users"))
            .set("name", "O'Neil")
            .set("active", false)
            .build()
            .unwrap();

        assert_eq!(sql, "UPDATE `users` SET `name`='O\\'Neil',`active`=false");
    }

    #[test]
    fn test_update_maps_fields_and_types() {
        let model = Model::new("User", "user")
            .with_attribute(Attribute::new("isAdmin", DataType::Boolean).field("is_admin"))
            .with_attribute(Attribute::new("counter", DataType::Integer));
        let sql = BulkUpdateQuery::new(DialectKind::Mssql.policy())
            .model(&model)
            .set("isAdmin", true)
            .set("counter", col("counter"))
            .where_clause(Condition::eq("isAdmin", false))
            .build()
            .unwrap();

        assert_eq!(
            sql,
            "UPDATE [user] SET [is_admin]=1,[counter]=[counter] WHERE [is_admin] = 0"
        );
    }

    #[test]
    fn test_update_rejects_undefined() {
        let result = BulkUpdateQuery::new(DialectKind::Postgres.policy())
            .table(TableRef::new("users"))
            .set("name", Operand::Undefined)
            .build();

        assert_eq!(
            result,
            Err(CompileError::UndefinedValue {
                key: "name".to_string()
            })
        );
    }

    #[test]
    fn test_update_null() {
        let sql = BulkUpdateQuery::new(DialectKind::Sqlite.policy())
            .table(TableRef::new("users"))
            .set("deleted_at", SqlValue::Null)
            .build()
            .unwrap();
        assert_eq!(sql, "UPDATE `users` SET `deleted_at`=NULL");
    }

    // This would fail to compile: UPDATE without SET
    // #[test]
    // fn test_update_without_set_fails() {
    //     let _ = BulkUpdateQuery::new(DialectKind::Postgres.policy())
    //         .table(TableRef::new("users"))
    //         .build();  // Error: method `build` not found
    // }
}

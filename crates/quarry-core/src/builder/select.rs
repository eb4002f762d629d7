//! SELECT statement builder using the typestate pattern.
//!
//! `build()` is only available once a FROM target is known, so a statement
//! without a table cannot be written.

use std::marker::PhantomData;

use chrono::FixedOffset;

use super::expr::TableRef;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::model::{Model, ModelGraph};
use crate::query::{compile_group, compile_order, compile_where, CompileOptions, Condition, OrderItem};

// Typestate markers

/// Marker: No FROM clause specified yet.
pub struct NoFrom;
/// Marker: FROM clause has been specified.
pub struct HasFrom;

/// A SELECT statement over one table or model.
///
/// When built from a model, the table is aliased by the model name, columns
/// map attributes to fields, and where / order keys are qualified by the
/// alias:
///
/// ```text
/// SELECT "id", "created_at" AS "createdAt" FROM "user" AS "User" WHERE "User"."id" = 1
/// ```
pub struct SelectQuery<'a, From> {
    dialect: &'a dyn Dialect,
    options: CompileOptions<'a>,
    distinct: bool,
    columns: Vec<String>,
    table: Option<TableRef>,
    alias: Option<String>,
    where_clause: Option<Condition>,
    group_by: Vec<OrderItem>,
    order_by: Vec<OrderItem>,
    limit: Option<u64>,
    offset: Option<u64>,
    _state: PhantomData<From>,
}

impl<'a> SelectQuery<'a, NoFrom> {
    /// Creates a SELECT builder for `dialect`.
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            dialect,
            options: CompileOptions::default(),
            distinct: false,
            columns: vec![],
            table: None,
            alias: None,
            where_clause: None,
            group_by: vec![],
            order_by: vec![],
            limit: None,
            offset: None,
            _state: PhantomData,
        }
    }

    /// Selects from a plain table.
    #[must_use]
    pub fn from(self, table: TableRef) -> SelectQuery<'a, HasFrom> {
        self.into_from(table, None)
    }

    /// Selects from the table of `model`, aliased by the model name.
    #[must_use]
    pub fn from_model(mut self, model: &'a Model) -> SelectQuery<'a, HasFrom> {
        let table = model.schema.as_deref().map_or_else(
            || TableRef::new(&model.table),
            |schema| TableRef::qualified(schema, &model.table),
        );
        self.options = self.options.model(model).prefix(TableRef::new(&model.name));
        self.into_from(table, Some(model.name.clone()))
    }

    fn into_from(self, table: TableRef, alias: Option<String>) -> SelectQuery<'a, HasFrom> {
        SelectQuery {
            dialect: self.dialect,
            options: self.options,
            distinct: self.distinct,
            columns: self.columns,
            table: Some(table),
            alias,
            where_clause: self.where_clause,
            group_by: self.group_by,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
            _state: PhantomData,
        }
    }
}

impl<'a, From> SelectQuery<'a, From> {
    /// Specifies the attributes (or columns) to select.
    #[must_use]
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| String::from(*s)).collect();
        self
    }

    /// Sets DISTINCT.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Follows associations through `graph` in `$a.b$` keys and order paths.
    #[must_use]
    pub fn graph(mut self, graph: &'a ModelGraph) -> Self {
        self.options = self.options.graph(graph);
        self
    }

    /// Renders dates in `timezone`.
    #[must_use]
    pub fn timezone(mut self, timezone: FixedOffset) -> Self {
        self.options = self.options.timezone(timezone);
        self
    }
}

// Methods available after FROM
impl SelectQuery<'_, HasFrom> {
    /// Adds a WHERE clause. Calling it again ANDs the conditions.
    #[must_use]
    pub fn where_clause(mut self, condition: Condition) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Adds GROUP BY entries.
    #[must_use]
    pub fn group_by(mut self, items: Vec<OrderItem>) -> Self {
        self.group_by.extend(items);
        self
    }

    /// Adds ORDER BY entries.
    #[must_use]
    pub fn order_by(mut self, items: Vec<OrderItem>) -> Self {
        self.order_by.extend(items);
        self
    }

    /// Adds a LIMIT clause.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Adds an OFFSET clause.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    fn column_list(&self) -> String {
        let dialect = self.dialect;
        let quote_column = |name: &str| {
            let Some(attribute) = self.options.model.and_then(|model| model.attribute(name)) else {
                return dialect.quote_identifier(name);
            };
            let field = attribute.field_name();
            if field == name {
                dialect.quote_identifier(field)
            } else {
                format!(
                    "{} AS {}",
                    dialect.quote_identifier(field),
                    dialect.quote_identifier(name)
                )
            }
        };
        match (&self.columns[..], self.options.model) {
            ([], Some(model)) if !model.attributes.is_empty() => model
                .attributes
                .iter()
                .map(|attribute| quote_column(&attribute.name))
                .collect::<Vec<_>>()
                .join(", "),
            ([], _) => String::from("*"),
            (columns, _) => columns
                .iter()
                .map(|name| quote_column(name))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Builds the SELECT statement.
    pub fn build(self) -> Result<String> {
        let dialect = self.dialect;
        let mut sql = String::from("SELECT ");

        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        sql.push_str(&self.column_list());

        if let Some(ref table) = self.table {
            sql.push_str(" FROM ");
            sql.push_str(&table.to_sql(dialect));
        }

        if let Some(ref alias) = self.alias {
            sql.push_str(" AS ");
            sql.push_str(&dialect.quote_identifier(alias));
        }

        if let Some(ref condition) = self.where_clause {
            let fragment = compile_where(condition, &self.options, dialect)?;
            if !fragment.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&fragment);
            }
        }

        let group = compile_group(&self.group_by, &self.options, dialect)?;
        if !group.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group);
        }

        let order = compile_order(&self.order_by, &self.options, dialect)?;
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        } else if dialect.offset_requires_order() && (self.limit.is_some() || self.offset.is_some())
        {
            sql.push_str(" ORDER BY (SELECT NULL)");
        }

        sql.push_str(&dialect.limit_clause(self.limit, self.offset));

        Ok(sql)
    }
}

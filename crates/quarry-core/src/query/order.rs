//! ORDER BY and GROUP BY compilation.
//!
//! An order item is either an expression (column, literal, function call,
//! random) or a path of tokens. A path walks associations from the base model,
//! names an attribute of the model it arrives at, and may end with a direction:
//!
//! ```text
//! [Task, Project, "createdAt", "DESC"]  ->  [Task->Project].[created_at] DESC
//! ```

use tracing::debug;

use super::where_clause::{resolve_reference, CompileOptions};
use crate::builder::{ColumnRef, Operand};
use crate::dialect::Dialect;
use crate::error::{CompileError, Result};
use crate::model::{Association, AssociationKind, Model};

/// One ORDER BY / GROUP BY entry.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderItem {
    /// A path of tokens resolved against the base model.
    Path(Vec<OrderToken>),
    /// A column reference, rendered without the model qualifier.
    Column(ColumnRef),
    /// Raw SQL.
    Literal(String),
    /// A function call.
    Fn {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<Operand>,
    },
    /// Random ordering.
    Random,
}

/// One element of an order path.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderToken {
    /// A model reached through an association, optionally by alias.
    Model {
        /// Target model name.
        name: String,
        /// Association alias, when several associations reach the model.
        alias: Option<String>,
    },
    /// An association of the current model, by alias.
    Association(String),
    /// An association alias, an attribute, a `$a.b$` reference or a direction.
    Name(String),
    /// An expression used in place of an attribute.
    Expr(Operand),
}

impl OrderToken {
    /// Creates a name token.
    #[must_use]
    pub fn name(name: &str) -> Self {
        Self::Name(name.to_string())
    }

    /// Creates a model token.
    #[must_use]
    pub fn model(name: &str) -> Self {
        Self::Model {
            name: name.to_string(),
            alias: None,
        }
    }

    /// Label used in error messages.
    fn label(&self) -> String {
        match self {
            Self::Model { name, .. } => name.clone(),
            Self::Association(alias) | Self::Name(alias) => alias.clone(),
            Self::Expr(operand) => format!("{operand:?}"),
        }
    }
}

impl OrderItem {
    /// Orders by `name` on the base model.
    #[must_use]
    pub fn attr(name: &str) -> Self {
        Self::Path(vec![OrderToken::name(name)])
    }

    /// Orders by `name` on the base model in `direction`.
    #[must_use]
    pub fn attr_dir(name: &str, direction: &str) -> Self {
        Self::Path(vec![OrderToken::name(name), OrderToken::name(direction)])
    }
}

/// Normalizes a direction token, case-insensitively.
fn direction(token: &str) -> Option<&'static str> {
    const DIRECTIONS: [&str; 8] = [
        "ASC",
        "DESC",
        "ASC NULLS LAST",
        "DESC NULLS LAST",
        "ASC NULLS FIRST",
        "DESC NULLS FIRST",
        "NULLS FIRST",
        "NULLS LAST",
    ];
    let normalized = token
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    DIRECTIONS.into_iter().find(|d| *d == normalized)
}

/// Compiles ORDER BY entries, without the keyword.
pub fn compile_order(
    items: &[OrderItem],
    options: &CompileOptions<'_>,
    dialect: &dyn Dialect,
) -> Result<String> {
    let sql = OrderCompiler {
        dialect,
        options,
        directions: true,
    }
    .items(items)?;
    debug!(dialect = dialect.name(), sql = %sql, "compiled order");
    Ok(sql)
}

/// Compiles GROUP BY entries, without the keyword. Directions are rejected.
pub fn compile_group(
    items: &[OrderItem],
    options: &CompileOptions<'_>,
    dialect: &dyn Dialect,
) -> Result<String> {
    let sql = OrderCompiler {
        dialect,
        options,
        directions: false,
    }
    .items(items)?;
    debug!(dialect = dialect.name(), sql = %sql, "compiled group");
    Ok(sql)
}

/// A resolved association hop.
struct Hop<'g> {
    alias: String,
    model: &'g Model,
    association: Option<&'g Association>,
}

struct OrderCompiler<'a> {
    dialect: &'a dyn Dialect,
    options: &'a CompileOptions<'a>,
    directions: bool,
}

impl<'a> OrderCompiler<'a> {
    fn items(&self, items: &[OrderItem]) -> Result<String> {
        let parts = items
            .iter()
            .map(|item| self.item(item))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", "))
    }

    fn item(&self, item: &OrderItem) -> Result<String> {
        match item {
            OrderItem::Path(tokens) => self.path(tokens),
            OrderItem::Column(column) => Ok(column.to_sql(self.dialect)),
            OrderItem::Literal(sql) => Ok(sql.clone()),
            OrderItem::Fn { name, args } => Operand::Fn {
                name: name.clone(),
                args: args.clone(),
            }
            .to_sql(self.dialect, None, self.options.timezone),
            OrderItem::Random => Ok(self.dialect.random_function().to_string()),
        }
    }

    fn target_model(&self, name: &str) -> Result<&'a Model> {
        self.options
            .graph
            .ok_or_else(|| CompileError::UnknownModel(name.to_string()))?
            .model(name)
    }

    /// Tries to read `token` as a hop from `current`.
    fn hop(
        &self,
        current: Option<&'a Model>,
        previous: Option<&'a Association>,
        token: &OrderToken,
    ) -> Result<Option<Hop<'a>>> {
        match token {
            OrderToken::Model { name, alias } => {
                // A many-to-many hop may be followed by its join model.
                if let Some(through) = previous
                    .filter(|assoc| assoc.kind == AssociationKind::BelongsToMany)
                    .and_then(|assoc| assoc.through.as_deref())
                    .filter(|through| *through == name.as_str())
                {
                    return Ok(Some(Hop {
                        alias: through.to_string(),
                        model: self.target_model(through)?,
                        association: None,
                    }));
                }
                let association = current
                    .and_then(|model| model.association_to(name, alias.as_deref()))
                    .ok_or_else(|| CompileError::UnknownAssociation {
                        model: name.clone(),
                    })?;
                Ok(Some(Hop {
                    alias: association.alias.clone(),
                    model: self.target_model(&association.target)?,
                    association: Some(association),
                }))
            }
            OrderToken::Association(alias) => {
                let association = current
                    .and_then(|model| model.association(alias))
                    .ok_or_else(|| CompileError::UnknownAssociation {
                        model: alias.clone(),
                    })?;
                Ok(Some(Hop {
                    alias: association.alias.clone(),
                    model: self.target_model(&association.target)?,
                    association: Some(association),
                }))
            }
            OrderToken::Name(name) => {
                let Some(association) = current.and_then(|model| model.association(name)) else {
                    return Ok(None);
                };
                Ok(Some(Hop {
                    alias: association.alias.clone(),
                    model: self.target_model(&association.target)?,
                    association: Some(association),
                }))
            }
            OrderToken::Expr(_) => Ok(None),
        }
    }

    fn path(&self, tokens: &[OrderToken]) -> Result<String> {
        let Some(last) = tokens.len().checked_sub(1) else {
            return Ok(String::new());
        };

        let mut current = self.options.model;
        let mut previous = None;
        let mut aliases: Vec<String> = Vec::new();
        let mut index = 0;
        while index < last {
            match self.hop(current, previous, &tokens[index])? {
                Some(hop) => {
                    aliases.push(hop.alias);
                    current = Some(hop.model);
                    previous = hop.association;
                    index += 1;
                }
                None => break,
            }
        }

        let mut sql = self.terminal(&tokens[index], current, &aliases)?;

        for token in &tokens[index + 1..] {
            match token {
                OrderToken::Name(name) if self.directions => match direction(name) {
                    Some(direction) => {
                        sql.push(' ');
                        sql.push_str(direction);
                    }
                    None => return Err(CompileError::UnknownStructure(name.clone())),
                },
                other => return Err(CompileError::UnknownStructure(other.label())),
            }
        }
        Ok(sql)
    }

    /// Renders the attribute (or expression) a path arrives at.
    fn terminal(
        &self,
        token: &OrderToken,
        current: Option<&Model>,
        aliases: &[String],
    ) -> Result<String> {
        let name = match token {
            OrderToken::Name(name) => name,
            OrderToken::Expr(operand) => {
                return operand.to_sql(self.dialect, None, self.options.timezone);
            }
            other => return Err(CompileError::UnknownStructure(other.label())),
        };

        if !aliases.is_empty() && direction(name).is_some() {
            return Err(CompileError::UnknownStructure(name.clone()));
        }

        if let Some(reference) = name
            .strip_prefix('$')
            .and_then(|rest| rest.strip_suffix('$'))
            .filter(|inner| !inner.is_empty())
        {
            if !aliases.is_empty() {
                return Err(CompileError::UnknownStructure(name.clone()));
            }
            return Ok(resolve_reference(self.dialect, self.options, reference).0);
        }

        let qualifier = if aliases.is_empty() {
            match (&self.options.prefix, current) {
                (Some(prefix), _) => Some(prefix.to_sql(self.dialect)),
                (None, Some(model)) => Some(self.dialect.quote_identifier(&model.name)),
                (None, None) => None,
            }
        } else {
            Some(self.dialect.quote_identifier(&aliases.join("->")))
        };

        if let Some((root, tail)) = name.split_once('.') {
            let json_root = current
                .and_then(|model| model.attribute(root))
                .filter(|attribute| attribute.data_type.is_json());
            if let Some(attribute) = json_root {
                let column = self.dialect.quote_identifier(attribute.field_name());
                let column = match qualifier {
                    Some(qualifier) => format!("{qualifier}.{column}"),
                    None => column,
                };
                let path: Vec<String> = tail.split('.').map(String::from).collect();
                return self.dialect.json_path_extraction(&column, &path, false);
            }
            if aliases.is_empty() {
                return Ok(resolve_reference(self.dialect, self.options, name).0);
            }
        }

        let field = current.map_or(name.as_str(), |model| model.field_name(name));
        let column = self.dialect.quote_identifier(field);
        Ok(match qualifier {
            Some(qualifier) => format!("{qualifier}.{column}"),
            None => column,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;
    use crate::model::{Attribute, DataType, ModelGraph};

    fn graph() -> ModelGraph {
        let base = |name: &str, table: &str| {
            Model::new(name, table)
                .with_attribute(Attribute::new("id", DataType::Integer))
                .with_attribute(Attribute::new("name", DataType::String))
                .with_attribute(Attribute::new("createdAt", DataType::Date).field("created_at"))
        };
        ModelGraph::new()
            .with_model(
                base("Subtask", "subtask")
                    .with_attribute(Attribute::new("metadata", DataType::Json))
                    .with_association(Association::belongs_to("Task", "Task")),
            )
            .with_model(
                base("Task", "task")
                    .with_association(Association::belongs_to("Project", "Project")),
            )
            .with_model(base("Project", "project"))
    }

    fn compile(kind: DialectKind, items: &[OrderItem]) -> Result<String> {
        let graph = graph();
        let subtask = graph.model("Subtask").unwrap();
        let options = CompileOptions::new().model(subtask).graph(&graph);
        compile_order(items, &options, kind.policy())
    }

    fn mssql(items: &[OrderItem]) -> String {
        compile(DialectKind::Mssql, items).unwrap()
    }

    #[test]
    fn test_direction_normalization() {
        assert_eq!(direction("asc"), Some("ASC"));
        assert_eq!(direction("desc  nulls first"), Some("DESC NULLS FIRST"));
        assert_eq!(direction("sideways"), None);
    }

    #[test]
    fn test_plain_attribute_is_model_qualified() {
        assert_eq!(
            mssql(&[OrderItem::attr_dir("createdAt", "ASC")]),
            "[Subtask].[created_at] ASC"
        );
    }

    #[test]
    fn test_untupled_direction_is_a_column() {
        assert_eq!(
            mssql(&[OrderItem::attr("name"), OrderItem::attr("ASC")]),
            "[Subtask].[name], [Subtask].[ASC]"
        );
    }

    #[test]
    fn test_hops_join_aliases() {
        let item = OrderItem::Path(vec![
            OrderToken::model("Task"),
            OrderToken::Association("Project".to_string()),
            OrderToken::name("createdAt"),
            OrderToken::name("desc"),
        ]);
        assert_eq!(mssql(&[item]), "[Task->Project].[created_at] DESC");
    }

    #[test]
    fn test_unknown_association() {
        let item = OrderItem::Path(vec![
            OrderToken::model("Project"),
            OrderToken::name("createdAt"),
        ]);
        assert_eq!(
            compile(DialectKind::Mssql, &[item]),
            Err(CompileError::UnknownAssociation {
                model: "Project".to_string()
            })
        );
    }

    #[test]
    fn test_association_after_attribute() {
        let item = OrderItem::Path(vec![
            OrderToken::model("Task"),
            OrderToken::name("createdAt"),
            OrderToken::Association("Project".to_string()),
            OrderToken::name("ASC"),
        ]);
        assert_eq!(
            compile(DialectKind::Mssql, &[item]),
            Err(CompileError::UnknownStructure("Project".to_string()))
        );
    }

    #[test]
    fn test_dollar_reference() {
        assert_eq!(
            mssql(&[OrderItem::attr_dir("$Task.name$", "DESC")]),
            "[Task].[name] DESC"
        );
    }

    #[test]
    fn test_json_attribute_path() {
        assert_eq!(
            compile(
                DialectKind::Postgres,
                &[OrderItem::attr_dir("metadata.json.path", "ASC")]
            )
            .unwrap(),
            "(\"Subtask\".\"metadata\"#>>'{json,path}') ASC"
        );
    }

    #[test]
    fn test_expressions() {
        assert_eq!(
            mssql(&[
                OrderItem::Column(ColumnRef::parse("name")),
                OrderItem::Literal("1 DESC".to_string()),
                OrderItem::Random,
            ]),
            "[name], 1 DESC, RAND()"
        );
        assert_eq!(
            compile(DialectKind::Sqlite, &[OrderItem::Random]).unwrap(),
            "RANDOM()"
        );
    }

    #[test]
    fn test_group_rejects_directions() {
        let graph = graph();
        let options = CompileOptions::new()
            .model(graph.model("Subtask").unwrap())
            .graph(&graph);
        let mssql = DialectKind::Mssql.policy();
        assert_eq!(
            compile_group(&[OrderItem::attr("name")], &options, mssql).unwrap(),
            "[Subtask].[name]"
        );
        assert!(compile_group(&[OrderItem::attr_dir("name", "ASC")], &options, mssql).is_err());
    }
}

//! Subcommands and their execution.

use anyhow::Context;
use clap::Subcommand;
use quarry_core::parse::{order_from_json, where_from_json};
use quarry_core::{
    compile_group, compile_order, compile_where, CompileOptions, DialectKind, Model, SelectQuery,
    TableRef,
};
use quarry_orm::{normalize, DriverError};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a JSON where tree into a WHERE fragment.
    Where {
        /// The where tree, as JSON.
        tree: String,

        /// Model used to map attributes to columns.
        #[arg(short, long)]
        model: Option<String>,

        /// Table or alias qualifying every column (`schema.table` allowed).
        #[arg(short, long)]
        prefix: Option<String>,
    },

    /// Compile a JSON order spec into an ORDER BY fragment.
    Order {
        /// The order spec, as JSON.
        spec: String,

        /// Base model of the association paths.
        #[arg(short, long)]
        model: String,
    },

    /// Compile a JSON order spec into a GROUP BY fragment.
    Group {
        /// The group spec, as JSON.
        spec: String,

        /// Base model of the association paths.
        #[arg(short, long)]
        model: String,
    },

    /// Build a full SELECT over a model.
    Select {
        /// Model to select from.
        #[arg(short, long)]
        model: String,

        /// Where tree, as JSON.
        #[arg(short, long = "where")]
        where_tree: Option<String>,

        /// Order spec, as JSON.
        #[arg(short, long)]
        order: Option<String>,

        /// Maximum number of rows.
        #[arg(short, long)]
        limit: Option<u64>,

        /// Rows to skip.
        #[arg(long)]
        offset: Option<u64>,
    },

    /// Normalize a raw driver error given as JSON.
    ClassifyError {
        /// The driver error payload, as JSON.
        error: String,

        /// Model whose unique indexes refine the result.
        #[arg(short, long)]
        model: Option<String>,
    },
}

fn parse_json(label: &str, text: &str) -> anyhow::Result<Value> {
    serde_json::from_str(text).with_context(|| format!("invalid {label} JSON"))
}

fn table_ref(prefix: &str) -> TableRef {
    match prefix.split_once('.') {
        Some((schema, table)) => TableRef::qualified(schema, table),
        None => TableRef::new(prefix),
    }
}

fn model<'a>(config: &'a Config, name: &str) -> anyhow::Result<&'a Model> {
    Ok(config.graph.model(name)?)
}

impl Commands {
    /// Runs the command and returns what should be printed.
    pub fn run(&self, config: &Config, dialect: DialectKind) -> anyhow::Result<String> {
        let policy = dialect.policy();
        let base = CompileOptions::new()
            .graph(&config.graph)
            .timezone(config.timezone()?);

        let output = match self {
            Self::Where {
                tree,
                model: model_name,
                prefix,
            } => {
                let condition = where_from_json(&parse_json("where", tree)?)?;
                let mut options = base;
                if let Some(name) = model_name {
                    options = options.model(model(config, name)?);
                }
                if let Some(prefix) = prefix.as_deref().or(config.prefix.as_deref()) {
                    options = options.prefix(table_ref(prefix));
                }
                compile_where(&condition, &options, policy)?
            }

            Self::Order {
                spec,
                model: model_name,
            } => {
                let items = order_from_json(&parse_json("order", spec)?)?;
                compile_order(&items, &base.model(model(config, model_name)?), policy)?
            }

            Self::Group {
                spec,
                model: model_name,
            } => {
                let items = order_from_json(&parse_json("group", spec)?)?;
                compile_group(&items, &base.model(model(config, model_name)?), policy)?
            }

            Self::Select {
                model: model_name,
                where_tree,
                order,
                limit,
                offset,
            } => {
                let mut query = SelectQuery::new(policy)
                    .from_model(model(config, model_name)?)
                    .graph(&config.graph)
                    .timezone(config.timezone()?);
                if let Some(tree) = where_tree {
                    query = query.where_clause(where_from_json(&parse_json("where", tree)?)?);
                }
                if let Some(spec) = order {
                    query = query.order_by(order_from_json(&parse_json("order", spec)?)?);
                }
                if let Some(n) = limit {
                    query = query.limit(*n);
                }
                if let Some(n) = offset {
                    query = query.offset(*n);
                }
                query.build()?
            }

            Self::ClassifyError {
                error,
                model: model_name,
            } => {
                let raw: DriverError =
                    serde_json::from_str(error).context("invalid driver error JSON")?;
                let model = model_name
                    .as_deref()
                    .map(|name| model(config, name))
                    .transpose()?;
                serde_json::to_string_pretty(&normalize(&raw, dialect, model))?
            }
        };

        debug!(dialect = %dialect, output = %output, "Command finished");
        Ok(output)
    }
}

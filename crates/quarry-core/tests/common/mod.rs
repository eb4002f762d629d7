#![allow(dead_code)]

use quarry_core::parse::{order_from_json, where_from_json};
use quarry_core::{
    compile_order, compile_where, Association, Attribute, CompileError, CompileOptions, DataType,
    DialectKind, Model, ModelGraph,
};
use serde_json::Value;

fn base(name: &str, table: &str) -> Model {
    Model::new(name, table)
        .with_attribute(Attribute::new("id", DataType::Integer))
        .with_attribute(Attribute::new("name", DataType::String))
        .with_attribute(Attribute::new("createdAt", DataType::Date).field("created_at"))
        .with_attribute(Attribute::new("updatedAt", DataType::Date).field("updated_at"))
}

/// User, Project, ProjectUser, Task and Subtask with their associations.
pub fn graph() -> ModelGraph {
    ModelGraph::new()
        .with_model(
            base("User", "user").with_association(Association::belongs_to_many(
                "ProjectUserProjects",
                "Project",
                "ProjectUser",
            )),
        )
        .with_model(
            base("Project", "project")
                .with_association(Association::has_many("Tasks", "Task"))
                .with_association(Association::belongs_to_many(
                    "ProjectUserUsers",
                    "User",
                    "ProjectUser",
                )),
        )
        .with_model(
            base("ProjectUser", "project_user")
                .with_association(Association::belongs_to("User", "User"))
                .with_association(Association::belongs_to("Project", "Project")),
        )
        .with_model(
            base("Task", "task")
                .with_attribute(Attribute::new("projectId", DataType::Integer).field("project_id"))
                .with_association(Association::belongs_to("Project", "Project"))
                .with_association(Association::has_many("Subtasks", "Subtask")),
        )
        .with_model(
            base("Subtask", "subtask")
                .with_attribute(Attribute::new("taskId", DataType::Integer).field("task_id"))
                .with_attribute(Attribute::new("metadata", DataType::Json))
                .with_association(Association::belongs_to("Task", "Task")),
        )
}

/// Compiles a JSON where tree without a model.
pub fn where_sql(kind: DialectKind, tree: &Value) -> Result<String, CompileError> {
    let condition = where_from_json(tree)?;
    compile_where(&condition, &CompileOptions::default(), kind.policy())
}

/// Compiles a JSON where tree, panicking on error.
pub fn where_ok(kind: DialectKind, tree: &Value) -> String {
    where_sql(kind, tree).unwrap_or_else(|e| panic!("Failed to compile {tree} for {kind}: {e}"))
}

/// Compiles a JSON where tree against a model of the graph.
pub fn where_on(kind: DialectKind, model: &str, tree: &Value) -> Result<String, CompileError> {
    let graph = graph();
    let model = graph.model(model)?;
    let condition = where_from_json(tree)?;
    let options = CompileOptions::new().model(model).graph(&graph);
    compile_where(&condition, &options, kind.policy())
}

/// Compiles a JSON order spec against a model of the graph.
pub fn order_on(kind: DialectKind, model: &str, spec: &Value) -> Result<String, CompileError> {
    let graph = graph();
    let model = graph.model(model)?;
    let items = order_from_json(spec)?;
    let options = CompileOptions::new().model(model).graph(&graph);
    compile_order(&items, &options, kind.policy())
}

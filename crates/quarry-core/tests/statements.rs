//! Full statements and model graphs loaded from JSON.

mod common;
use common::*;

use quarry_core::parse::{order_from_json, where_from_json};
use quarry_core::{
    BulkDeleteQuery, BulkUpdateQuery, CompileError, Condition, DataType, DialectKind, ModelGraph,
    Operand, SelectQuery, TableRef,
};
use serde_json::json;

fn undefined_tree() -> serde_json::Value {
    json!({ "id": 1, "user": { "$undefined": true } })
}

#[test]
fn undefined_is_rejected_in_every_statement() {
    let graph = graph();
    let task = graph.model("Task").unwrap();
    let condition = where_from_json(&undefined_tree()).unwrap();
    let expected = Err(CompileError::UndefinedValue {
        key: "user".to_string(),
    });

    for kind in DialectKind::ALL {
        assert_eq!(where_sql(kind, &undefined_tree()), expected, "{kind}");
        assert_eq!(
            SelectQuery::new(kind.policy())
                .from_model(task)
                .where_clause(condition.clone())
                .build(),
            expected,
            "{kind}"
        );
        assert_eq!(
            BulkDeleteQuery::new(kind.policy())
                .from_model(task)
                .where_clause(condition.clone())
                .build(),
            expected,
            "{kind}"
        );
        assert_eq!(
            BulkUpdateQuery::new(kind.policy())
                .model(task)
                .set("name", "x")
                .where_clause(condition.clone())
                .build(),
            expected,
            "{kind}"
        );
    }
}

#[test]
fn select_with_associations() {
    let graph = graph();
    let subtask = graph.model("Subtask").unwrap();
    let sql = SelectQuery::new(DialectKind::Postgres.policy())
        .columns(&["id", "taskId"])
        .from_model(subtask)
        .graph(&graph)
        .where_clause(where_from_json(&json!({ "$Task.name$": { "$ne": null } })).unwrap())
        .order_by(order_from_json(&json!([["Task", "createdAt", "DESC"]])).unwrap())
        .limit(5)
        .build()
        .unwrap();

    assert_eq!(
        sql,
        "SELECT \"id\", \"task_id\" AS \"taskId\" FROM \"subtask\" AS \"Subtask\" \
         WHERE \"Task\".\"name\" IS NOT NULL ORDER BY \"Task\".\"created_at\" DESC LIMIT 5"
    );
}

#[test]
fn paging_per_dialect() {
    let page = |kind: DialectKind| {
        SelectQuery::new(kind.policy())
            .from(TableRef::new("t"))
            .order_by(order_from_json(&json!([{ "$col": "id" }])).unwrap())
            .limit(10)
            .offset(30)
            .build()
            .unwrap()
    };
    assert_eq!(
        page(DialectKind::Sqlite),
        "SELECT * FROM `t` ORDER BY `id` LIMIT 10 OFFSET 30"
    );
    assert_eq!(
        page(DialectKind::Mariadb),
        "SELECT * FROM `t` ORDER BY `id` LIMIT 30, 10"
    );
    assert_eq!(
        page(DialectKind::Mssql),
        "SELECT * FROM [t] ORDER BY [id] OFFSET 30 ROWS FETCH NEXT 10 ROWS ONLY"
    );
}

#[test]
fn bulk_statements_from_json() {
    let graph = graph();
    let task = graph.model("Task").unwrap();
    let condition = where_from_json(&json!({ "projectId": { "$in": [1, 2] } })).unwrap();

    assert_eq!(
        BulkDeleteQuery::new(DialectKind::Mysql.policy())
            .from_model(task)
            .where_clause(condition.clone())
            .limit(100)
            .build()
            .unwrap(),
        "DELETE FROM `task` WHERE `project_id` IN (1, 2) LIMIT 100"
    );
    assert_eq!(
        BulkUpdateQuery::new(DialectKind::Postgres.policy())
            .model(task)
            .set("projectId", 3)
            .where_clause(condition)
            .build()
            .unwrap(),
        "UPDATE \"task\" SET \"project_id\"=3 WHERE \"project_id\" IN (1, 2)"
    );
}

#[test]
fn model_graph_from_json() {
    let graph: ModelGraph = serde_json::from_value(json!({
        "models": [
            {
                "name": "User",
                "table": "users",
                "attributes": [
                    { "name": "id", "type": "INTEGER" },
                    { "name": "username", "type": "STRING" },
                    { "name": "tags", "type": "ARRAY(TEXT)" },
                    { "name": "createdAt", "field": "created_at", "type": "DATE" }
                ],
                "associations": [
                    { "as": "Posts", "target": "Post", "kind": "hasMany" }
                ],
                "indexes": [
                    { "name": "users_username", "fields": ["username"], "msg": "taken" }
                ]
            },
            { "name": "Post", "table": "posts" }
        ]
    }))
    .unwrap();

    let user = graph.model("User").unwrap();
    assert_eq!(user.field_name("createdAt"), "created_at");
    assert_eq!(
        user.attribute("tags").map(|a| a.data_type.clone()),
        Some(DataType::Array(Box::new(DataType::Text)))
    );
    assert!(user.association("Posts").is_some());
    assert_eq!(
        user.unique_index_named("users_username")
            .and_then(|index| index.msg.as_deref()),
        Some("taken")
    );
    assert_eq!(graph.model_for_table("posts").map(|m| m.name.as_str()), Some("Post"));
    assert_eq!(
        graph.model("Comment"),
        Err(CompileError::UnknownModel("Comment".to_string()))
    );
}

#[test]
fn chained_empty_conditions_leave_the_statement_unfiltered() {
    let pg = DialectKind::Postgres.policy();
    assert_eq!(
        SelectQuery::new(pg)
            .from(TableRef::new("users"))
            .where_clause(Condition::All(vec![]))
            .where_clause(Condition::All(vec![]))
            .build()
            .unwrap(),
        "SELECT * FROM \"users\""
    );
    assert_eq!(
        BulkDeleteQuery::new(pg)
            .from(TableRef::new("users"))
            .where_clause(Condition::All(vec![]))
            .where_clause(Condition::eq("id", 1))
            .build()
            .unwrap(),
        "DELETE FROM \"users\" WHERE \"id\" = 1"
    );
    assert_eq!(
        BulkUpdateQuery::new(pg)
            .table(TableRef::new("users"))
            .set("name", Operand::from("x"))
            .where_clause(Condition::eq("id", 1))
            .where_clause(Condition::All(vec![]))
            .build()
            .unwrap(),
        "UPDATE \"users\" SET \"name\"='x' WHERE \"id\" = 1"
    );
}

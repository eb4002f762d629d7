#![allow(dead_code)]

use quarry_core::{Attribute, DataType, Index, Model};
use quarry_orm::Executor;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub async fn create_test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

pub fn user() -> Model {
    Model::new("User", "Users")
        .with_attribute(Attribute::new("id", DataType::Integer))
        .with_attribute(Attribute::new("username", DataType::String))
        .with_attribute(Attribute::new("email", DataType::String))
        .with_attribute(Attribute::new("teamId", DataType::Integer).field("team_id"))
        .with_index(Index::unique(["email"]).name("users_email").msg("email already registered"))
}

/// An executor over `Teams` and `Users`, with foreign keys enforced.
pub async fn executor() -> Executor {
    let executor = Executor::new(create_test_pool().await);
    for sql in [
        "PRAGMA foreign_keys = ON",
        "CREATE TABLE Teams (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        "CREATE TABLE Users (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT,
            team_id INTEGER REFERENCES Teams (id),
            CHECK (length(username) > 2)
        )",
        "CREATE UNIQUE INDEX users_email ON Users (email)",
        "INSERT INTO Teams (id, name) VALUES (1, 'core')",
        "INSERT INTO Users (id, username, email, team_id) VALUES (1, 'alice', 'a@example.com', 1)",
    ] {
        executor.execute(sql, None).await.expect("schema setup failed");
    }
    executor
}

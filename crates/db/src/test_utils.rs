use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::models::{
    mission::Mission,
    project::Project,
    status::{Risk, WorkStatus},
};

/// Private in-memory store with the real migrations applied.
///
/// One connection that never expires: every new in-memory connection would
/// be a fresh, empty database.
pub async fn setup_test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("invalid sqlite config")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("failed to open sqlite memory db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    pool
}

pub async fn create_test_project(pool: &SqlitePool) -> String {
    let project = Project::new(format!("Test Project {}", uuid::Uuid::new_v4()));
    Project::create(pool, &project)
        .await
        .expect("failed to create test project");
    project.id
}

pub async fn create_test_mission(pool: &SqlitePool, project_id: &str) -> Mission {
    let mission = Mission::new(
        project_id.to_string(),
        "Test Mission".into(),
        String::new(),
        WorkStatus::Backlog,
        Risk::Low,
        None,
    );
    Mission::create(pool, &mission)
        .await
        .expect("failed to create test mission");
    mission
}

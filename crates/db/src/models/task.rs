use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};
use ts_rs::TS;
use utils::ids;

use super::{patch::double_option, status::WorkStatus};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub mission_id: String,
    pub title: String,
    pub description: String,
    pub status: WorkStatus,
    /// Advisory: marks work that should have an approved approval before it
    /// runs. Nothing in the mutation path enforces it.
    pub critical: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub critical: Option<bool>,
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub critical: Option<bool>,
    pub actor: Option<String>,
}

const SELECT_TASK: &str = r#"SELECT id, missionId, title, COALESCE(description, '') AS description,
       status, critical, createdAt, updatedAt
  FROM tasks"#;

impl Task {
    pub fn new(
        mission_id: String,
        title: String,
        description: String,
        status: WorkStatus,
        critical: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ids::new_id(ids::TASK),
            mission_id,
            title,
            description,
            status,
            critical,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn find_by_mission_id<'e, E>(
        executor: E,
        mission_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "{SELECT_TASK} WHERE missionId = ?1 ORDER BY updatedAt DESC, rowid DESC"
        ))
        .bind(mission_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!("{SELECT_TASK} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn create<'e, E>(executor: E, task: &Task) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"INSERT INTO tasks
                   (id, missionId, title, description, status, critical, createdAt, updatedAt)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )
        .bind(&task.id)
        .bind(&task.mission_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.critical)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn update<'e, E>(executor: E, task: &Task) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"UPDATE tasks
               SET title = ?2, description = ?3, status = ?4, critical = ?5, updatedAt = ?6
               WHERE id = ?1"#,
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.critical)
        .bind(task.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};
use ts_rs::TS;
use utils::ids;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub name: String,
    pub actor: Option<String>,
}

impl Project {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: ids::new_id(ids::PROJECT),
            name,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn find_all<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"SELECT id, name, createdAt, updatedAt
               FROM projects
               ORDER BY updatedAt DESC, rowid DESC"#,
        )
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"SELECT id, name, createdAt, updatedAt FROM projects WHERE id = ?1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn create<'e, E>(executor: E, project: &Project) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"INSERT INTO projects (id, name, createdAt, updatedAt)
               VALUES (?1, ?2, ?3, ?4)"#,
        )
        .bind(&project.id)
        .bind(&project.name)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Missions and their tasks go with the project (FK cascade). Approvals
    /// and artifacts keep their rows with the references nulled out.
    pub async fn delete<'e, E>(executor: E, id: &str) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

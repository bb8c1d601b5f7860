use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};
use ts_rs::TS;
use utils::ids;

/// A reference (link, document, file path) pinned to a mission or task.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub mission_id: Option<String>,
    pub task_id: Option<String>,
    pub title: String,
    pub kind: String,
    #[serde(rename = "ref")]
    #[sqlx(rename = "ref")]
    pub reference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateArtifact {
    pub mission_id: Option<String>,
    pub task_id: Option<String>,
    pub title: String,
    pub kind: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub actor: Option<String>,
}

impl Artifact {
    pub fn new(
        mission_id: Option<String>,
        task_id: Option<String>,
        title: String,
        kind: String,
        reference: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ids::new_id(ids::ARTIFACT),
            mission_id,
            task_id,
            title,
            kind,
            reference,
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
        sqlx::query_as::<_, Artifact>(
            r#"SELECT id, missionId, taskId, title, kind, ref, createdAt, updatedAt
               FROM artifacts
               WHERE missionId = ?1
               ORDER BY updatedAt DESC, rowid DESC"#,
        )
        .bind(mission_id)
        .fetch_all(executor)
        .await
    }

    pub async fn create<'e, E>(executor: E, artifact: &Artifact) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"INSERT INTO artifacts
                   (id, missionId, taskId, title, kind, ref, createdAt, updatedAt)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )
        .bind(&artifact.id)
        .bind(&artifact.mission_id)
        .bind(&artifact.task_id)
        .bind(&artifact.title)
        .bind(&artifact.kind)
        .bind(&artifact.reference)
        .bind(artifact.created_at)
        .bind(artifact.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

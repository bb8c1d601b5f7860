use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};
use ts_rs::TS;
use utils::ids;

use super::{
    patch::double_option,
    status::{Risk, WorkStatus},
};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Mission {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub objective: String,
    pub status: WorkStatus,
    pub risk: Risk,
    pub cost_usd: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status and risk arrive as raw strings so that out-of-vocabulary values
/// surface as validation errors instead of body rejections.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateMission {
    pub project_id: String,
    pub title: String,
    pub objective: Option<String>,
    pub status: Option<String>,
    pub risk: Option<String>,
    pub cost_usd: Option<f64>,
    pub actor: Option<String>,
}

/// Partial update. A missing key leaves the column alone; for `costUsd` an
/// explicit `null` clears it and for `objective` it resets to empty. `title`
/// keeps the null so the workflow layer can reject it.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMission {
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub objective: Option<Option<String>>,
    pub status: Option<String>,
    pub risk: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub cost_usd: Option<Option<f64>>,
    pub actor: Option<String>,
}

const SELECT_MISSION: &str = r#"SELECT id, projectId, title, COALESCE(objective, '') AS objective,
       status, risk, costUsd, createdAt, updatedAt
  FROM missions"#;

impl Mission {
    pub fn new(
        project_id: String,
        title: String,
        objective: String,
        status: WorkStatus,
        risk: Risk,
        cost_usd: Option<f64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ids::new_id(ids::MISSION),
            project_id,
            title,
            objective,
            status,
            risk,
            cost_usd,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn find_all<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Mission>(&format!(
            "{SELECT_MISSION} ORDER BY updatedAt DESC, rowid DESC"
        ))
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_project_id<'e, E>(
        executor: E,
        project_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Mission>(&format!(
            "{SELECT_MISSION} WHERE projectId = ?1 ORDER BY updatedAt DESC, rowid DESC"
        ))
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Mission>(&format!("{SELECT_MISSION} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn create<'e, E>(executor: E, mission: &Mission) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"INSERT INTO missions
                   (id, projectId, title, objective, status, risk, costUsd, createdAt, updatedAt)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        )
        .bind(&mission.id)
        .bind(&mission.project_id)
        .bind(&mission.title)
        .bind(&mission.objective)
        .bind(mission.status)
        .bind(mission.risk)
        .bind(mission.cost_usd)
        .bind(mission.created_at)
        .bind(mission.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Write every mutable column of an already-merged row.
    pub async fn update<'e, E>(executor: E, mission: &Mission) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"UPDATE missions
               SET title = ?2, objective = ?3, status = ?4, risk = ?5, costUsd = ?6, updatedAt = ?7
               WHERE id = ?1"#,
        )
        .bind(&mission.id)
        .bind(&mission.title)
        .bind(&mission.objective)
        .bind(mission.status)
        .bind(mission.risk)
        .bind(mission.cost_usd)
        .bind(mission.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Advance `updatedAt` without touching anything else; used when a child
    /// task changes.
    pub async fn touch<'e, E>(
        executor: E,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE missions SET updatedAt = ?2 WHERE id = ?1")
            .bind(id)
            .bind(at)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, Type};
use ts_rs::TS;
use utils::ids;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS)]
#[sqlx(type_name = "approval_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    Requested,
    Approved,
    Rejected,
}

impl ApprovalState {
    /// `approved` and `rejected` have no way out.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalState::Requested)
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalState::Requested => write!(f, "requested"),
            ApprovalState::Approved => write!(f, "approved"),
            ApprovalState::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Approval {
    pub id: String,
    pub mission_id: Option<String>,
    pub task_id: Option<String>,
    pub title: String,
    pub state: ApprovalState,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateApproval {
    pub mission_id: Option<String>,
    pub task_id: Option<String>,
    pub title: String,
    pub requested_by: Option<String>,
    pub actor: Option<String>,
}

/// Body of approve/reject calls.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ResolveApproval {
    pub actor: Option<String>,
}

const SELECT_APPROVAL: &str = r#"SELECT id, missionId, taskId, title, state, requestedBy,
       requestedAt, approvedAt, createdAt, updatedAt
  FROM approvals"#;

impl Approval {
    pub fn new(
        mission_id: Option<String>,
        task_id: Option<String>,
        title: String,
        requested_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ids::new_id(ids::APPROVAL),
            mission_id,
            task_id,
            title,
            state: ApprovalState::Requested,
            requested_by,
            requested_at: now,
            approved_at: None,
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
        sqlx::query_as::<_, Approval>(&format!(
            "{SELECT_APPROVAL} WHERE missionId = ?1 ORDER BY updatedAt DESC, rowid DESC"
        ))
        .bind(mission_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Approval>(&format!("{SELECT_APPROVAL} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Head of the mission's approval list restricted to `requested`, i.e.
    /// the most recently updated pending approval.
    pub async fn find_first_requested<'e, E>(
        executor: E,
        mission_id: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Approval>(&format!(
            "{SELECT_APPROVAL} WHERE missionId = ?1 AND state = 'requested'
             ORDER BY updatedAt DESC, rowid DESC
             LIMIT 1"
        ))
        .bind(mission_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn create<'e, E>(executor: E, approval: &Approval) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"INSERT INTO approvals
                   (id, missionId, taskId, title, state, requestedBy, requestedAt,
                    approvedAt, createdAt, updatedAt)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
        )
        .bind(&approval.id)
        .bind(&approval.mission_id)
        .bind(&approval.task_id)
        .bind(&approval.title)
        .bind(approval.state)
        .bind(&approval.requested_by)
        .bind(approval.requested_at)
        .bind(approval.approved_at)
        .bind(approval.created_at)
        .bind(approval.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Move a `requested` approval to `state`. Returns the number of rows
    /// changed: 0 means the approval was already terminal (or gone), so a
    /// terminal state is never overwritten.
    pub async fn resolve<'e, E>(
        executor: E,
        id: &str,
        state: ApprovalState,
        approved_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r#"UPDATE approvals
               SET state = ?2, approvedAt = ?3, updatedAt = ?4
               WHERE id = ?1 AND state = 'requested'"#,
        )
        .bind(id)
        .bind(state)
        .bind(approved_at)
        .bind(updated_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}

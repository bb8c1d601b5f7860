//! Append-only audit log.
//!
//! Rows are written once and never updated or deleted. `at` is the total
//! order key; rows sharing an `at` fall back to insertion order.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, Type};
use ts_rs::TS;
use utils::ids;

pub const DEFAULT_EVENT_LIMIT: i64 = 200;
pub const MAX_EVENT_LIMIT: i64 = 500;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS)]
#[sqlx(type_name = "event_result", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventResult {
    Ok,
    Noop,
    Error,
}

impl fmt::Display for EventResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventResult::Ok => write!(f, "ok"),
            EventResult::Noop => write!(f, "noop"),
            EventResult::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct EventLog {
    pub id: String,
    pub at: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub result: EventResult,
    pub message: String,
    pub project_id: Option<String>,
    pub mission_id: Option<String>,
    pub task_id: Option<String>,
}

/// An event before it is written. `append` assigns `id` and `at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub actor: String,
    pub action: String,
    pub result: EventResult,
    pub message: String,
    pub project_id: Option<String>,
    pub mission_id: Option<String>,
    pub task_id: Option<String>,
}

impl NewEvent {
    pub fn new(actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            result: EventResult::Ok,
            message: String::new(),
            project_id: None,
            mission_id: None,
            task_id: None,
        }
    }

    pub fn result(mut self, result: EventResult) -> Self {
        self.result = result;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn project(mut self, project_id: Option<String>) -> Self {
        self.project_id = project_id;
        self
    }

    pub fn mission(mut self, mission_id: Option<String>) -> Self {
        self.mission_id = mission_id;
        self
    }

    pub fn task(mut self, task_id: Option<String>) -> Self {
        self.task_id = task_id;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    pub limit: Option<i64>,
    pub project_id: Option<String>,
    pub mission_id: Option<String>,
    pub task_id: Option<String>,
}

impl EventFilter {
    /// Requested limit clamped to `1..=MAX_EVENT_LIMIT`.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_EVENT_LIMIT)
            .clamp(1, MAX_EVENT_LIMIT)
    }
}

impl EventLog {
    pub async fn append<'e, E>(executor: E, event: NewEvent) -> Result<EventLog, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let row = EventLog {
            id: ids::new_id(ids::EVENT),
            at: Utc::now(),
            actor: event.actor,
            action: event.action,
            result: event.result,
            message: event.message,
            project_id: event.project_id,
            mission_id: event.mission_id,
            task_id: event.task_id,
        };

        sqlx::query(
            r#"INSERT INTO event_logs
                   (id, at, actor, action, result, message, projectId, missionId, taskId)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        )
        .bind(&row.id)
        .bind(row.at)
        .bind(&row.actor)
        .bind(&row.action)
        .bind(row.result)
        .bind(&row.message)
        .bind(&row.project_id)
        .bind(&row.mission_id)
        .bind(&row.task_id)
        .execute(executor)
        .await?;

        Ok(row)
    }

    /// Newest first, never more than `MAX_EVENT_LIMIT` rows.
    pub async fn query<'e, E>(executor: E, filter: &EventFilter) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, EventLog>(
            r#"SELECT id, at, actor, action, result, COALESCE(message, '') AS message,
                      projectId, missionId, taskId
               FROM event_logs
               WHERE (?1 IS NULL OR projectId = ?1)
                 AND (?2 IS NULL OR missionId = ?2)
                 AND (?3 IS NULL OR taskId = ?3)
               ORDER BY at DESC, rowid DESC
               LIMIT ?4"#,
        )
        .bind(&filter.project_id)
        .bind(&filter.mission_id)
        .bind(&filter.task_id)
        .bind(filter.effective_limit())
        .fetch_all(executor)
        .await
    }
}

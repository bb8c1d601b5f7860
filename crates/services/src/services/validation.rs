//! Input checks that run before any write.
//!
//! Status is a closed-set membership test, not a transition graph: once a
//! value is in the vocabulary it may follow any other value.

use std::fmt;

use db::models::status::{Risk, WorkStatus};
use thiserror::Error;

pub const PROJECT_NAME_MAX: usize = 120;
pub const TITLE_MAX: usize = 200;
pub const ARTIFACT_KIND_MAX: usize = 40;
pub const ARTIFACT_REF_MAX: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Mission,
    Task,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Mission => write!(f, "mission"),
            EntityKind::Task => write!(f, "task"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("invalid {kind} status: {value}")]
    InvalidStatus { kind: EntityKind, value: String },
    #[error("invalid risk: {0}")]
    InvalidRisk(String),
    #[error("{field} must be between 1 and {max} characters")]
    Length { field: &'static str, max: usize },
    #[error("costUsd must be a finite number")]
    NonFiniteCost,
    #[error("missionId or taskId is required")]
    MissingTarget,
    #[error("{0} cannot be null")]
    NullField(&'static str),
}

pub fn validate_status(kind: EntityKind, raw: &str) -> Result<WorkStatus, ValidationError> {
    raw.parse::<WorkStatus>()
        .map_err(|value| ValidationError::InvalidStatus { kind, value })
}

/// `None` means "use the default" (Backlog).
pub fn validate_optional_status(
    kind: EntityKind,
    raw: Option<&str>,
) -> Result<Option<WorkStatus>, ValidationError> {
    raw.map(|raw| validate_status(kind, raw)).transpose()
}

pub fn validate_risk(raw: &str) -> Result<Risk, ValidationError> {
    raw.parse::<Risk>().map_err(ValidationError::InvalidRisk)
}

/// Any finite value is accepted, negative included.
pub fn validate_cost(cost_usd: Option<f64>) -> Result<Option<f64>, ValidationError> {
    match cost_usd {
        Some(cost) if !cost.is_finite() => Err(ValidationError::NonFiniteCost),
        other => Ok(other),
    }
}

/// Non-empty and at most `max` characters.
pub fn validate_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len == 0 || len > max {
        return Err(ValidationError::Length { field, max });
    }
    Ok(())
}

/// Patch variant of [`validate_text`]: a missing key passes, an explicit
/// `null` does not.
pub fn validate_patch_text(
    field: &'static str,
    value: Option<Option<String>>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value {
        None => Ok(None),
        Some(None) => Err(ValidationError::NullField(field)),
        Some(Some(value)) => {
            validate_text(field, &value, max)?;
            Ok(Some(value))
        }
    }
}

/// Blank ids count as absent.
pub fn normalize_id(id: Option<String>) -> Option<String> {
    id.filter(|id| !id.trim().is_empty())
}

/// Approvals and artifacts must point at a mission, a task, or both.
pub fn require_target(
    mission_id: &Option<String>,
    task_id: &Option<String>,
) -> Result<(), ValidationError> {
    if mission_id.is_none() && task_id.is_none() {
        return Err(ValidationError::MissingTarget);
    }
    Ok(())
}

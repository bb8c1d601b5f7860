use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use ts_rs::TS;

/// Board column shared by missions and tasks.
///
/// The set is closed but unordered: any status may follow any other. Gating
/// lives in approvals, not here.
#[derive(Debug, Clone, Copy, Default, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[sqlx(type_name = "work_status")]
pub enum WorkStatus {
    #[default]
    Backlog,
    Doing,
    Review,
    Done,
    Blocked,
    #[sqlx(rename = "Needs Approval")]
    #[serde(rename = "Needs Approval")]
    NeedsApproval,
    #[sqlx(rename = "Needs Info")]
    #[serde(rename = "Needs Info")]
    NeedsInfo,
    Archived,
}

impl WorkStatus {
    pub const ALL: [WorkStatus; 8] = [
        WorkStatus::Backlog,
        WorkStatus::Doing,
        WorkStatus::Review,
        WorkStatus::Done,
        WorkStatus::Blocked,
        WorkStatus::NeedsApproval,
        WorkStatus::NeedsInfo,
        WorkStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Backlog => "Backlog",
            WorkStatus::Doing => "Doing",
            WorkStatus::Review => "Review",
            WorkStatus::Done => "Done",
            WorkStatus::Blocked => "Blocked",
            WorkStatus::NeedsApproval => "Needs Approval",
            WorkStatus::NeedsInfo => "Needs Info",
            WorkStatus::Archived => "Archived",
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkStatus {
    type Err = String;

    /// Exact, case-sensitive match against the board vocabulary.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[sqlx(type_name = "risk", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    #[default]
    Low,
    Medium,
    High,
}

impl Risk {
    pub const ALL: [Risk; 3] = [Risk::Low, Risk::Medium, Risk::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Risk::Low => "low",
            Risk::Medium => "medium",
            Risk::High => "high",
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Risk {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Risk::ALL
            .into_iter()
            .find(|risk| risk.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a doubt. Transitions only move forward:
/// `open -> assigned -> in_progress -> resolved`, with `in_progress` optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "doubt_status", rename_all = "snake_case")]
pub enum DoubtStatus {
    Open,
    Assigned,
    InProgress,
    Resolved,
}

impl DoubtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoubtStatus::Open => "open",
            DoubtStatus::Assigned => "assigned",
            DoubtStatus::InProgress => "in_progress",
            DoubtStatus::Resolved => "resolved",
        }
    }

    /// Whether a doubt in this state can be marked resolved.
    pub fn is_resolvable(&self) -> bool {
        matches!(self, DoubtStatus::Assigned | DoubtStatus::InProgress)
    }
}

impl fmt::Display for DoubtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoubtStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(DoubtStatus::Open),
            "assigned" => Ok(DoubtStatus::Assigned),
            "in_progress" => Ok(DoubtStatus::InProgress),
            "resolved" => Ok(DoubtStatus::Resolved),
            other => Err(format!("unknown doubt status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "doubt_urgency", rename_all = "snake_case")]
pub enum DoubtUrgency {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoubtRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub assigned_alumni_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub domain_tags: Vec<String>,
    pub urgency: DoubtUrgency,
    pub status: DoubtStatus,
    pub rating: Option<i32>,
    pub feedback: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::profile::UserRole;

/// One append-only ledger row. Rows are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeaderboardPointRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub points: i32,
    pub domain: Option<String>,
    pub doubt_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub opportunity_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Aggregated ledger total for a single user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PointsTotal {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub total_points: i64,
    pub entries: i64,
}

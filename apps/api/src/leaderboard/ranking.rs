use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::leaderboard::{LeaderboardPointRow, PointsTotal};
use crate::store::PortalStore;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub rank: u32,
    #[serde(flatten)]
    pub total: PointsTotal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Standing {
    pub user_id: Uuid,
    pub total_points: i64,
    pub entries: Vec<LeaderboardPointRow>,
}

/// Standard competition ranking ("1224"): equal totals share a rank and the
/// next distinct total skips the shared places.
pub fn rank(mut totals: Vec<PointsTotal>) -> Vec<RankedEntry> {
    totals.sort_by(|a, b| b.total_points.cmp(&a.total_points));

    let mut ranked: Vec<RankedEntry> = Vec::with_capacity(totals.len());
    for (i, total) in totals.into_iter().enumerate() {
        let rank = match ranked.last() {
            Some(prev) if prev.total.total_points == total.total_points => prev.rank,
            _ => i as u32 + 1,
        };
        ranked.push(RankedEntry { rank, total });
    }
    ranked
}

pub async fn leaderboard(
    store: &dyn PortalStore,
    query: &LeaderboardQuery,
) -> Result<Vec<RankedEntry>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    Ok(rank(store.points_totals(limit).await?))
}

/// The caller's own ledger, newest first, with its sum.
pub async fn standing(store: &dyn PortalStore, profile_id: Uuid) -> Result<Standing, AppError> {
    let entries = store.points_for_user(profile_id).await?;
    Ok(Standing {
        user_id: profile_id,
        total_points: entries.iter().map(|e| i64::from(e.points)).sum(),
        entries,
    })
}

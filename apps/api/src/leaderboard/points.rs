use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{NewPoints, PortalStore};

pub const DOUBT_RESOLVED: (&str, i32) = ("doubt_resolved", 10);
pub const EVENT_REGISTRATION: (&str, i32) = ("event_registration", 5);
pub const OPPORTUNITY_POSTED: (&str, i32) = ("opportunity_posted", 5);

/// Builds a ledger row for one of the reward constants above.
pub fn reward(user_id: Uuid, (action, points): (&str, i32)) -> NewPoints {
    NewPoints {
        user_id,
        action: action.to_string(),
        points,
        ..NewPoints::default()
    }
}

/// Appends `points` to the ledger. Runs after the primary write has
/// committed, so a failure here is logged and does not undo that write.
pub async fn award(store: &dyn PortalStore, points: NewPoints) {
    match store.award_points(&points).await {
        Ok(row) => debug!(
            "Awarded {} points to {} for {}",
            row.points, row.user_id, row.action
        ),
        Err(e) => warn!(
            "Failed to award {} points to {} for {}: {e}",
            points.points, points.user_id, points.action
        ),
    }
}

use axum::{
    extract::{Query, State},
    Json,
};

use crate::errors::AppError;
use crate::leaderboard::ranking::{self, LeaderboardQuery, RankedEntry, Standing};
use crate::session::Caller;
use crate::state::AppState;

/// GET /api/v1/leaderboard?limit=
pub async fn handle_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<RankedEntry>>, AppError> {
    Ok(Json(ranking::leaderboard(state.store.as_ref(), &query).await?))
}

/// GET /api/v1/leaderboard/me
pub async fn handle_me(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Standing>, AppError> {
    Ok(Json(
        ranking::standing(state.store.as_ref(), caller.profile.id).await?,
    ))
}

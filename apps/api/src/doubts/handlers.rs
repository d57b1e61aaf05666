use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::doubts::workflow::{self, CreateDoubtRequest, DoubtFilter, RateDoubtRequest};
use crate::errors::AppError;
use crate::models::doubt::DoubtRow;
use crate::session::Caller;
use crate::state::AppState;

/// POST /api/v1/doubts
pub async fn handle_create(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CreateDoubtRequest>,
) -> Result<(StatusCode, Json<DoubtRow>), AppError> {
    let doubt = workflow::create_doubt(state.store.as_ref(), &caller.profile, req).await?;
    Ok((StatusCode::CREATED, Json(doubt)))
}

/// GET /api/v1/doubts?search=&status=
pub async fn handle_list(
    State(state): State<AppState>,
    caller: Caller,
    Query(filter): Query<DoubtFilter>,
) -> Result<Json<Vec<DoubtRow>>, AppError> {
    let doubts = workflow::list_doubts(state.store.as_ref(), &caller.profile, &filter).await?;
    Ok(Json(doubts))
}

/// GET /api/v1/doubts/:id
pub async fn handle_get(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<DoubtRow>, AppError> {
    Ok(Json(
        workflow::get_doubt(state.store.as_ref(), &caller.profile, id).await?,
    ))
}

/// POST /api/v1/doubts/:id/claim
pub async fn handle_claim(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<DoubtRow>, AppError> {
    Ok(Json(
        workflow::claim_doubt(state.store.as_ref(), &caller.profile, id).await?,
    ))
}

/// POST /api/v1/doubts/:id/start
pub async fn handle_start(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<DoubtRow>, AppError> {
    Ok(Json(
        workflow::start_doubt(state.store.as_ref(), &caller.profile, id).await?,
    ))
}

/// POST /api/v1/doubts/:id/resolve
pub async fn handle_resolve(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<DoubtRow>, AppError> {
    let doubt =
        workflow::resolve_doubt(state.store.as_ref(), &caller.profile, id, Utc::now()).await?;
    Ok(Json(doubt))
}

/// POST /api/v1/doubts/:id/feedback
pub async fn handle_feedback(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<RateDoubtRequest>,
) -> Result<Json<DoubtRow>, AppError> {
    Ok(Json(
        workflow::rate_doubt(state.store.as_ref(), &caller.profile, id, req).await?,
    ))
}

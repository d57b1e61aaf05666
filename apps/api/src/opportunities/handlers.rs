use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::opportunity::OpportunityRow;
use crate::opportunities::workflow::{self, CreateOpportunityRequest, OpportunityFilter};
use crate::session::Caller;
use crate::state::AppState;

/// POST /api/v1/opportunities
pub async fn handle_create(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CreateOpportunityRequest>,
) -> Result<(StatusCode, Json<OpportunityRow>), AppError> {
    let opportunity =
        workflow::create_opportunity(state.store.as_ref(), &caller.profile, req).await?;
    Ok((StatusCode::CREATED, Json(opportunity)))
}

/// GET /api/v1/opportunities?search=&type=
pub async fn handle_list(
    State(state): State<AppState>,
    Query(filter): Query<OpportunityFilter>,
) -> Result<Json<Vec<OpportunityRow>>, AppError> {
    Ok(Json(
        workflow::list_opportunities(state.store.as_ref(), &filter).await?,
    ))
}

/// GET /api/v1/opportunities/:id/apply
///
/// 303 to the external application page.
pub async fn handle_apply(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    let url = workflow::application_target(state.store.as_ref(), id).await?;
    Ok(Redirect::to(&url))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::workflow::{self, CreateEventRequest, EventFilter, EventListing, RegistrationReceipt};
use crate::models::event::EventRow;
use crate::session::{Caller, MaybeCaller};
use crate::state::AppState;

/// POST /api/v1/events
pub async fn handle_create(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventRow>), AppError> {
    let event = workflow::create_event(state.store.as_ref(), &caller.profile, req).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /api/v1/events?when=&search=&type=
///
/// Open to anonymous visitors; signed-in callers also get `is_registered`.
pub async fn handle_list(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    Query(filter): Query<EventFilter>,
) -> Result<Json<Vec<EventListing>>, AppError> {
    let profile = caller.as_ref().map(|c| &c.profile);
    let events = workflow::list_events(state.store.as_ref(), profile, &filter, Utc::now()).await?;
    Ok(Json(events))
}

/// POST /api/v1/events/:id/register
pub async fn handle_register(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RegistrationReceipt>), AppError> {
    let receipt = workflow::register(state.store.as_ref(), &caller.profile, id, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /api/v1/events/registrations
pub async fn handle_registrations(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Uuid>>, AppError> {
    Ok(Json(
        workflow::registered_event_ids(state.store.as_ref(), &caller.profile).await?,
    ))
}

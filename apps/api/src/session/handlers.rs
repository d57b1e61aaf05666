use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::session::signup::{sign_up, SignUpRequest, SignUpResponse};
use crate::session::{AuthEvent, BearerToken, SessionContext};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /api/v1/auth/sign-up
pub async fn handle_sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), AppError> {
    let response = sign_up(state.auth.as_ref(), state.store.as_ref(), &req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/sign-in
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SessionContext>, AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "email and password are required".to_string(),
        ));
    }
    let session = state
        .auth
        .sign_in(&req.email.trim().to_lowercase(), &req.password)
        .await?;

    let mut context = SessionContext::default();
    context
        .on_auth_event(state.store.as_ref(), AuthEvent::SignedIn, Some(session))
        .await?;
    if let Some(user) = &context.user {
        info!("User {} signed in", user.id);
    }
    Ok(Json(context))
}

/// POST /api/v1/auth/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<SessionContext>, AppError> {
    let session = state.auth.refresh(&req.refresh_token).await?;

    let mut context = SessionContext::default();
    context
        .on_auth_event(state.store.as_ref(), AuthEvent::TokenRefreshed, Some(session))
        .await?;
    Ok(Json(context))
}

/// POST /api/v1/auth/sign-out
pub async fn handle_sign_out(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, AppError> {
    state.auth.sign_out(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<SessionContext>, AppError> {
    let context =
        SessionContext::initialize(state.auth.as_ref(), state.store.as_ref(), &token).await?;
    Ok(Json(context))
}

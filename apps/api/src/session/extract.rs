use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth_client::AuthError;
use crate::errors::AppError;
use crate::models::profile::ProfileRow;
use crate::session::SessionContext;
use crate::state::AppState;

/// Raw `Authorization: Bearer <token>` value.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| BearerToken(token.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}

/// An authenticated user that has a profile row.
///
/// Use `MaybeCaller` for routes that also serve anonymous visitors.
#[derive(Debug, Clone)]
pub struct Caller {
    pub profile: ProfileRow,
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let context = SessionContext::initialize(state.auth.as_ref(), state.store.as_ref(), &token)
            .await
            .map_err(|e| match e {
                AppError::Auth(AuthError::Rejected { .. }) => AppError::Unauthorized,
                other => other,
            })?;
        context.into_caller().ok_or(AppError::Unauthorized)
    }
}

/// Caller for routes open to anonymous visitors.
///
/// A missing or rejected token yields `None`. Any other failure (store or
/// auth service unavailable) is returned as an error instead of silently
/// downgrading the request to anonymous.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<Caller>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Caller::from_request_parts(parts, state).await {
            Ok(caller) => Ok(MaybeCaller(Some(caller))),
            Err(AppError::Unauthorized) => Ok(MaybeCaller(None)),
            Err(e) => Err(e),
        }
    }
}

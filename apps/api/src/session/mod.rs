//! Per-request session context.
//!
//! A `SessionContext` is built explicitly for every request (or auth
//! operation) instead of living in global state. It follows the auth
//! service's event stream: each event either loads the derived profile row for
//! the session's user or clears it.

pub mod extract;
pub mod handlers;
pub mod signup;

use serde::Serialize;
use tracing::debug;

use crate::auth_client::{AuthProvider, AuthSession, AuthUser};
use crate::errors::AppError;
use crate::models::profile::ProfileRow;
use crate::store::PortalStore;

pub use extract::{BearerToken, Caller, MaybeCaller};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    TokenRefreshed,
    // Sent by the auth service after metadata edits; no route edits users yet.
    #[allow(dead_code)]
    UserUpdated,
    SignedOut,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionContext {
    pub session: Option<AuthSession>,
    pub user: Option<AuthUser>,
    /// `None` when signed out, or when the account has no profile row yet.
    pub profile: Option<ProfileRow>,
}

impl SessionContext {
    /// Resolves a bearer token through the auth service and loads the profile.
    pub async fn initialize(
        auth: &dyn AuthProvider,
        store: &dyn PortalStore,
        access_token: &str,
    ) -> Result<Self, AppError> {
        let user = auth.get_user(access_token).await?;
        let mut context = SessionContext {
            user: Some(user),
            ..SessionContext::default()
        };
        context
            .on_auth_event(store, AuthEvent::InitialSession, None)
            .await?;
        Ok(context)
    }

    /// Applies an auth state change. A new session replaces the current
    /// one; without one the current user is kept and its profile reloaded.
    pub async fn on_auth_event(
        &mut self,
        store: &dyn PortalStore,
        event: AuthEvent,
        session: Option<AuthSession>,
    ) -> Result<(), AppError> {
        debug!("Session event {event:?}");
        if event == AuthEvent::SignedOut {
            self.teardown();
            return Ok(());
        }

        if let Some(session) = session {
            self.user = Some(session.user.clone());
            self.session = Some(session);
        }
        self.load_profile(store).await
    }

    pub fn teardown(&mut self) {
        self.session = None;
        self.user = None;
        self.profile = None;
    }

    /// Promotes the context to a `Caller`; requires a user with a profile row.
    pub fn into_caller(self) -> Option<Caller> {
        match (self.user, self.profile) {
            (Some(_), Some(profile)) => Some(Caller { profile }),
            _ => None,
        }
    }

    async fn load_profile(&mut self, store: &dyn PortalStore) -> Result<(), AppError> {
        self.profile = match &self.user {
            Some(user) => store.find_profile_by_user_id(user.id).await?,
            None => None,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::UserRole;
    use crate::test_support::{session_for, MemoryStore, StubAuth};

    #[tokio::test]
    async fn test_signed_in_loads_profile() {
        let store = MemoryStore::default();
        let profile = store.seed_profile(UserRole::Student);
        let mut ctx = SessionContext::default();

        ctx.on_auth_event(&store, AuthEvent::SignedIn, Some(session_for(profile.user_id)))
            .await
            .unwrap();

        assert!(ctx.user.is_some());
        assert_eq!(ctx.profile.unwrap().id, profile.id);
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_an_error() {
        let store = MemoryStore::default();
        let mut ctx = SessionContext::default();

        ctx.on_auth_event(
            &store,
            AuthEvent::SignedIn,
            Some(session_for(uuid::Uuid::new_v4())),
        )
        .await
        .unwrap();

        assert!(ctx.user.is_some());
        assert!(ctx.profile.is_none());
        assert!(ctx.into_caller().is_none());
    }

    #[tokio::test]
    async fn test_signed_out_clears_everything() {
        let store = MemoryStore::default();
        let profile = store.seed_profile(UserRole::Alumni);
        let mut ctx = SessionContext::default();
        ctx.on_auth_event(&store, AuthEvent::SignedIn, Some(session_for(profile.user_id)))
            .await
            .unwrap();

        ctx.on_auth_event(&store, AuthEvent::SignedOut, None)
            .await
            .unwrap();

        assert!(ctx.user.is_none());
        assert!(ctx.profile.is_none());
        assert!(ctx.session.is_none());
    }

    #[tokio::test]
    async fn test_initialize_from_token() {
        let store = MemoryStore::default();
        let auth = StubAuth::default();
        let profile = store.seed_profile(UserRole::Admin);
        let token = auth.issue_token(profile.user_id);

        let ctx = SessionContext::initialize(&auth, &store, &token).await.unwrap();
        let caller = ctx.into_caller().unwrap();

        assert_eq!(caller.profile.role, UserRole::Admin);
        assert_eq!(caller.profile.user_id, profile.user_id);
    }

    #[tokio::test]
    async fn test_user_updated_keeps_user_and_reloads_profile() {
        let store = MemoryStore::default();
        let profile = store.seed_profile(UserRole::Student);
        let mut ctx = SessionContext::default();
        ctx.on_auth_event(&store, AuthEvent::SignedIn, Some(session_for(profile.user_id)))
            .await
            .unwrap();

        ctx.on_auth_event(&store, AuthEvent::UserUpdated, None)
            .await
            .unwrap();

        assert_eq!(ctx.user.unwrap().id, profile.user_id);
        assert!(ctx.session.is_some());
        assert_eq!(ctx.profile.unwrap().id, profile.id);
    }

    #[tokio::test]
    async fn test_initialize_with_unknown_token_fails() {
        let store = MemoryStore::default();
        let auth = StubAuth::default();
        assert!(SessionContext::initialize(&auth, &store, "bogus").await.is_err());
    }
}

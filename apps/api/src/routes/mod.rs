pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::{alumni, dashboard, doubts, events, leaderboard, opportunities, session};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session
        .route("/api/v1/auth/sign-up", post(session::handlers::handle_sign_up))
        .route("/api/v1/auth/sign-in", post(session::handlers::handle_sign_in))
        .route("/api/v1/auth/sign-out", post(session::handlers::handle_sign_out))
        .route("/api/v1/auth/refresh", post(session::handlers::handle_refresh))
        .route("/api/v1/auth/me", get(session::handlers::handle_me))
        // Doubts
        .route(
            "/api/v1/doubts",
            get(doubts::handlers::handle_list).post(doubts::handlers::handle_create),
        )
        .route("/api/v1/doubts/:id", get(doubts::handlers::handle_get))
        .route("/api/v1/doubts/:id/claim", post(doubts::handlers::handle_claim))
        .route("/api/v1/doubts/:id/start", post(doubts::handlers::handle_start))
        .route(
            "/api/v1/doubts/:id/resolve",
            post(doubts::handlers::handle_resolve),
        )
        .route(
            "/api/v1/doubts/:id/feedback",
            post(doubts::handlers::handle_feedback),
        )
        // Events
        .route(
            "/api/v1/events",
            get(events::handlers::handle_list).post(events::handlers::handle_create),
        )
        .route(
            "/api/v1/events/registrations",
            get(events::handlers::handle_registrations),
        )
        .route(
            "/api/v1/events/:id/register",
            post(events::handlers::handle_register),
        )
        // Opportunities
        .route(
            "/api/v1/opportunities",
            get(opportunities::handlers::handle_list).post(opportunities::handlers::handle_create),
        )
        .route(
            "/api/v1/opportunities/:id/apply",
            get(opportunities::handlers::handle_apply),
        )
        // Leaderboard
        .route(
            "/api/v1/leaderboard",
            get(leaderboard::handlers::handle_leaderboard),
        )
        .route("/api/v1/leaderboard/me", get(leaderboard::handlers::handle_me))
        // Directory and landing page
        .route("/api/v1/alumni", get(alumni::handle_directory))
        .route("/api/v1/dashboard", get(dashboard::handle_dashboard))
        .with_state(state)
}

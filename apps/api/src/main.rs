mod access;
mod alumni;
mod auth_client;
mod carousel;
mod config;
mod dashboard;
mod db;
mod doubts;
mod errors;
mod events;
mod leaderboard;
mod models;
mod opportunities;
mod routes;
mod search;
mod session;
mod state;
mod store;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth_client::GoTrueClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting AllyConnect API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;

    // Initialize auth client
    let auth = GoTrueClient::new(
        &config.supabase_url,
        config.supabase_anon_key.clone(),
        config.supabase_service_role_key.clone(),
    )?;
    if config.supabase_service_role_key.is_none() {
        warn!("SUPABASE_SERVICE_ROLE_KEY not set; failed sign-ups cannot be rolled back");
    }
    info!("Auth client initialized ({})", config.supabase_url);

    // Build app state
    let state = AppState {
        store: Arc::new(PgStore::new(pool)),
        auth: Arc::new(auth),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the portal frontend

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

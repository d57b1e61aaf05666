use std::sync::Arc;

use crate::auth_client::AuthProvider;
use crate::store::PortalStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Data access layer. Default: `PgStore` over the hosted database.
    pub store: Arc<dyn PortalStore>,
    /// Hosted auth service. Default: `GoTrueClient`.
    pub auth: Arc<dyn AuthProvider>,
}

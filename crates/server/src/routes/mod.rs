// crates/server/src/routes/mod.rs
//! API route handlers for the jobwatch server.

pub mod health;
pub mod jobs;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - GET  /api/jobs/{id} - Current job progress with derived percentage
/// - POST /api/jobs/{id}/cancel - Request cooperative cancellation
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", jobs::router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobwatch_core::{MemoryStore, Supervisor};

    #[test]
    fn test_router_builds() {
        let state = AppState::new(Supervisor::new(Arc::new(MemoryStore::new())));
        let _router = api_routes(state);
    }
}

// crates/server/src/lib.rs
//! Jobwatch server library.
//!
//! This crate provides the Axum-based HTTP surface of the job
//! supervision engine: polling and cancellation over REST. Starting
//! jobs is the embedding application's business; it holds the same
//! [`Supervisor`](jobwatch_core::Supervisor) that lives in [`AppState`]
//! and calls `run_batch` or `run_unit` from its own handlers.

pub mod error;
pub mod routes;
pub mod state;

pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, jobs)
/// - CORS for development (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use jobwatch_core::{JobOptions, MemoryStore, Supervisor};

    fn state() -> Arc<AppState> {
        AppState::new(Supervisor::new(Arc::new(MemoryStore::new())))
    }

    /// Helper to make a GET request to the app.
    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();

        (status, body)
    }

    // ========================================================================
    // Health Endpoint Tests
    // ========================================================================

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_app(state());
        let (status, body) = get(&app, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = create_app(state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/nonsense")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // ========================================================================
    // Job Lifecycle Over HTTP
    // ========================================================================

    #[tokio::test]
    async fn test_batch_progress_is_pollable_over_http() {
        let state = state();
        let app = create_app(state.clone());

        let handle = state
            .supervisor
            .run_batch(
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                |id| async move {
                    if id == "b" {
                        anyhow::bail!("item rejected");
                    }
                    Ok(json!({"published": id}))
                },
                JobOptions::labeled("publish"),
            )
            .await
            .unwrap();

        // Poll until the runner finishes, the way a client would
        let uri = format!("/api/jobs/{}", handle.id);
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        let body = loop {
            let (status, body) = get(&app, &uri).await;
            assert_eq!(status, StatusCode::OK);
            if body["ended"] == true {
                break body;
            }
            assert!(std::time::Instant::now() < deadline, "job never ended");
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        };

        assert_eq!(body["status"], "completed");
        assert_eq!(body["good"], 2);
        assert_eq!(body["bad"], 1);
        assert_eq!(body["processed"], 3);
        assert_eq!(body["total"], 3);
        assert_eq!(body["percentage"], 100.0);
        assert_eq!(body["results"]["a"], json!({"published": "a"}));
        assert!(body["results"].get("b").is_none());
    }
}

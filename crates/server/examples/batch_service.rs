// crates/server/examples/batch_service.rs
// Embedding walkthrough: a service starts a batch job from its own
// handler, then clients follow it through the jobwatch API.
//
//   cargo run -p jobwatch-server --example batch_service
//   curl -X POST http://127.0.0.1:47940/documents/publish
//   curl http://127.0.0.1:47940/api/jobs/<jobId>
//   curl -X POST http://127.0.0.1:47940/api/jobs/<jobId>/cancel

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use jobwatch_core::{JobOptions, MemoryStore, Supervisor};
use jobwatch_server::{create_app, ApiResult, AppState};

async fn publish_all(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let ids: Vec<String> = (1..=25).map(|n| format!("doc-{}", n)).collect();

    let handle = state
        .supervisor
        .run_batch(
            ids,
            |id| async move {
                // Stand-in for real per-document work
                tokio::time::sleep(Duration::from_millis(200)).await;
                if id.ends_with('7') {
                    anyhow::bail!("document {} failed validation", id);
                }
                Ok(json!({"published": true}))
            },
            JobOptions::labeled("publish-all").with_concurrency(4),
        )
        .await?;

    Ok(Json(json!({"jobId": handle.id})))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let supervisor = Supervisor::new(Arc::new(MemoryStore::new()));
    let state = AppState::new(supervisor);

    let app = Router::new()
        .route("/documents/publish", post(publish_all))
        .with_state(state.clone())
        .merge(create_app(state));

    let addr = SocketAddr::from(([127, 0, 0, 1], 47940));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("batch_service listening on http://{}", addr);
    info!("POST /documents/publish to start a job");

    axum::serve(listener, app).await?;
    Ok(())
}

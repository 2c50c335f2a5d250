// crates/server/src/main.rs
//! Jobwatch server binary.
//!
//! Opens the SQLite job store, builds the supervisor and serves the
//! polling API. Job-starting endpoints belong to the embedding service;
//! see `examples/batch_service.rs` for the pattern.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use jobwatch_core::Supervisor;
use jobwatch_db::SqliteStore;
use jobwatch_server::{create_app, AppState};

/// Default port for the server.
const DEFAULT_PORT: u16 = 47931;

/// Get the server port from environment or use default.
fn get_port() -> u16 {
    std::env::var("JOBWATCH_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // JOBWATCH_DB overrides the default data-dir location
    let store = match std::env::var("JOBWATCH_DB") {
        Ok(path) => SqliteStore::new(Path::new(&path)).await?,
        Err(_) => SqliteStore::open_default().await?,
    };

    let supervisor = Supervisor::new(Arc::new(store));
    let state = AppState::new(supervisor);
    let app = create_app(state);

    let port = get_port();
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("jobwatch listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

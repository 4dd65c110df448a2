//! REST API server for recap.
//!
//! Provides HTTP endpoints for:
//! - Submitting recordings for summarization
//! - Polling job status and results
//! - Listing completed meetings

pub mod error;
pub mod routes;

use crate::config::Config;
use crate::db::Database;
use crate::jobs::JobQueue;
use anyhow::{Context, Result};
use axum::{extract::DefaultBodyLimit, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tracing::info;

/// Shared state for API routes.
#[derive(Clone)]
pub struct ApiState {
    pub queue: JobQueue,
    pub db: Database,
}

/// Build the full application router.
pub fn router(state: ApiState, max_upload_bytes: usize) -> Router {
    Router::new()
        // Root and version endpoints
        .route("/", get(status))
        .route("/version", get(version))
        .merge(routes::jobs::router(state.clone()))
        .merge(routes::meetings::router(state))
        .layer(
            ServiceBuilder::new().layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

pub struct ApiServer {
    host: String,
    port: u16,
    max_upload_bytes: usize,
    state: ApiState,
}

impl ApiServer {
    pub fn new(state: ApiState, config: &Config) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            max_upload_bytes: config.max_upload_bytes(),
            state,
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = router(self.state, self.max_upload_bytes);

        let address = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {}", address))?;

        info!("API server listening on http://{}", address);
        info!("Endpoints:");
        info!("  GET  /                          - Service info");
        info!("  GET  /version                   - Get version info");
        info!("  POST /api/jobs                  - Submit a recording (field: audio_file)");
        info!("  GET  /api/jobs/:id              - Poll a job");
        info!("  GET  /api/meetings              - List completed meetings");
        info!("  POST /api/start-summary-job/    - Alias of POST /api/jobs");
        info!("  GET  /api/check-job-status/:id/ - Alias of GET /api/jobs/:id");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "recap",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "recap"
    }))
}

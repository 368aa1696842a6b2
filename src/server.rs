use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info};
use serde_json::json;
use tokio::{net::TcpListener, signal};

use crate::{
    config::ServerConfig,
    launcher::{JobReport, PersonImportLauncher},
};

/// Path of the import trigger.
pub const IMPORT_PERSONS_PATH: &str = "/jobs/import-persons";

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    launcher: PersonImportLauncher,
}

/// Routes of the trigger API.
pub fn router(launcher: PersonImportLauncher) -> Router {
    Router::new()
        .route(IMPORT_PERSONS_PATH, post(import_persons))
        .route("/health", get(health_check))
        .with_state(AppState { launcher })
}

/// Serves the trigger API until ctrl-c.
pub async fn serve(config: &ServerConfig, launcher: PersonImportLauncher) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router(launcher))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Runs one import and blocks the response until it terminates.
///
/// Answers 200 with the report of a completed run, 500 otherwise. Concurrent
/// requests start independent runs.
async fn import_persons(State(state): State<AppState>) -> Response {
    let launcher = state.launcher.clone();

    // The job drives sqlx through block_in_place; keep it off the async workers.
    match tokio::task::spawn_blocking(move || launcher.run()).await {
        Ok(Ok(execution)) => {
            let status = if execution.is_completed() {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(JobReport::from(&execution))).into_response()
        }
        Ok(Err(e)) => {
            error!("Import job could not be started: {}", e);
            failure(e.to_string())
        }
        Err(e) => {
            error!("Import job aborted: {}", e);
            failure(e.to_string())
        }
    }
}

fn failure(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "status": "FAILED",
            "error": message,
        })),
    )
        .into_response()
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "UP" }))
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

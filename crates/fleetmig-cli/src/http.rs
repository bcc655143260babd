//! The tiny HTTP surface: `/apply`, `/healthcheck`, `/liveness`, `/readiness`.
//!
//! Grounded on the one example repo in the retrieved pack that builds an
//! axum server (`nexsock-web`): shared state behind `Arc`, handlers
//! extracting `State`, `axum::serve` over a `TcpListener`.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use fleetmig_core::Engine;
use fleetmig_db::PgRepository;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct AppState {
    pub engine: Engine<PgRepository>,
    pub migration_dir: PathBuf,
    pub env_name: String,
    pub ready: AtomicBool,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/apply", post(apply))
        .route("/healthcheck", get(healthcheck))
        .route("/liveness", post(liveness))
        .route("/readiness", post(readiness))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ApplyQuery {
    service: String,
}

#[derive(Debug, Serialize)]
struct ApplyResponse {
    #[serde(rename = "MigrationsApplied")]
    migrations_applied: usize,
}

async fn apply(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ApplyQuery>,
) -> Result<Json<ApplyResponse>, (StatusCode, String)> {
    match state
        .engine
        .apply_service(&state.migration_dir, &query.service, &state.env_name)
        .await
    {
        Ok(Some(migrations_applied)) => {
            tracing::info!(service = %query.service, migrations_applied, "applied migrations");
            Ok(Json(ApplyResponse { migrations_applied }))
        }
        Ok(None) => Err((StatusCode::NOT_FOUND, format!("unknown service: {}", query.service))),
        Err(error) => Err((StatusCode::INTERNAL_SERVER_ERROR, error.to_string())),
    }
}

async fn healthcheck() -> StatusCode {
    StatusCode::OK
}

async fn liveness() -> StatusCode {
    StatusCode::OK
}

async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Acquire) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

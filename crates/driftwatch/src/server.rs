//! HTTP interface

use crate::handlers::reports::DEFAULT_LIMIT;
use crate::handlers::status::{db_status, DbStatus};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use driftwatch_core::{ActivityStore, AnalysisRecord, RecordStore, RunParameters};
use driftwatch_pipeline::{Error as PipelineError, ResearchOutcome};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/reports/{subject_id}", get(reports))
        .route("/health", get(health))
        .route("/db-status", get(status))
        .route("/research", post(research))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

fn default_goal() -> String {
    RunParameters::DEFAULT_GOAL.to_string()
}

fn default_level() -> String {
    RunParameters::DEFAULT_LEVEL.to_string()
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub subject_id: i64,
    #[serde(default = "default_goal")]
    pub goal: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub cycles: Option<u32>,
}

impl AnalyzeRequest {
    fn params(&self) -> RunParameters {
        let params = RunParameters::new(self.goal.clone(), self.level.clone());
        match self.cycles {
            Some(cycles) => params.with_cycles(cycles),
            None => params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

/// `/db-status` body; failures are reported in-band
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum StatusBody {
    Connected(DbStatus),
    Failed { status: &'static str, details: String },
}

async fn analyze(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisRecord>, ApiError> {
    let record = state
        .analyzer
        .run(payload.subject_id, payload.params())
        .await?;
    Ok(Json(record))
}

async fn reports(
    State(state): State<AppState>,
    Path(subject_id): Path<i64>,
) -> Result<Json<Vec<AnalysisRecord>>, ApiError> {
    let records = state
        .db
        .records()
        .recent(subject_id, DEFAULT_LIMIT)
        .await
        .map_err(PipelineError::from)?;
    Ok(Json(records))
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthBody>, ApiError> {
    state
        .db
        .activity()
        .subject_count()
        .await
        .map_err(|e| ApiError::internal(format!("Database health check failed: {}", e)))?;
    Ok(Json(HealthBody { status: "healthy" }))
}

async fn status(State(state): State<AppState>) -> Json<StatusBody> {
    match db_status(&state).await {
        Ok(status) => Json(StatusBody::Connected(status)),
        Err(e) => {
            error!("Database status check failed: {:#}", e);
            Json(StatusBody::Failed {
                status: "error",
                details: format!("{:#}", e),
            })
        }
    }
}

async fn research(
    State(state): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Json<ResearchOutcome>, ApiError> {
    let outcome = state
        .research
        .answer(&payload.query, &CancellationToken::new())
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

/// Error response with a `{detail}` body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        if err.is_not_found() {
            let detail = match err.root_cause() {
                PipelineError::Core(core) => core.to_string(),
                other => other.to_string(),
            };
            return Self {
                status: StatusCode::NOT_FOUND,
                detail,
            };
        }

        error!("Request failed: {}", err);
        Self::internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{get, post, routes, Build, Rocket, State};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use common::ServerConfig;

use crate::analysis::{AnalysisOutcome, AnalysisService};
use crate::error::Error;
use crate::pipeline::{flatten, DisplayRecord};
use crate::storage::AnalysisRecord;

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub service: Arc<AnalysisService>,
}

impl AppState {
    pub fn new(service: Arc<AnalysisService>) -> Self {
        Self {
            started_at: Utc::now(),
            service,
        }
    }
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
}

/// Request body for submitting an article.
#[derive(Deserialize)]
struct AnalyzeRequest {
    document: String,
}

/// JSON error body. Stage failures also carry what completed before the failure.
#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_stage: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    partial: Vec<DisplayRecord>,
}

impl ErrorBody {
    fn new(kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            kind,
            error: error.into(),
            failed_stage: None,
            partial: Vec::new(),
        }
    }
}

type ApiResult<T> = std::result::Result<Json<T>, Custom<Json<ErrorBody>>>;

fn error_response(err: Error) -> Custom<Json<ErrorBody>> {
    match err {
        Error::InputValidation(e) => {
            warn!(error = %e, "rejected submission");
            Custom(Status::UnprocessableEntity, Json(ErrorBody::new("input_validation", e.to_string())))
        }
        Error::StageExecution(e) => {
            error!(graph = %e.graph, stage = %e.stage, error = %e, "analysis aborted");
            let body = ErrorBody {
                kind: "stage_execution",
                error: e.to_string(),
                failed_stage: Some(e.stage.clone()),
                partial: flatten(&e.partial),
            };
            Custom(Status::BadGateway, Json(body))
        }
        Error::Storage(e) => {
            error!(error = %e, "storage failure");
            Custom(Status::InternalServerError, Json(ErrorBody::new("storage", e.to_string())))
        }
    }
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// Run the full analysis for one article. Blocks until both graphs finish.
#[post("/api/v1/analyses", format = "json", data = "<body>")]
async fn create_analysis(state: &State<AppState>, body: Json<AnalyzeRequest>) -> ApiResult<AnalysisOutcome> {
    info!(chars = body.document.len(), "analysis requested");
    state.service.analyze(&body.document).await.map(Json).map_err(error_response)
}

#[get("/api/v1/analyses")]
async fn list_analyses(state: &State<AppState>) -> ApiResult<Vec<AnalysisRecord>> {
    state.service.history().await.map(Json).map_err(error_response)
}

#[get("/api/v1/analyses/<id>")]
async fn get_analysis(state: &State<AppState>, id: i64) -> ApiResult<AnalysisRecord> {
    match state.service.record(id).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(Custom(
            Status::NotFound,
            Json(ErrorBody::new("not_found", format!("analysis {} does not exist", id))),
        )),
        Err(e) => Err(error_response(e)),
    }
}

/// Rocket instance with state and routes, not yet launched.
pub fn build_rocket(state: AppState, figment: rocket::figment::Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount(
            "/",
            routes![health, status, create_analysis, list_analyses, get_analysis],
        )
}

/// Serve the API until Rocket shuts down.
pub async fn launch_rocket(service: Arc<AnalysisService>, server: Option<&ServerConfig>) -> Result<()> {
    let mut fig = rocket::Config::figment();
    if let Some(server) = server {
        if let Some(address) = &server.address {
            fig = fig.merge(("address", address.clone()));
        }
        if let Some(port) = server.port {
            fig = fig.merge(("port", port));
        }
    }

    build_rocket(AppState::new(service), fig)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket server failed: {}", e))?;
    Ok(())
}

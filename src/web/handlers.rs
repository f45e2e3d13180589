//! HTTP request handlers.

use super::AppState;
use crate::analysis::{AnalysisResponse, FormFactor, ValidationError};
use crate::db::{DbError, ReportStore, Session};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to API clients.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("Invalid request body: {0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        if status.is_server_error() {
            tracing::error!("API error: {}", self);
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// API: Analysis
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub urls: Vec<String>,
    #[serde(default)]
    pub form_factor: FormFactor,
}

pub async fn handle_analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let Json(req) = payload?;
    let response = state.analyzer.analyze(&req.urls, req.form_factor).await?;
    Ok(Json(response))
}

// ============================================================================
// API: History
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub url: String,
    pub form_factor: String,
    pub overall_performance: String,
    pub created_at: DateTime<Utc>,
}

pub async fn handle_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let reports = state.store.list_recent_reports(state.config.history_limit)?;
    let history = reports
        .into_iter()
        .map(|r| HistoryEntry {
            id: r.id,
            url: r.url,
            form_factor: r.form_factor,
            overall_performance: r.overall_performance,
            created_at: r.created_at,
        })
        .collect();
    Ok(Json(history))
}

// ============================================================================
// API: Sessions
// ============================================================================

pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    state
        .store
        .get_session(&session_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Session {}", session_id)))
}

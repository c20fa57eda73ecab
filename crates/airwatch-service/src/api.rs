//! REST API endpoints for the airwatch-service.
//!
//! Every response carries a `success` flag so the dashboard can branch on it
//! without inspecting status codes.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`] in the form
//! `{"success": false, "error": "..."}`:
//!
//! | Condition | Status |
//! |-----------|--------|
//! | No readings stored yet (`current`, `aqi`) | 404 |
//! | Unknown `period`, malformed query or body | 400 |
//! | Reading fails validation | 422 |
//! | Reading is not newer than the last stored one | 409 |
//!
//! Handlers never hold a lock across a request: queries read the latest
//! published history snapshot.
//!
//! # Example
//!
//! ```ignore
//! use airwatch_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use airwatch_core::{Current, ReadingEvent};
use airwatch_types::{AqiResult, Period, Reading, ReadingInput, StatsReport};

use crate::state::{AppState, now};

/// Number of readings returned by `/api/history` when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/current", get(get_current))
        .route("/api/history", get(get_history))
        .route("/api/stats", get(get_stats))
        .route("/api/aqi", get(get_aqi))
        .route("/api/readings", post(submit_reading))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Number of readings currently held in history.
    pub readings: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now(),
        readings: state.pipeline.len(),
    })
}

/// Latest reading with its analysis.
#[derive(Debug, Serialize)]
pub struct CurrentResponse {
    pub success: bool,
    #[serde(flatten)]
    pub current: Current,
}

async fn get_current(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CurrentResponse>, AppError> {
    let current = state
        .pipeline
        .current()
        .ok_or_else(|| AppError::NotFound("No readings available yet".to_string()))?;
    Ok(Json(CurrentResponse {
        success: true,
        current,
    }))
}

/// Query parameters for `/api/history`.
#[derive(Debug, Deserialize, Default)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Recent readings, oldest first.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub data: Vec<Reading>,
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(params) = query?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(HistoryResponse {
        success: true,
        data: state.pipeline.history(limit),
    }))
}

/// Query parameters for `/api/stats`.
#[derive(Debug, Deserialize, Default)]
pub struct StatsQuery {
    pub period: Option<String>,
}

impl StatsQuery {
    /// The requested period, or the default when the parameter is absent.
    ///
    /// A present but empty value is rejected like any other unknown period.
    pub fn period(&self) -> Result<Period, AppError> {
        match self.period.as_deref() {
            Some(p) => p
                .parse::<Period>()
                .map_err(|e| AppError::from(airwatch_core::Error::from(e))),
            None => Ok(Period::default()),
        }
    }
}

/// Rolling statistics over a window.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub period: Period,
    pub stats: StatsReport,
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Json<StatsResponse>, AppError> {
    let Query(params) = query?;
    let period = params.period()?;
    Ok(Json(StatsResponse {
        success: true,
        period,
        stats: state.pipeline.stats(period, now()),
    }))
}

/// Air quality index of the latest reading.
#[derive(Debug, Serialize)]
pub struct AqiResponse {
    pub success: bool,
    pub aqi: AqiResult,
}

async fn get_aqi(State(state): State<Arc<AppState>>) -> Result<Json<AqiResponse>, AppError> {
    let aqi = state
        .pipeline
        .aqi()
        .ok_or_else(|| AppError::NotFound("No readings available yet".to_string()))?;
    Ok(Json(AqiResponse { success: true, aqi }))
}

/// An accepted reading with its analysis.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(flatten)]
    pub event: ReadingEvent,
}

/// Ingest one reading.
///
/// # Errors
///
/// - [`AppError::Payload`] if the body is not a JSON reading
/// - [`AppError::Engine`] if the reading is invalid or out of order
async fn submit_reading(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReadingInput>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let Json(input) = payload?;
    let event = state.pipeline.submit(&input, now())?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: true,
            event,
        }),
    ))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Payload(JsonRejection),
    Engine(airwatch_core::Error),
}

impl From<airwatch_core::Error> for AppError {
    fn from(e: airwatch_core::Error) -> Self {
        AppError::Engine(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Payload(e)
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use airwatch_core::Error;

        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Payload(rejection) => (rejection.status(), rejection.body_text()),
            AppError::Engine(e) => {
                let status = match &e {
                    Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    Error::OutOfOrder { .. } => StatusCode::CONFLICT,
                    Error::InvalidPeriod(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
        };

        let body = serde_json::json!({
            "success": false,
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

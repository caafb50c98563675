//! Liveness handlers.
//!
//! - GET /                -> banner with the application name
//! - GET /api/v1/health/  -> status, timestamp and API version

use crate::{models::responses::HealthResponse, state::AppState};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `GET /`
pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "message": format!("{} is running", state.app_name) }))
}

/// `GET /api/v1/health/`
///
/// Cheap liveness probe; never touches the bucket.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".into(),
            timestamp: Utc::now(),
            version: API_VERSION.into(),
        }),
    )
}

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { message: "JobBoard API is running!".to_string() }))
}

/// Unmatched paths.
pub async fn not_found() -> AppError {
    AppError::not_found("Not found")
}

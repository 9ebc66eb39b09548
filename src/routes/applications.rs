use axum::{extract::State, http::StatusCode, Extension, Json};
use uuid::Uuid;

use super::{AppJson, AppPath};
use crate::auth::Caller;
use crate::error::AppResult;
use crate::models::{Application, CreateApplicationRequest, UpdateApplicationStatusRequest};
use crate::AppState;

/// The caller's own applications, each with its job and company
#[utoipa::path(
    get,
    path = "/api/applications",
    tag = "applications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Applications, newest first", body = Vec<Application>),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[tracing::instrument(skip_all, fields(caller_id = %caller.id))]
pub async fn my_applications(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> AppResult<Json<Vec<Application>>> {
    Ok(Json(state.board.my_applications(&caller).await?))
}

/// Apply to an active job. One application per user and job.
#[utoipa::path(
    post,
    path = "/api/applications",
    tag = "applications",
    request_body = CreateApplicationRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Application submitted as PENDING", body = Application),
        (status = 400, description = "Invalid input, inactive job or already applied"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Job not found")
    )
)]
#[tracing::instrument(skip_all, fields(caller_id = %caller.id, job_id = %request.job_id))]
pub async fn create_application(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppJson(request): AppJson<CreateApplicationRequest>,
) -> AppResult<(StatusCode, Json<Application>)> {
    let application = state.board.apply(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[utoipa::path(
    put,
    path = "/api/applications/{id}",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    request_body = UpdateApplicationStatusRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated application", body = Application),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Caller may not review this application"),
        (status = 404, description = "Application not found")
    )
)]
#[tracing::instrument(skip(state, caller, request), fields(caller_id = %caller.id, status = request.status.as_str()))]
pub async fn update_application_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateApplicationStatusRequest>,
) -> AppResult<Json<Application>> {
    Ok(Json(state.board.update_application_status(&caller, id, request).await?))
}

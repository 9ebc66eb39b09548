use axum::{extract::State, http::StatusCode, Extension, Json};
use uuid::Uuid;

use super::{AppJson, AppPath, AppQuery};
use crate::auth::Caller;
use crate::error::AppResult;
use crate::models::{Application, CreateJobRequest, Job, JobPage, JobQuery, UpdateJobRequest};
use crate::AppState;

/// List active jobs, newest first
#[utoipa::path(
    get,
    path = "/api/jobs",
    tag = "jobs",
    params(JobQuery),
    responses(
        (status = 200, description = "One page of active jobs and the total match count", body = JobPage),
        (status = 400, description = "Malformed query")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_jobs(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<JobQuery>,
) -> AppResult<Json<JobPage>> {
    Ok(Json(state.board.list_jobs(query).await?))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    tag = "jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "The job with its company", body = Job),
        (status = 404, description = "Job not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Job>> {
    Ok(Json(state.board.get_job(id).await?))
}

/// Post a job under a company
#[utoipa::path(
    post,
    path = "/api/jobs",
    tag = "jobs",
    request_body = CreateJobRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Job created", body = Job),
        (status = 400, description = "Missing title, description or company id"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not ADMIN or COMPANY_ADMIN of this company"),
        (status = 404, description = "Company not found")
    )
)]
#[tracing::instrument(skip_all, fields(caller_id = %caller.id, company_id = %request.company_id))]
pub async fn create_job(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppJson(request): AppJson<CreateJobRequest>,
) -> AppResult<(StatusCode, Json<Job>)> {
    let job = state.board.create_job(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[utoipa::path(
    put,
    path = "/api/jobs/{id}",
    tag = "jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = UpdateJobRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated job", body = Job),
        (status = 403, description = "Caller may not manage this job"),
        (status = 404, description = "Job not found")
    )
)]
#[tracing::instrument(skip(state, caller, request), fields(caller_id = %caller.id))]
pub async fn update_job(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateJobRequest>,
) -> AppResult<Json<Job>> {
    Ok(Json(state.board.update_job(&caller, id, request).await?))
}

/// Deactivate a job. It stays readable by id but leaves all listings.
#[utoipa::path(
    delete,
    path = "/api/jobs/{id}",
    tag = "jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The deactivated job", body = Job),
        (status = 403, description = "Caller may not manage this job"),
        (status = 404, description = "Job not found")
    )
)]
#[tracing::instrument(skip(state, caller), fields(caller_id = %caller.id))]
pub async fn delete_job(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Job>> {
    Ok(Json(state.board.deactivate_job(&caller, id).await?))
}

/// Applications received for a job, with applicant details
#[utoipa::path(
    get,
    path = "/api/jobs/{id}/applications",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Job id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Applications, newest first", body = Vec<Application>),
        (status = 403, description = "Caller may not review this job"),
        (status = 404, description = "Job not found")
    )
)]
#[tracing::instrument(skip(state, caller), fields(caller_id = %caller.id))]
pub async fn job_applications(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Vec<Application>>> {
    Ok(Json(state.board.applications_for_job(&caller, id).await?))
}

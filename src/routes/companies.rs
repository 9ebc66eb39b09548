use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use super::{AppJson, AppPath};
use crate::error::AppResult;
use crate::models::{Company, CompanyDetail, CompanySummary, CreateCompanyRequest};
use crate::AppState;

/// All companies, newest first, with their active job counts
#[utoipa::path(
    get,
    path = "/api/companies",
    tag = "companies",
    responses(
        (status = 200, description = "Companies with jobCount", body = Vec<CompanySummary>)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_companies(State(state): State<AppState>) -> AppResult<Json<Vec<CompanySummary>>> {
    Ok(Json(state.board.list_companies().await?))
}

#[utoipa::path(
    get,
    path = "/api/companies/{id}",
    tag = "companies",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "The company with its active jobs", body = CompanyDetail),
        (status = 404, description = "Company not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_company(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<CompanyDetail>> {
    Ok(Json(state.board.get_company(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/companies",
    tag = "companies",
    request_body = CreateCompanyRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Company created", body = Company),
        (status = 400, description = "Missing name"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not ADMIN")
    )
)]
#[tracing::instrument(skip_all, fields(name = %request.name))]
pub async fn create_company(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateCompanyRequest>,
) -> AppResult<(StatusCode, Json<Company>)> {
    let company = state.board.create_company(request).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

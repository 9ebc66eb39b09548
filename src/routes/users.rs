use axum::{extract::State, Json};
use uuid::Uuid;

use super::{AppJson, AppPath};
use crate::error::AppResult;
use crate::models::{AssignRoleRequest, PublicUser};
use crate::AppState;

/// Change a user's role and owning company
#[utoipa::path(
    put,
    path = "/api/users/{id}/role",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = AssignRoleRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated user", body = PublicUser),
        (status = 403, description = "Caller is not ADMIN"),
        (status = 404, description = "User or company not found")
    )
)]
#[tracing::instrument(skip(state, request), fields(role = request.role.as_str()))]
pub async fn assign_role(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<AssignRoleRequest>,
) -> AppResult<Json<PublicUser>> {
    Ok(Json(state.board.assign_role(id, request).await?))
}

use axum::{extract::State, http::StatusCode, Extension, Json};

use super::AppJson;
use crate::auth::Caller;
use crate::error::AppResult;
use crate::models::{AuthResponse, LoginRequest, PublicUser, RegisterRequest};
use crate::AppState;

/// Create an account and return a session token
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input or e-mail already registered"),
        (status = 403, description = "Requested role cannot be self-assigned")
    )
)]
#[tracing::instrument(skip_all, fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let response = state.board.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Exchange e-mail and password for a session token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
#[tracing::instrument(skip_all, fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(state.board.login(request).await?))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The authenticated user", body = PublicUser),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[tracing::instrument(skip_all, fields(caller_id = %caller.id))]
pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> AppResult<Json<PublicUser>> {
    Ok(Json(state.board.me(&caller).await?))
}

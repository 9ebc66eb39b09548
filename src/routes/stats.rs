use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::models::Stats;
use crate::AppState;

/// Headline counts for the landing page. `jobs` counts active jobs only.
#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Entity counts", body = Stats)
    )
)]
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<Stats>> {
    Ok(Json(state.board.stats().await?))
}

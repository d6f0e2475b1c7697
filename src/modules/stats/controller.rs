use axum::{Json, extract::State};
use tracing::instrument;

use classrota_core::AppError;

use crate::middleware::auth::AuthContext;
use crate::modules::stats::model::ScheduleStats;
use crate::modules::stats::service::StatsService;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Current assignment statistics", body = ScheduleStats),
        (status = 401, description = "Missing auth context")
    ),
    tag = "Stats"
)]
#[instrument(skip(state))]
pub async fn get_stats(
    State(state): State<AppState>,
    _ctx: AuthContext,
) -> Result<Json<ScheduleStats>, AppError> {
    let stats = StatsService::compute_stats(&state.db, &state.events).await?;

    Ok(Json(stats))
}

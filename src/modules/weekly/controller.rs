use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use classrota_core::AppError;

use crate::middleware::auth::AuthContext;
use crate::modules::weekly::model::{WeeklyScheduleQuery, WeeklyScheduleResponse};
use crate::modules::weekly::service::WeeklyScheduleService;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/schedule/weekly",
    params(WeeklyScheduleQuery),
    responses(
        (status = 200, description = "Effective schedule for the requested week", body = WeeklyScheduleResponse),
        (status = 401, description = "Missing auth context")
    ),
    tag = "Schedule"
)]
#[instrument(skip(state))]
pub async fn get_weekly_schedule(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<WeeklyScheduleQuery>,
) -> Result<Json<WeeklyScheduleResponse>, AppError> {
    let schedule = WeeklyScheduleService::resolve_week(&state.db, &ctx, query).await?;

    Ok(Json(schedule))
}

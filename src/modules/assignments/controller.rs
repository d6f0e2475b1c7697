use axum::{Json, extract::State};
use tracing::instrument;

use classrota_core::AppError;

use crate::middleware::auth::AuthContext;
use crate::modules::assignments::model::{AssignRoomDto, SlotSummary, UnassignRoomDto};
use crate::modules::assignments::service::AssignmentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/schedule/assign",
    request_body = AssignRoomDto,
    responses(
        (status = 200, description = "Room assigned", body = SlotSummary),
        (status = 403, description = "Requires administrator access"),
        (status = 404, description = "Schedule or room not found"),
        (status = 409, description = "Room already occupied at that day/period"),
        (status = 422, description = "Room flagged unavailable")
    ),
    tag = "Schedule"
)]
#[instrument(skip(state))]
pub async fn assign_room(
    State(state): State<AppState>,
    ctx: AuthContext,
    ValidatedJson(dto): ValidatedJson<AssignRoomDto>,
) -> Result<Json<SlotSummary>, AppError> {
    ctx.require_admin()?;

    let summary = AssignmentService::assign_room(
        &state.db,
        &state.events,
        dto.schedule_id,
        dto.room_id,
        ctx.user_id,
    )
    .await?;

    Ok(Json(summary))
}

#[utoipa::path(
    post,
    path = "/api/schedule/unassign",
    request_body = UnassignRoomDto,
    responses(
        (status = 200, description = "Room unassigned, slot reverted to pending", body = SlotSummary),
        (status = 403, description = "Requires administrator access"),
        (status = 404, description = "Schedule not found")
    ),
    tag = "Schedule"
)]
#[instrument(skip(state))]
pub async fn unassign_room(
    State(state): State<AppState>,
    ctx: AuthContext,
    ValidatedJson(dto): ValidatedJson<UnassignRoomDto>,
) -> Result<Json<SlotSummary>, AppError> {
    ctx.require_admin()?;

    let summary = AssignmentService::unassign_room(
        &state.db,
        &state.events,
        dto.schedule_id,
        ctx.user_id,
    )
    .await?;

    Ok(Json(summary))
}

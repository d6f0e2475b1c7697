use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use classrota_core::AppError;
use classrota_models::RoomId;

use crate::middleware::auth::AuthContext;
use crate::modules::availability::model::{
    AvailableRoomsQuery, AvailableRoomsResponse, RoomFreeQuery, RoomFreeResponse,
};
use crate::modules::availability::service::AvailabilityService;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/rooms/available",
    params(AvailableRoomsQuery),
    responses(
        (status = 200, description = "Rooms partitioned by availability", body = AvailableRoomsResponse),
        (status = 401, description = "Missing auth context"),
        (status = 422, description = "Invalid day of week")
    ),
    tag = "Rooms"
)]
#[instrument(skip(state))]
pub async fn get_available_rooms(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Query(query): Query<AvailableRoomsQuery>,
) -> Result<Json<AvailableRoomsResponse>, AppError> {
    let rooms = AvailabilityService::list_free_rooms(&state.db, query).await?;

    Ok(Json(rooms))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{id}/free",
    params(
        ("id" = String, Path, description = "Room ID"),
        RoomFreeQuery
    ),
    responses(
        (status = 200, description = "Availability of the room", body = RoomFreeResponse),
        (status = 401, description = "Missing auth context"),
        (status = 404, description = "Room not found")
    ),
    tag = "Rooms"
)]
#[instrument(skip(state))]
pub async fn get_room_free(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Path(id): Path<RoomId>,
    Query(query): Query<RoomFreeQuery>,
) -> Result<Json<RoomFreeResponse>, AppError> {
    let result = AvailabilityService::is_room_free(
        &state.db,
        id,
        query.day_of_week,
        query.time_slot_id,
        query.date,
    )
    .await?;

    Ok(Json(result))
}

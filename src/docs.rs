use utoipa::OpenApi;

use classrota_core::pagination::{PaginationMeta, PaginationParams};

use crate::modules::assignments::model::{AssignRoomDto, ClassSchedule, SlotSummary, UnassignRoomDto};
use crate::modules::availability::model::{
    AvailableRoomsQuery, AvailableRoomsResponse, FreedRoom, OccupiedRoom, RoomCandidate,
    RoomFreeQuery, RoomFreeResponse,
};
use crate::modules::exceptions::model::{
    CreateExceptionDto, ExceptionFilterParams, PaginatedExceptionsResponse, ScheduleException,
    UpdateExceptionDto,
};
use crate::modules::stats::model::ScheduleStats;
use crate::modules::weekly::model::{
    EffectiveScheduleRow, WeeklyScheduleQuery, WeeklyScheduleResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::availability::controller::get_available_rooms,
        crate::modules::availability::controller::get_room_free,
        crate::modules::assignments::controller::assign_room,
        crate::modules::assignments::controller::unassign_room,
        crate::modules::exceptions::controller::create_exception,
        crate::modules::exceptions::controller::get_exceptions,
        crate::modules::exceptions::controller::get_exception_by_id,
        crate::modules::exceptions::controller::update_exception,
        crate::modules::exceptions::controller::approve_exception,
        crate::modules::exceptions::controller::reject_exception,
        crate::modules::exceptions::controller::delete_exception,
        crate::modules::weekly::controller::get_weekly_schedule,
        crate::modules::stats::controller::get_stats,
    ),
    components(
        schemas(
            RoomCandidate,
            FreedRoom,
            OccupiedRoom,
            AvailableRoomsQuery,
            AvailableRoomsResponse,
            RoomFreeQuery,
            RoomFreeResponse,
            ClassSchedule,
            AssignRoomDto,
            UnassignRoomDto,
            SlotSummary,
            ScheduleException,
            CreateExceptionDto,
            UpdateExceptionDto,
            ExceptionFilterParams,
            PaginatedExceptionsResponse,
            WeeklyScheduleQuery,
            WeeklyScheduleResponse,
            EffectiveScheduleRow,
            ScheduleStats,
            PaginationMeta,
            PaginationParams,
        )
    ),
    tags(
        (name = "Rooms", description = "Room availability checks"),
        (name = "Schedule", description = "Room assignment and the weekly effective schedule"),
        (name = "Schedule exceptions", description = "Per-date deviations from the recurring schedule"),
        (name = "Stats", description = "Assignment workflow statistics"),
    ),
    info(
        title = "classrota API",
        description = "Classroom scheduling: recurring slots, room assignment, and schedule exceptions"
    )
)]
pub struct ApiDoc;

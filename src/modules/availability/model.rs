use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use chrono::NaiveDate;
use classrota_models::{DepartmentId, ExceptionType, RoomId, RoomTypeId, TimeSlotId};

/// A room joined with its type, as considered by the availability check.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct RoomCandidate {
    pub id: RoomId,
    pub name: String,
    pub capacity: i32,
    pub room_type_id: RoomTypeId,
    pub department_id: Option<DepartmentId>,
    pub is_lab: bool,
}

/// A room surfaced as occupied, with enough context to explain by whom.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OccupiedRoom {
    #[serde(flatten)]
    pub room: RoomCandidate,
    pub occupied_by_class: String,
    pub occupied_by_teacher: String,
}

/// A room vacated for the requested date by an approved exception.
///
/// Surfaced separately so operators can knowingly double-book it for
/// one-off use.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FreedRoom {
    #[serde(flatten)]
    pub room: RoomCandidate,
    pub vacated_by_class: String,
    pub exception_type: ExceptionType,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailableRoomsResponse {
    pub normal_rooms: Vec<RoomCandidate>,
    pub freed_rooms: Vec<FreedRoom>,
    pub occupied_rooms: Vec<OccupiedRoom>,
    pub total_available: usize,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct AvailableRoomsQuery {
    pub time_slot_id: TimeSlotId,
    /// 1 = Sunday ... 7 = Saturday
    pub day_of_week: i16,
    /// Specific calendar date; enables the exception overlay
    pub date: Option<NaiveDate>,
    /// Seats required (ignored for lab room types)
    pub capacity: Option<i32>,
    pub class_room_type_id: Option<RoomTypeId>,
    pub department_id: Option<DepartmentId>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct RoomFreeQuery {
    pub time_slot_id: TimeSlotId,
    /// 1 = Sunday ... 7 = Saturday
    pub day_of_week: i16,
    pub date: Option<NaiveDate>,
}

/// Result of a single-room availability probe.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomFreeResponse {
    pub free: bool,
    /// The room is only free because an approved exception vacates it on
    /// the requested date.
    pub freed_by_exception: bool,
}

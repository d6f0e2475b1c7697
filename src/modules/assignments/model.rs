use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use classrota_models::{
    ClassId, ClassStatus, DayOfWeek, RoomId, ScheduleId, ScheduleStatus, TimeSlotId, UserId,
    WeekPattern,
};

/// A recurring weekly slot of a class.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ClassSchedule {
    pub id: ScheduleId,
    pub class_id: ClassId,
    /// 1 = Sunday ... 7 = Saturday
    #[schema(value_type = i16)]
    pub day_of_week: DayOfWeek,
    pub time_slot_id: TimeSlotId,
    pub week_pattern: WeekPattern,
    pub start_week: i32,
    pub end_week: i32,
    pub room_id: Option<RoomId>,
    pub status: ScheduleStatus,
    pub assigned_by: Option<UserId>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignRoomDto {
    pub schedule_id: ScheduleId,
    pub room_id: RoomId,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UnassignRoomDto {
    pub schedule_id: ScheduleId,
}

/// Result of an assignment operation: the slot after the write plus the
/// recomputed class-level aggregate.
#[derive(Debug, Serialize, ToSchema)]
pub struct SlotSummary {
    #[serde(flatten)]
    pub schedule: ClassSchedule,
    /// Derived: `assigned` iff every slot of the class has a room.
    pub class_status: ClassStatus,
}

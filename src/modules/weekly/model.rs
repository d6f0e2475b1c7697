use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use classrota_models::{
    ClassId, DayOfWeek, DepartmentId, ExceptionType, RoomId, ScheduleId, ScheduleStatus,
    TeacherId, TimeSlotId,
};

/// An approved exception attached to one (slot, date) occurrence, as
/// consumed by the merge table.
#[derive(Debug, Clone)]
pub struct OccurrenceException {
    pub exception_type: ExceptionType,
    pub exception_date: NaiveDate,
    pub moved_to_date: Option<NaiveDate>,
    pub moved_to_time_slot_id: Option<TimeSlotId>,
    pub moved_to_room_id: Option<RoomId>,
    pub substitute_teacher_id: Option<TeacherId>,
    pub substitute_teacher_name: Option<String>,
    pub reason: String,
}

/// One row of the effective weekly schedule.
///
/// `schedule_id` is `None` for standalone final-exam rows, which have no
/// recurring base slot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EffectiveScheduleRow {
    pub schedule_id: Option<ScheduleId>,
    pub class_id: ClassId,
    pub class_name: String,
    pub teacher_id: TeacherId,
    pub teacher_name: String,
    pub substitute_teacher_id: Option<TeacherId>,
    pub substitute_teacher_name: Option<String>,
    /// 1 = Sunday ... 7 = Saturday
    #[schema(value_type = i16)]
    pub day_of_week: DayOfWeek,
    pub date: NaiveDate,
    pub time_slot_id: TimeSlotId,
    pub period: i32,
    pub starts_at: NaiveTime,
    pub ends_at: NaiveTime,
    pub room_id: Option<RoomId>,
    pub room_name: Option<String>,
    pub status: ScheduleStatus,
    /// The exception kind that shaped this row, if any.
    pub exception_type: Option<ExceptionType>,
    /// Back-reference for rows produced by a move ("moved from ...").
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct WeeklyScheduleQuery {
    /// Any date inside the requested week; normalized to its Sunday.
    pub week_start_date: NaiveDate,
    pub department_id: Option<DepartmentId>,
    pub class_id: Option<ClassId>,
    pub teacher_id: Option<TeacherId>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WeeklyScheduleResponse {
    /// The Sunday the resolved week starts on.
    pub week_start_date: NaiveDate,
    pub rows: Vec<EffectiveScheduleRow>,
}

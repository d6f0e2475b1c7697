use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use classrota_core::{PaginationMeta, PaginationParams};
use classrota_models::{
    ApprovalStatus, ClassId, ExceptionId, ExceptionType, RoomId, ScheduleId, TeacherId,
    TimeSlotId, UserId,
};

/// A per-date deviation from a slot's recurring pattern.
///
/// `class_schedule_id` is `None` only for standalone final exams, which
/// reference the class directly.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ScheduleException {
    pub id: ExceptionId,
    pub class_schedule_id: Option<ScheduleId>,
    pub class_id: ClassId,
    pub exception_date: NaiveDate,
    pub exception_type: ExceptionType,
    pub moved_to_date: Option<NaiveDate>,
    pub moved_to_time_slot_id: Option<TimeSlotId>,
    pub moved_to_room_id: Option<RoomId>,
    pub substitute_teacher_id: Option<TeacherId>,
    pub reason: String,
    pub approval_status: ApprovalStatus,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateExceptionDto {
    /// Base slot; omit only for standalone final exams.
    pub class_schedule_id: Option<ScheduleId>,
    /// Required when no base slot is given.
    pub class_id: Option<ClassId>,
    pub exception_date: NaiveDate,
    pub exception_type: ExceptionType,
    pub moved_to_date: Option<NaiveDate>,
    pub moved_to_time_slot_id: Option<TimeSlotId>,
    pub moved_to_room_id: Option<RoomId>,
    pub substitute_teacher_id: Option<TeacherId>,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

/// Administrative correction of an exception record. Approval state is
/// not touched here; use the approve/reject operations.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateExceptionDto {
    #[validate(length(min = 1, max = 500))]
    pub reason: Option<String>,
    pub moved_to_date: Option<NaiveDate>,
    pub moved_to_time_slot_id: Option<TimeSlotId>,
    pub moved_to_room_id: Option<RoomId>,
    pub substitute_teacher_id: Option<TeacherId>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct ExceptionFilterParams {
    pub class_schedule_id: Option<ScheduleId>,
    pub class_id: Option<ClassId>,
    pub exception_type: Option<ExceptionType>,
    pub approval_status: Option<ApprovalStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedExceptionsResponse {
    pub data: Vec<ScheduleException>,
    pub meta: PaginationMeta,
}

//! Shared fixtures for service and integration tests.
//!
//! Compiled for unit tests and behind the `test-utils` feature for the
//! integration suite.

use chrono::NaiveDate;
use sqlx::PgPool;

use classrota_models::{
    ClassId, DayOfWeek, DepartmentId, ExceptionType, RoomId, RoomTypeId, ScheduleId, TeacherId,
    TimeSlotId, UserId, WeekPattern,
};

/// Reference rows every scheduling test needs: a department, a standard
/// and a lab room type, a teacher, and two daily periods.
pub struct RefData {
    pub department_id: DepartmentId,
    pub room_type_id: RoomTypeId,
    pub lab_type_id: RoomTypeId,
    pub teacher_id: TeacherId,
    pub period_1: TimeSlotId,
    pub period_2: TimeSlotId,
}

pub async fn seed_reference(pool: &PgPool) -> RefData {
    let department_id: DepartmentId =
        sqlx::query_scalar("INSERT INTO departments (name) VALUES ($1) RETURNING id")
            .bind(format!("Dept {}", uuid::Uuid::new_v4()))
            .fetch_one(pool)
            .await
            .unwrap();

    let room_type_id: RoomTypeId =
        sqlx::query_scalar("INSERT INTO room_types (name, is_lab) VALUES ($1, FALSE) RETURNING id")
            .bind(format!("Lecture {}", uuid::Uuid::new_v4()))
            .fetch_one(pool)
            .await
            .unwrap();

    let lab_type_id: RoomTypeId =
        sqlx::query_scalar("INSERT INTO room_types (name, is_lab) VALUES ($1, TRUE) RETURNING id")
            .bind(format!("Lab {}", uuid::Uuid::new_v4()))
            .fetch_one(pool)
            .await
            .unwrap();

    let teacher_id: TeacherId = sqlx::query_scalar(
        "INSERT INTO teachers (name, department_id) VALUES ($1, $2) RETURNING id",
    )
    .bind("Test Teacher")
    .bind(department_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let period_1 = create_time_slot(pool, 1, "08:00:00", "09:30:00").await;
    let period_2 = create_time_slot(pool, 2, "09:45:00", "11:15:00").await;

    RefData {
        department_id,
        room_type_id,
        lab_type_id,
        teacher_id,
        period_1,
        period_2,
    }
}

pub async fn create_time_slot(pool: &PgPool, sequence: i32, starts: &str, ends: &str) -> TimeSlotId {
    sqlx::query_scalar(
        "INSERT INTO time_slots (sequence, starts_at, ends_at)
         VALUES ($1, $2::time, $3::time) RETURNING id",
    )
    .bind(sequence)
    .bind(starts)
    .bind(ends)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_teacher(pool: &PgPool, name: &str, department_id: DepartmentId) -> TeacherId {
    sqlx::query_scalar("INSERT INTO teachers (name, department_id) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(department_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn create_room(
    pool: &PgPool,
    name: &str,
    capacity: i32,
    room_type_id: RoomTypeId,
    department_id: Option<DepartmentId>,
) -> RoomId {
    sqlx::query_scalar(
        "INSERT INTO rooms (name, capacity, room_type_id, department_id)
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(name)
    .bind(capacity)
    .bind(room_type_id)
    .bind(department_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn mark_room_unavailable(pool: &PgPool, room_id: RoomId) {
    sqlx::query("UPDATE rooms SET is_available = FALSE WHERE id = $1")
        .bind(room_id)
        .execute(pool)
        .await
        .unwrap();
}

#[allow(clippy::too_many_arguments)]
pub async fn create_class(
    pool: &PgPool,
    name: &str,
    refs: &RefData,
    room_type_id: RoomTypeId,
    max_students: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> ClassId {
    sqlx::query_scalar(
        "INSERT INTO classes (name, department_id, teacher_id, room_type_id, max_students, start_date, end_date)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(name)
    .bind(refs.department_id)
    .bind(refs.teacher_id)
    .bind(room_type_id)
    .bind(max_students)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Like [`create_class`] but taught by a specific teacher.
pub async fn create_class_for_teacher(
    pool: &PgPool,
    name: &str,
    refs: &RefData,
    teacher_id: TeacherId,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> ClassId {
    sqlx::query_scalar(
        "INSERT INTO classes (name, department_id, teacher_id, room_type_id, max_students, start_date, end_date)
         VALUES ($1, $2, $3, $4, 25, $5, $6) RETURNING id",
    )
    .bind(name)
    .bind(refs.department_id)
    .bind(teacher_id)
    .bind(refs.room_type_id)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_schedule(
    pool: &PgPool,
    class_id: ClassId,
    day: DayOfWeek,
    time_slot_id: TimeSlotId,
) -> ScheduleId {
    sqlx::query_scalar(
        "INSERT INTO class_schedules (class_id, day_of_week, time_slot_id, week_pattern, start_week, end_week)
         VALUES ($1, $2, $3, $4, 1, 18) RETURNING id",
    )
    .bind(class_id)
    .bind(day)
    .bind(time_slot_id)
    .bind(WeekPattern::Every)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_schedule_with_pattern(
    pool: &PgPool,
    class_id: ClassId,
    day: DayOfWeek,
    time_slot_id: TimeSlotId,
    pattern: WeekPattern,
    start_week: i32,
    end_week: i32,
) -> ScheduleId {
    sqlx::query_scalar(
        "INSERT INTO class_schedules (class_id, day_of_week, time_slot_id, week_pattern, start_week, end_week)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(class_id)
    .bind(day)
    .bind(time_slot_id)
    .bind(pattern)
    .bind(start_week)
    .bind(end_week)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Put a room on a slot directly, bypassing the assignment engine.
pub async fn force_assign(pool: &PgPool, schedule_id: ScheduleId, room_id: RoomId) {
    sqlx::query(
        "UPDATE class_schedules
         SET room_id = $1, status = 'assigned', assigned_by = $2, assigned_at = NOW()
         WHERE id = $3",
    )
    .bind(room_id)
    .bind(UserId::new())
    .bind(schedule_id)
    .execute(pool)
    .await
    .unwrap();
}

/// Insert an approved exception directly.
#[allow(clippy::too_many_arguments)]
pub async fn create_approved_exception(
    pool: &PgPool,
    schedule_id: Option<ScheduleId>,
    class_id: ClassId,
    exception_date: NaiveDate,
    exception_type: ExceptionType,
    moved_to_date: Option<NaiveDate>,
    moved_to_time_slot_id: Option<TimeSlotId>,
    moved_to_room_id: Option<RoomId>,
    substitute_teacher_id: Option<TeacherId>,
) {
    sqlx::query(
        "INSERT INTO schedule_exceptions
             (class_schedule_id, class_id, exception_date, exception_type,
              moved_to_date, moved_to_time_slot_id, moved_to_room_id,
              substitute_teacher_id, reason, approval_status, approved_by, approved_at, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'test', 'approved', $9, NOW(), $9)",
    )
    .bind(schedule_id)
    .bind(class_id)
    .bind(exception_date)
    .bind(exception_type)
    .bind(moved_to_date)
    .bind(moved_to_time_slot_id)
    .bind(moved_to_room_id)
    .bind(substitute_teacher_id)
    .bind(UserId::new())
    .execute(pool)
    .await
    .unwrap();
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

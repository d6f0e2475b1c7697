use anyhow::anyhow;
use chrono::NaiveTime;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use classrota_core::AppError;
use classrota_models::{ClassId, ClassStatus, RoomId, ScheduleId, ScheduleStatus, UserId};

use crate::events::{EventKind, EventPublisher};
use crate::metrics;
use crate::modules::assignments::model::{ClassSchedule, SlotSummary};

const SCHEDULE_COLUMNS: &str = "id, class_id, day_of_week, time_slot_id, week_pattern, \
     start_week, end_week, room_id, status, assigned_by, assigned_at, created_at, updated_at";

/// The slot already holding the room at the same day/period, with the
/// context the caller needs to understand the rejection.
#[derive(Debug, sqlx::FromRow)]
struct ConflictRow {
    schedule_id: ScheduleId,
    class_name: String,
    teacher_name: String,
    starts_at: NaiveTime,
    ends_at: NaiveTime,
}

pub struct AssignmentService;

impl AssignmentService {
    /// Derived class aggregate: `Assigned` iff every slot of the class
    /// is assigned. Computed, never stored.
    pub(crate) async fn class_status(
        conn: &mut PgConnection,
        class_id: ClassId,
    ) -> Result<ClassStatus, AppError> {
        let unassigned = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM class_schedules WHERE class_id = $1 AND status <> 'assigned'",
        )
        .bind(class_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(if unassigned == 0 {
            ClassStatus::Assigned
        } else {
            ClassStatus::Pending
        })
    }

    /// Assign a room to a recurring slot.
    ///
    /// The whole operation is one transaction: the slot row is locked,
    /// the conflict predicate is re-validated against committed state,
    /// and the write either lands atomically or not at all. The partial
    /// unique index on (room, day, period) backstops concurrent
    /// assignments that race past the probe; its violation surfaces as
    /// the same `Conflict`.
    #[instrument(skip(db, events))]
    pub async fn assign_room(
        db: &PgPool,
        events: &EventPublisher,
        schedule_id: ScheduleId,
        room_id: RoomId,
        actor: UserId,
    ) -> Result<SlotSummary, AppError> {
        Self::assign_inner(db, events, schedule_id, room_id, actor, false).await
    }

    /// Assignment path used when an approved move/room-change exception
    /// propagates its redirect room onto the base slot. Same validation
    /// and aggregate recompute, but a confirmed assignment may be
    /// overwritten.
    #[instrument(skip(db, events))]
    pub(crate) async fn propagate_room(
        db: &PgPool,
        events: &EventPublisher,
        schedule_id: ScheduleId,
        room_id: RoomId,
        actor: UserId,
    ) -> Result<SlotSummary, AppError> {
        Self::assign_inner(db, events, schedule_id, room_id, actor, true).await
    }

    async fn assign_inner(
        db: &PgPool,
        events: &EventPublisher,
        schedule_id: ScheduleId,
        room_id: RoomId,
        actor: UserId,
        allow_overwrite: bool,
    ) -> Result<SlotSummary, AppError> {
        let mut tx = db.begin().await?;

        let slot = sqlx::query_as::<_, ClassSchedule>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM class_schedules WHERE id = $1 FOR UPDATE"
        ))
        .bind(schedule_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Schedule not found")))?;

        // Re-assignment is only rejected once the slot is confirmed
        // Assigned; overwriting an unconfirmed suggestion is allowed.
        if !allow_overwrite && slot.room_id.is_some() && slot.status == ScheduleStatus::Assigned {
            return Err(AppError::conflict(anyhow!(
                "Schedule already has a confirmed room assignment"
            ))
            .with_details(json!({
                "schedule_id": slot.id,
                "room_id": slot.room_id,
            })));
        }

        let is_available =
            sqlx::query_scalar::<_, bool>("SELECT is_available FROM rooms WHERE id = $1")
                .bind(room_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow!("Room not found")))?;

        if !is_available {
            return Err(AppError::room_unavailable(anyhow!(
                "Room is flagged unavailable"
            )));
        }

        let conflict = sqlx::query_as::<_, ConflictRow>(
            r#"SELECT cs.id AS schedule_id, c.name AS class_name, t.name AS teacher_name,
                      ts.starts_at, ts.ends_at
               FROM class_schedules cs
               JOIN classes c ON c.id = cs.class_id
               JOIN teachers t ON t.id = c.teacher_id
               JOIN time_slots ts ON ts.id = cs.time_slot_id
               WHERE cs.room_id = $1
                 AND cs.day_of_week = $2
                 AND cs.time_slot_id = $3
                 AND cs.status IN ('assigned', 'active')
                 AND cs.id <> $4
               FOR UPDATE OF cs"#,
        )
        .bind(room_id)
        .bind(slot.day_of_week)
        .bind(slot.time_slot_id)
        .bind(schedule_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(conflict) = conflict {
            metrics::track_assignment_conflict();
            return Err(AppError::conflict(anyhow!(
                "Room is already booked by {} ({}) on {} {}-{}",
                conflict.class_name,
                conflict.teacher_name,
                slot.day_of_week.label(),
                conflict.starts_at.format("%H:%M"),
                conflict.ends_at.format("%H:%M"),
            ))
            .with_details(json!({
                "conflicting_schedule_id": conflict.schedule_id,
                "class_name": conflict.class_name,
                "teacher_name": conflict.teacher_name,
                "day_of_week": slot.day_of_week,
                "starts_at": conflict.starts_at.format("%H:%M").to_string(),
                "ends_at": conflict.ends_at.format("%H:%M").to_string(),
            })));
        }

        let schedule = sqlx::query_as::<_, ClassSchedule>(&format!(
            "UPDATE class_schedules
             SET room_id = $1, status = 'assigned', assigned_by = $2, assigned_at = NOW(),
                 updated_at = NOW()
             WHERE id = $3
             RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(room_id)
        .bind(actor)
        .bind(schedule_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                metrics::track_assignment_conflict();
                return AppError::conflict(anyhow!(
                    "Room was booked concurrently for the same day and period"
                ));
            }
            AppError::from(e)
        })?;

        let class_status = Self::class_status(&mut *tx, schedule.class_id).await?;

        tx.commit().await?;

        metrics::track_room_assigned();

        let summary = SlotSummary {
            schedule,
            class_status,
        };
        events.publish(EventKind::RoomAssigned, vec![actor], &summary);

        Ok(summary)
    }

    /// Clear a slot's room and revert it to pending.
    ///
    /// Unassigning an already-unassigned slot is a no-op returning the
    /// same pending state.
    #[instrument(skip(db, events))]
    pub async fn unassign_room(
        db: &PgPool,
        events: &EventPublisher,
        schedule_id: ScheduleId,
        actor: UserId,
    ) -> Result<SlotSummary, AppError> {
        let mut tx = db.begin().await?;

        let slot = sqlx::query_as::<_, ClassSchedule>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM class_schedules WHERE id = $1 FOR UPDATE"
        ))
        .bind(schedule_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Schedule not found")))?;

        if slot.room_id.is_none() && slot.status == ScheduleStatus::PendingAssignment {
            let class_status = Self::class_status(&mut *tx, slot.class_id).await?;
            tx.commit().await?;
            return Ok(SlotSummary {
                schedule: slot,
                class_status,
            });
        }

        let schedule = sqlx::query_as::<_, ClassSchedule>(&format!(
            "UPDATE class_schedules
             SET room_id = NULL, status = 'pending_assignment', assigned_by = NULL,
                 assigned_at = NULL, updated_at = NOW()
             WHERE id = $1
             RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(schedule_id)
        .fetch_one(&mut *tx)
        .await?;

        let class_status = Self::class_status(&mut *tx, schedule.class_id).await?;

        tx.commit().await?;

        metrics::track_room_unassigned();

        let summary = SlotSummary {
            schedule,
            class_status,
        };
        events.publish(EventKind::RoomUnassigned, vec![actor], &summary);

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classrota_core::ErrorCode;
    use classrota_models::DayOfWeek;

    use crate::test_support::{
        create_class, create_room, create_schedule, date, mark_room_unavailable, seed_reference,
    };

    fn events() -> EventPublisher {
        EventPublisher::spawn()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn assign_sets_room_and_metadata(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let room = create_room(&pool, "R101", 30, refs.room_type_id, None).await;
        let class = create_class(
            &pool,
            "Algebra I",
            &refs,
            refs.room_type_id,
            25,
            date(2025, 9, 1),
            date(2026, 1, 30),
        )
        .await;
        let schedule = create_schedule(&pool, class, DayOfWeek::Monday, refs.period_1).await;

        let actor = UserId::new();
        let summary = AssignmentService::assign_room(&pool, &events(), schedule, room, actor)
            .await
            .unwrap();

        assert_eq!(summary.schedule.room_id, Some(room));
        assert_eq!(summary.schedule.status, ScheduleStatus::Assigned);
        assert_eq!(summary.schedule.assigned_by, Some(actor));
        assert!(summary.schedule.assigned_at.is_some());
        assert_eq!(summary.class_status, ClassStatus::Assigned);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn class_aggregate_flips_when_all_slots_assigned(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let r101 = create_room(&pool, "R101", 30, refs.room_type_id, None).await;
        let r102 = create_room(&pool, "R102", 30, refs.room_type_id, None).await;
        let class = create_class(
            &pool,
            "Algebra I",
            &refs,
            refs.room_type_id,
            25,
            date(2025, 9, 1),
            date(2026, 1, 30),
        )
        .await;
        let slot_a = create_schedule(&pool, class, DayOfWeek::Monday, refs.period_1).await;
        let slot_b = create_schedule(&pool, class, DayOfWeek::Wednesday, refs.period_1).await;

        let summary = AssignmentService::assign_room(&pool, &events(), slot_a, r101, UserId::new())
            .await
            .unwrap();
        assert_eq!(summary.class_status, ClassStatus::Pending);

        let summary = AssignmentService::assign_room(&pool, &events(), slot_b, r102, UserId::new())
            .await
            .unwrap();
        assert_eq!(summary.class_status, ClassStatus::Assigned);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn conflicting_assignment_is_rejected_with_details(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let room = create_room(&pool, "R201", 30, refs.room_type_id, None).await;
        let class_x = create_class(
            &pool,
            "Chemistry",
            &refs,
            refs.room_type_id,
            25,
            date(2025, 9, 1),
            date(2026, 1, 30),
        )
        .await;
        let class_y = create_class(
            &pool,
            "Biology",
            &refs,
            refs.room_type_id,
            25,
            date(2025, 9, 1),
            date(2026, 1, 30),
        )
        .await;
        let slot_x = create_schedule(&pool, class_x, DayOfWeek::Tuesday, refs.period_2).await;
        let slot_y = create_schedule(&pool, class_y, DayOfWeek::Tuesday, refs.period_2).await;

        AssignmentService::assign_room(&pool, &events(), slot_x, room, UserId::new())
            .await
            .unwrap();

        let err = AssignmentService::assign_room(&pool, &events(), slot_y, room, UserId::new())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(err.error.to_string().contains("Chemistry"));
        let details = err.details.unwrap();
        assert_eq!(details["class_name"], "Chemistry");
        assert_eq!(details["teacher_name"], "Test Teacher");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn same_room_different_period_is_fine(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let room = create_room(&pool, "R201", 30, refs.room_type_id, None).await;
        let class = create_class(
            &pool,
            "Chemistry",
            &refs,
            refs.room_type_id,
            25,
            date(2025, 9, 1),
            date(2026, 1, 30),
        )
        .await;
        let slot_a = create_schedule(&pool, class, DayOfWeek::Tuesday, refs.period_1).await;
        let slot_b = create_schedule(&pool, class, DayOfWeek::Tuesday, refs.period_2).await;

        AssignmentService::assign_room(&pool, &events(), slot_a, room, UserId::new())
            .await
            .unwrap();
        AssignmentService::assign_room(&pool, &events(), slot_b, room, UserId::new())
            .await
            .unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reassigning_a_confirmed_slot_is_rejected(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let r101 = create_room(&pool, "R101", 30, refs.room_type_id, None).await;
        let r102 = create_room(&pool, "R102", 30, refs.room_type_id, None).await;
        let class = create_class(
            &pool,
            "Algebra I",
            &refs,
            refs.room_type_id,
            25,
            date(2025, 9, 1),
            date(2026, 1, 30),
        )
        .await;
        let schedule = create_schedule(&pool, class, DayOfWeek::Monday, refs.period_1).await;

        AssignmentService::assign_room(&pool, &events(), schedule, r101, UserId::new())
            .await
            .unwrap();

        let err = AssignmentService::assign_room(&pool, &events(), schedule, r102, UserId::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(err.error.to_string().contains("already"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unavailable_room_is_rejected(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let room = create_room(&pool, "Closed", 30, refs.room_type_id, None).await;
        mark_room_unavailable(&pool, room).await;
        let class = create_class(
            &pool,
            "Algebra I",
            &refs,
            refs.room_type_id,
            25,
            date(2025, 9, 1),
            date(2026, 1, 30),
        )
        .await;
        let schedule = create_schedule(&pool, class, DayOfWeek::Monday, refs.period_1).await;

        let err = AssignmentService::assign_room(&pool, &events(), schedule, room, UserId::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RoomUnavailable);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unassign_reverts_to_pending_and_is_idempotent(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let room = create_room(&pool, "R101", 30, refs.room_type_id, None).await;
        let class = create_class(
            &pool,
            "Algebra I",
            &refs,
            refs.room_type_id,
            25,
            date(2025, 9, 1),
            date(2026, 1, 30),
        )
        .await;
        let schedule = create_schedule(&pool, class, DayOfWeek::Monday, refs.period_1).await;

        AssignmentService::assign_room(&pool, &events(), schedule, room, UserId::new())
            .await
            .unwrap();

        let summary =
            AssignmentService::unassign_room(&pool, &events(), schedule, UserId::new())
                .await
                .unwrap();
        assert_eq!(summary.schedule.room_id, None);
        assert_eq!(
            summary.schedule.status,
            ScheduleStatus::PendingAssignment
        );
        assert_eq!(summary.schedule.assigned_by, None);
        assert_eq!(summary.schedule.assigned_at, None);
        assert_eq!(summary.class_status, ClassStatus::Pending);

        // Second unassign is a no-op with the same result
        let again = AssignmentService::unassign_room(&pool, &events(), schedule, UserId::new())
            .await
            .unwrap();
        assert_eq!(again.schedule.room_id, None);
        assert_eq!(again.schedule.status, ScheduleStatus::PendingAssignment);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn missing_schedule_is_not_found(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let room = create_room(&pool, "R101", 30, refs.room_type_id, None).await;

        let err =
            AssignmentService::assign_room(&pool, &events(), ScheduleId::new(), room, UserId::new())
                .await
                .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn freed_room_can_be_assigned_after_unassign(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let room = create_room(&pool, "R201", 30, refs.room_type_id, None).await;
        let class_x = create_class(
            &pool,
            "Chemistry",
            &refs,
            refs.room_type_id,
            25,
            date(2025, 9, 1),
            date(2026, 1, 30),
        )
        .await;
        let class_y = create_class(
            &pool,
            "Biology",
            &refs,
            refs.room_type_id,
            25,
            date(2025, 9, 1),
            date(2026, 1, 30),
        )
        .await;
        let slot_x = create_schedule(&pool, class_x, DayOfWeek::Tuesday, refs.period_2).await;
        let slot_y = create_schedule(&pool, class_y, DayOfWeek::Tuesday, refs.period_2).await;

        AssignmentService::assign_room(&pool, &events(), slot_x, room, UserId::new())
            .await
            .unwrap();
        AssignmentService::unassign_room(&pool, &events(), slot_x, UserId::new())
            .await
            .unwrap();
        AssignmentService::assign_room(&pool, &events(), slot_y, room, UserId::new())
            .await
            .unwrap();
    }
}

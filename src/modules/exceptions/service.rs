use anyhow::anyhow;
use chrono::NaiveDate;
use serde_json::json;
use sqlx::PgPool;
use tracing::instrument;

use classrota_core::{AppError, PaginationMeta};
use classrota_models::{
    ApprovalStatus, ClassId, DayOfWeek, ExceptionId, ExceptionType, ScheduleStatus, TimeSlotId,
    UserId, ViewerRole,
};

use crate::events::{EventKind, EventPublisher};
use crate::metrics;
use crate::middleware::auth::AuthContext;
use crate::modules::assignments::service::AssignmentService;
use crate::modules::availability::service::AvailabilityService;
use crate::modules::exceptions::model::{
    CreateExceptionDto, ExceptionFilterParams, PaginatedExceptionsResponse, ScheduleException,
    UpdateExceptionDto,
};

const EXCEPTION_COLUMNS: &str = "id, class_schedule_id, class_id, exception_date, \
     exception_type, moved_to_date, moved_to_time_slot_id, moved_to_room_id, \
     substitute_teacher_id, reason, approval_status, approved_by, approved_at, \
     created_by, created_at, updated_at";

/// The base slot joined with its class's validity window.
#[derive(Debug, sqlx::FromRow)]
struct BaseSlot {
    class_id: ClassId,
    time_slot_id: TimeSlotId,
    status: ScheduleStatus,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Debug, sqlx::FromRow)]
struct ClassWindow {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

pub struct ExceptionService;

impl ExceptionService {
    fn check_window(
        label: &str,
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(), AppError> {
        if date < start || date > end {
            return Err(AppError::validation(anyhow!(
                "{} {} is outside the class validity window ({} to {})",
                label,
                date,
                start,
                end,
            )));
        }
        Ok(())
    }

    /// Field-shape validation per exception kind.
    fn check_shape(dto: &CreateExceptionDto) -> Result<(), AppError> {
        match dto.exception_type {
            ExceptionType::Substitute => {
                if dto.substitute_teacher_id.is_none() {
                    return Err(AppError::validation(anyhow!(
                        "substitute_teacher_id is required for a substitute exception"
                    )));
                }
            }
            ExceptionType::RoomChange => {
                if dto.moved_to_room_id.is_none() {
                    return Err(AppError::validation(anyhow!(
                        "moved_to_room_id is required for a room-change exception"
                    )));
                }
            }
            ExceptionType::Cancelled => {
                if dto.moved_to_date.is_some()
                    || dto.moved_to_time_slot_id.is_some()
                    || dto.moved_to_room_id.is_some()
                {
                    return Err(AppError::validation(anyhow!(
                        "a cancellation cannot carry a redirect target"
                    )));
                }
            }
            ExceptionType::Moved | ExceptionType::Exam => {}
        }

        if dto.class_schedule_id.is_none() {
            if dto.exception_type != ExceptionType::Exam {
                return Err(AppError::validation(anyhow!(
                    "class_schedule_id is required for non-exam exceptions"
                )));
            }
            if dto.class_id.is_none() {
                return Err(AppError::validation(anyhow!(
                    "class_id is required for a standalone exam exception"
                )));
            }
            if dto.moved_to_time_slot_id.is_none() {
                return Err(AppError::validation(anyhow!(
                    "moved_to_time_slot_id is required for a standalone exam exception"
                )));
            }
        }

        Ok(())
    }

    /// Validate that a redirect target (room at date/period) is free,
    /// counting both recurring assignments and other approved
    /// exceptions.
    async fn check_target(
        db: &PgPool,
        dto: &CreateExceptionDto,
        base_slot: Option<&BaseSlot>,
    ) -> Result<(), AppError> {
        let Some(target_room) = dto.moved_to_room_id else {
            return Ok(());
        };

        let target_date = dto.moved_to_date.unwrap_or(dto.exception_date);
        let target_slot = dto
            .moved_to_time_slot_id
            .or(base_slot.map(|s| s.time_slot_id))
            .ok_or_else(|| {
                AppError::validation(anyhow!(
                    "moved_to_time_slot_id is required when there is no base slot"
                ))
            })?;
        let target_day = DayOfWeek::from_date(target_date);

        let free = AvailabilityService::is_room_free(
            db,
            target_room,
            target_day.as_i16(),
            target_slot,
            Some(target_date),
        )
        .await?;

        if !free.free {
            return Err(AppError::target_conflict(anyhow!(
                "Target room is not free on {} at the requested period",
                target_date
            ))
            .with_details(json!({
                "room_id": target_room,
                "date": target_date,
                "time_slot_id": target_slot,
            })));
        }

        Ok(())
    }

    /// Create an exception record.
    ///
    /// Admin-created exceptions are auto-approved (and their redirect,
    /// if any, propagates onto the base slot immediately); teacher
    /// self-service requests start pending.
    #[instrument(skip(db, events, ctx))]
    pub async fn create_exception(
        db: &PgPool,
        events: &EventPublisher,
        ctx: &AuthContext,
        dto: CreateExceptionDto,
    ) -> Result<ScheduleException, AppError> {
        Self::check_shape(&dto)?;

        // Resolve the base slot (or the class, for standalone exams)
        let base_slot = match dto.class_schedule_id {
            Some(schedule_id) => {
                let slot = sqlx::query_as::<_, BaseSlot>(
                    r#"SELECT cs.class_id, cs.time_slot_id, cs.status, c.start_date, c.end_date
                       FROM class_schedules cs
                       JOIN classes c ON c.id = cs.class_id
                       WHERE cs.id = $1"#,
                )
                .bind(schedule_id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow!("Schedule not found")))?;

                if slot.status == ScheduleStatus::Cancelled {
                    return Err(AppError::validation(anyhow!(
                        "Cannot create an exception for a cancelled schedule"
                    )));
                }
                Some(slot)
            }
            None => None,
        };

        let (class_id, window_start, window_end) = match &base_slot {
            Some(slot) => (slot.class_id, slot.start_date, slot.end_date),
            None => {
                let class_id = dto.class_id.ok_or_else(|| {
                    AppError::validation(anyhow!(
                        "class_id is required for a standalone exam exception"
                    ))
                })?;
                let window = sqlx::query_as::<_, ClassWindow>(
                    "SELECT start_date, end_date FROM classes WHERE id = $1",
                )
                .bind(class_id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow!("Class not found")))?;
                (class_id, window.start_date, window.end_date)
            }
        };

        Self::check_window("Exception date", dto.exception_date, window_start, window_end)?;
        if let Some(moved_to) = dto.moved_to_date {
            Self::check_window("Redirect date", moved_to, window_start, window_end)?;
        }

        let duplicate = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                SELECT 1 FROM schedule_exceptions
                WHERE class_schedule_id IS NOT DISTINCT FROM $1
                  AND class_id = $2
                  AND exception_date = $3
                  AND exception_type = $4
            )"#,
        )
        .bind(dto.class_schedule_id)
        .bind(class_id)
        .bind(dto.exception_date)
        .bind(dto.exception_type)
        .fetch_one(db)
        .await?;

        if duplicate {
            return Err(AppError::validation(anyhow!(
                "An exception of this type already exists for this slot and date"
            )));
        }

        Self::check_target(db, &dto, base_slot.as_ref()).await?;

        let auto_approve = ctx.role == ViewerRole::Admin;

        let exception = sqlx::query_as::<_, ScheduleException>(&format!(
            "INSERT INTO schedule_exceptions
                 (class_schedule_id, class_id, exception_date, exception_type,
                  moved_to_date, moved_to_time_slot_id, moved_to_room_id,
                  substitute_teacher_id, reason, approval_status,
                  approved_by, approved_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                     CASE WHEN $10 THEN 'approved'::approval_status ELSE 'pending'::approval_status END,
                     CASE WHEN $10 THEN $11 END,
                     CASE WHEN $10 THEN NOW() END,
                     $11)
             RETURNING {EXCEPTION_COLUMNS}"
        ))
        .bind(dto.class_schedule_id)
        .bind(class_id)
        .bind(dto.exception_date)
        .bind(dto.exception_type)
        .bind(dto.moved_to_date)
        .bind(dto.moved_to_time_slot_id)
        .bind(dto.moved_to_room_id)
        .bind(dto.substitute_teacher_id)
        .bind(&dto.reason)
        .bind(auto_approve)
        .bind(ctx.user_id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::validation(anyhow!(
                    "An exception of this type already exists for this slot and date"
                ));
            }
            AppError::from(e)
        })?;

        metrics::track_exception_created(exception.exception_type.label());

        if auto_approve {
            // If the redirect cannot land on the base slot, the record
            // must not survive either.
            if let Err(err) = Self::propagate_redirect(db, events, &exception, ctx.user_id).await
            {
                sqlx::query("DELETE FROM schedule_exceptions WHERE id = $1")
                    .bind(exception.id)
                    .execute(db)
                    .await?;
                return Err(err);
            }
            events.publish(
                EventKind::ScheduleExceptionUpdated,
                vec![ctx.user_id],
                &exception,
            );
        } else {
            events.publish(
                EventKind::ScheduleRequestCreated,
                vec![ctx.user_id],
                &exception,
            );
        }

        Ok(exception)
    }

    /// Apply an approved move/room-change redirect to the base slot via
    /// the assignment engine (same conflict validation, same aggregate
    /// recompute).
    async fn propagate_redirect(
        db: &PgPool,
        events: &EventPublisher,
        exception: &ScheduleException,
        actor: UserId,
    ) -> Result<(), AppError> {
        let propagates = matches!(
            exception.exception_type,
            ExceptionType::Moved | ExceptionType::RoomChange
        );
        if !propagates {
            return Ok(());
        }
        let (Some(schedule_id), Some(room_id)) =
            (exception.class_schedule_id, exception.moved_to_room_id)
        else {
            return Ok(());
        };

        let summary =
            AssignmentService::propagate_room(db, events, schedule_id, room_id, actor).await?;
        events.publish(EventKind::ScheduleUpdated, vec![actor], &summary);
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn get_exception(
        db: &PgPool,
        id: ExceptionId,
    ) -> Result<ScheduleException, AppError> {
        let exception = sqlx::query_as::<_, ScheduleException>(&format!(
            "SELECT {EXCEPTION_COLUMNS} FROM schedule_exceptions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Exception not found")))?;

        Ok(exception)
    }

    #[instrument(skip(db))]
    pub async fn list_exceptions(
        db: &PgPool,
        filters: ExceptionFilterParams,
    ) -> Result<PaginatedExceptionsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        const WHERE_CLAUSE: &str = r#"
            WHERE ($1::uuid IS NULL OR class_schedule_id = $1)
              AND ($2::uuid IS NULL OR class_id = $2)
              AND ($3::exception_type IS NULL OR exception_type = $3)
              AND ($4::approval_status IS NULL OR approval_status = $4)
              AND ($5::date IS NULL OR exception_date >= $5)
              AND ($6::date IS NULL OR exception_date <= $6)"#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM schedule_exceptions {WHERE_CLAUSE}"
        ))
        .bind(filters.class_schedule_id)
        .bind(filters.class_id)
        .bind(filters.exception_type)
        .bind(filters.approval_status)
        .bind(filters.from_date)
        .bind(filters.to_date)
        .fetch_one(db)
        .await?;

        let data = sqlx::query_as::<_, ScheduleException>(&format!(
            "SELECT {EXCEPTION_COLUMNS} FROM schedule_exceptions {WHERE_CLAUSE}
             ORDER BY exception_date ASC, created_at ASC
             LIMIT $7 OFFSET $8"
        ))
        .bind(filters.class_schedule_id)
        .bind(filters.class_id)
        .bind(filters.exception_type)
        .bind(filters.approval_status)
        .bind(filters.from_date)
        .bind(filters.to_date)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        let has_more = offset + limit < total;

        Ok(PaginatedExceptionsResponse {
            data,
            meta: PaginationMeta {
                total,
                limit,
                offset: Some(offset),
                page: filters.pagination.page(),
                has_more,
            },
        })
    }

    /// Administrative correction of an exception's fields.
    #[instrument(skip(db, events))]
    pub async fn update_exception(
        db: &PgPool,
        events: &EventPublisher,
        id: ExceptionId,
        dto: UpdateExceptionDto,
        actor: UserId,
    ) -> Result<ScheduleException, AppError> {
        let existing = Self::get_exception(db, id).await?;

        let reason = dto.reason.unwrap_or(existing.reason);
        let moved_to_date = dto.moved_to_date.or(existing.moved_to_date);
        let moved_to_time_slot_id = dto.moved_to_time_slot_id.or(existing.moved_to_time_slot_id);
        let moved_to_room_id = dto.moved_to_room_id.or(existing.moved_to_room_id);
        let substitute_teacher_id = dto.substitute_teacher_id.or(existing.substitute_teacher_id);

        if let Some(moved_to) = moved_to_date {
            let window = sqlx::query_as::<_, ClassWindow>(
                "SELECT start_date, end_date FROM classes WHERE id = $1",
            )
            .bind(existing.class_id)
            .fetch_one(db)
            .await?;
            Self::check_window("Redirect date", moved_to, window.start_date, window.end_date)?;
        }

        let exception = sqlx::query_as::<_, ScheduleException>(&format!(
            "UPDATE schedule_exceptions
             SET reason = $1, moved_to_date = $2, moved_to_time_slot_id = $3,
                 moved_to_room_id = $4, substitute_teacher_id = $5, updated_at = NOW()
             WHERE id = $6
             RETURNING {EXCEPTION_COLUMNS}"
        ))
        .bind(&reason)
        .bind(moved_to_date)
        .bind(moved_to_time_slot_id)
        .bind(moved_to_room_id)
        .bind(substitute_teacher_id)
        .bind(id)
        .fetch_one(db)
        .await?;

        events.publish(EventKind::ScheduleExceptionUpdated, vec![actor], &exception);

        Ok(exception)
    }

    /// Pending -> Approved, stamping approver and time exactly once.
    /// Re-approving an approved exception is a no-op on those fields.
    #[instrument(skip(db, events))]
    pub async fn approve_exception(
        db: &PgPool,
        events: &EventPublisher,
        id: ExceptionId,
        approver: UserId,
    ) -> Result<ScheduleException, AppError> {
        let existing = Self::get_exception(db, id).await?;

        let exception = match existing.approval_status {
            ApprovalStatus::Approved => existing,
            ApprovalStatus::Rejected => {
                return Err(AppError::validation(anyhow!(
                    "A rejected exception cannot be approved"
                )));
            }
            ApprovalStatus::Pending => {
                let updated = sqlx::query_as::<_, ScheduleException>(&format!(
                    "UPDATE schedule_exceptions
                     SET approval_status = 'approved', approved_by = $1, approved_at = NOW(),
                         updated_at = NOW()
                     WHERE id = $2 AND approval_status = 'pending'
                     RETURNING {EXCEPTION_COLUMNS}"
                ))
                .bind(approver)
                .bind(id)
                .fetch_optional(db)
                .await?
                // Lost a race with another approver: fields were stamped
                // exactly once by them.
                .unwrap_or(existing);

                if let Err(err) = Self::propagate_redirect(db, events, &updated, approver).await {
                    // The approval stands or falls with its propagation.
                    sqlx::query(
                        "UPDATE schedule_exceptions
                         SET approval_status = 'pending', approved_by = NULL, approved_at = NULL,
                             updated_at = NOW()
                         WHERE id = $1",
                    )
                    .bind(id)
                    .execute(db)
                    .await?;
                    return Err(err);
                }
                events.publish(EventKind::ScheduleExceptionUpdated, vec![approver], &updated);
                updated
            }
        };

        Ok(exception)
    }

    /// Pending -> Rejected.
    #[instrument(skip(db, events))]
    pub async fn reject_exception(
        db: &PgPool,
        events: &EventPublisher,
        id: ExceptionId,
        actor: UserId,
    ) -> Result<ScheduleException, AppError> {
        let existing = Self::get_exception(db, id).await?;

        if existing.approval_status != ApprovalStatus::Pending {
            return Err(AppError::validation(anyhow!(
                "Only a pending exception can be rejected"
            )));
        }

        let exception = sqlx::query_as::<_, ScheduleException>(&format!(
            "UPDATE schedule_exceptions
             SET approval_status = 'rejected', updated_at = NOW()
             WHERE id = $1
             RETURNING {EXCEPTION_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(db)
        .await?;

        events.publish(EventKind::ScheduleExceptionUpdated, vec![actor], &exception);

        Ok(exception)
    }

    #[instrument(skip(db, events))]
    pub async fn delete_exception(
        db: &PgPool,
        events: &EventPublisher,
        id: ExceptionId,
        actor: UserId,
    ) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM schedule_exceptions WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Exception not found")));
        }

        events.publish(
            EventKind::ScheduleExceptionUpdated,
            vec![actor],
            &json!({ "id": id, "deleted": true }),
        );

        Ok(())
    }
}

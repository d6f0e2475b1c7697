use std::collections::HashMap;

use chrono::{Days, NaiveDate, NaiveTime};
use sqlx::PgPool;
use tracing::{instrument, warn};

use classrota_core::AppError;
use classrota_models::week::{sunday_of, week_index_for};
use classrota_models::{
    ClassId, DayOfWeek, ExceptionType, RoomId, ScheduleId, ScheduleStatus, TeacherId, TimeSlotId,
    ViewerRole, WeekPattern,
};

use crate::middleware::auth::AuthContext;
use crate::modules::weekly::merge::merge_exceptions;
use crate::modules::weekly::model::{
    EffectiveScheduleRow, OccurrenceException, WeeklyScheduleQuery, WeeklyScheduleResponse,
};

/// A candidate slot with everything the resolver needs in one row.
///
/// `day_of_week` and the period columns are kept loose on purpose: a row
/// with a dangling or malformed reference is logged and skipped, never
/// fatal.
#[derive(Debug, sqlx::FromRow)]
struct SlotRow {
    schedule_id: ScheduleId,
    class_id: ClassId,
    day_of_week: i16,
    time_slot_id: TimeSlotId,
    week_pattern: WeekPattern,
    start_week: i32,
    end_week: i32,
    room_id: Option<RoomId>,
    status: ScheduleStatus,
    class_name: String,
    teacher_id: TeacherId,
    teacher_name: String,
    class_start: NaiveDate,
    class_end: NaiveDate,
    room_name: Option<String>,
    period: Option<i32>,
    starts_at: Option<NaiveTime>,
    ends_at: Option<NaiveTime>,
}

#[derive(Debug, sqlx::FromRow)]
struct ExceptionRow {
    class_schedule_id: ScheduleId,
    exception_date: NaiveDate,
    exception_type: ExceptionType,
    moved_to_date: Option<NaiveDate>,
    moved_to_time_slot_id: Option<TimeSlotId>,
    moved_to_room_id: Option<RoomId>,
    substitute_teacher_id: Option<TeacherId>,
    substitute_teacher_name: Option<String>,
    reason: String,
}

#[derive(Debug, sqlx::FromRow)]
struct StandaloneExamRow {
    class_id: ClassId,
    class_name: String,
    teacher_id: TeacherId,
    teacher_name: String,
    exception_date: NaiveDate,
    moved_to_time_slot_id: Option<TimeSlotId>,
    moved_to_room_id: Option<RoomId>,
    room_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PeriodInfo {
    id: TimeSlotId,
    sequence: i32,
    starts_at: NaiveTime,
    ends_at: NaiveTime,
}

/// Role-based visibility, applied before any exception merging.
///
/// `substitute_for_date` is the approved substitute of this occurrence,
/// if any; a substitute sees the slot they cover.
fn visible_to(
    ctx: &AuthContext,
    status: ScheduleStatus,
    room_id: Option<RoomId>,
    instructor: TeacherId,
    substitute_for_date: Option<TeacherId>,
) -> bool {
    match ctx.role {
        ViewerRole::Admin => {
            room_id.is_some() || status == ScheduleStatus::PendingAssignment
        }
        ViewerRole::Teacher => {
            let viewer = TeacherId::from_uuid(ctx.user_id.into_inner());
            instructor == viewer || substitute_for_date == Some(viewer)
        }
        ViewerRole::Student => room_id.is_some(),
    }
}

pub struct WeeklyScheduleService;

impl WeeklyScheduleService {
    /// Resolve the effective schedule for the week containing
    /// `query.week_start_date`, for the viewer in `ctx`.
    ///
    /// Pure read: the overlay is recomputed from the base slots and the
    /// approved exceptions on every call, nothing derived is stored.
    #[instrument(skip(db, ctx))]
    pub async fn resolve_week(
        db: &PgPool,
        ctx: &AuthContext,
        query: WeeklyScheduleQuery,
    ) -> Result<WeeklyScheduleResponse, AppError> {
        let week_start = sunday_of(query.week_start_date);
        let week_end = week_start + Days::new(6);

        let slots = sqlx::query_as::<_, SlotRow>(
            r#"SELECT cs.id AS schedule_id, cs.class_id, cs.day_of_week, cs.time_slot_id,
                      cs.week_pattern, cs.start_week, cs.end_week, cs.room_id, cs.status,
                      c.name AS class_name, c.teacher_id, t.name AS teacher_name,
                      c.start_date AS class_start, c.end_date AS class_end,
                      r.name AS room_name,
                      ts.sequence AS period, ts.starts_at, ts.ends_at
               FROM class_schedules cs
               JOIN classes c ON c.id = cs.class_id
               JOIN teachers t ON t.id = c.teacher_id
               LEFT JOIN rooms r ON r.id = cs.room_id
               LEFT JOIN time_slots ts ON ts.id = cs.time_slot_id
               WHERE cs.status <> 'cancelled'
                 AND c.start_date <= $2
                 AND c.end_date >= $1
                 AND ($3::uuid IS NULL OR c.department_id = $3)
                 AND ($4::uuid IS NULL OR cs.class_id = $4)
                 AND ($5::uuid IS NULL OR c.teacher_id = $5)"#,
        )
        .bind(week_start)
        .bind(week_end)
        .bind(query.department_id)
        .bind(query.class_id)
        .bind(query.teacher_id)
        .fetch_all(db)
        .await?;

        let schedule_ids: Vec<ScheduleId> = slots.iter().map(|s| s.schedule_id).collect();

        let exception_rows = sqlx::query_as::<_, ExceptionRow>(
            r#"SELECT e.class_schedule_id, e.exception_date, e.exception_type,
                      e.moved_to_date, e.moved_to_time_slot_id, e.moved_to_room_id,
                      e.substitute_teacher_id, sub.name AS substitute_teacher_name,
                      e.reason
               FROM schedule_exceptions e
               LEFT JOIN teachers sub ON sub.id = e.substitute_teacher_id
               WHERE e.approval_status = 'approved'
                 AND e.class_schedule_id = ANY($1)
                 AND e.exception_date BETWEEN $2 AND $3"#,
        )
        .bind(&schedule_ids)
        .bind(week_start)
        .bind(week_end)
        .fetch_all(db)
        .await?;

        let mut exceptions: HashMap<(ScheduleId, NaiveDate), Vec<OccurrenceException>> =
            HashMap::new();
        for row in exception_rows {
            exceptions
                .entry((row.class_schedule_id, row.exception_date))
                .or_default()
                .push(OccurrenceException {
                    exception_type: row.exception_type,
                    exception_date: row.exception_date,
                    moved_to_date: row.moved_to_date,
                    moved_to_time_slot_id: row.moved_to_time_slot_id,
                    moved_to_room_id: row.moved_to_room_id,
                    substitute_teacher_id: row.substitute_teacher_id,
                    substitute_teacher_name: row.substitute_teacher_name,
                    reason: row.reason,
                });
        }

        // The period table is small and fixed; one map serves both the
        // base rows and any redirect overrides.
        let periods: HashMap<TimeSlotId, PeriodInfo> = sqlx::query_as::<_, PeriodInfo>(
            "SELECT id, sequence, starts_at, ends_at FROM time_slots",
        )
        .fetch_all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.clone()))
        .collect();

        let room_names: HashMap<RoomId, String> =
            sqlx::query_as::<_, (RoomId, String)>("SELECT id, name FROM rooms")
                .fetch_all(db)
                .await?
                .into_iter()
                .collect();

        let mut rows: Vec<EffectiveScheduleRow> = Vec::new();

        for slot in &slots {
            let Some(day) = DayOfWeek::from_i16(slot.day_of_week) else {
                warn!(
                    schedule_id = %slot.schedule_id,
                    day_of_week = slot.day_of_week,
                    "skipping slot with malformed day of week"
                );
                continue;
            };

            let occurrence_date = day.date_in_week(week_start);

            // Validity window and recurrence bounds
            if occurrence_date < slot.class_start || occurrence_date > slot.class_end {
                continue;
            }
            let week_index = week_index_for(slot.class_start, week_start);
            if week_index < slot.start_week || week_index > slot.end_week {
                continue;
            }
            if !slot.week_pattern.includes(week_index) {
                continue;
            }

            let day_exceptions = exceptions
                .get(&(slot.schedule_id, occurrence_date))
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let substitute_for_date = day_exceptions
                .iter()
                .find(|e| e.exception_type == ExceptionType::Substitute)
                .and_then(|e| e.substitute_teacher_id);

            if !visible_to(ctx, slot.status, slot.room_id, slot.teacher_id, substitute_for_date) {
                continue;
            }

            let effect = merge_exceptions(day_exceptions);

            // A cross-date redirect materializes only when it lands on
            // another day inside the requested week.
            let redirect_shown = effect.redirect.as_ref().is_some_and(|r| {
                r.date >= week_start && r.date <= week_end && r.date != occurrence_date
            });

            if let Some(display) = &effect.original {
                // A vacated original is shown (as the counterpart of the
                // redirect row) only while the move stays in the week.
                if display.vacated && !redirect_shown {
                    continue;
                }
                let time_slot_id = display.time_slot_override.unwrap_or(slot.time_slot_id);
                let period = match display.time_slot_override {
                    Some(id) => periods.get(&id).cloned(),
                    None => slot.period.map(|sequence| PeriodInfo {
                        id: slot.time_slot_id,
                        sequence,
                        // period implies both times are present in the row
                        starts_at: slot.starts_at.unwrap_or_default(),
                        ends_at: slot.ends_at.unwrap_or_default(),
                    }),
                };
                let Some(period) = period else {
                    warn!(
                        schedule_id = %slot.schedule_id,
                        "skipping slot with missing time-slot reference"
                    );
                    continue;
                };

                let (room_id, room_name) = match display.room_override {
                    Some(id) => match room_names.get(&id) {
                        Some(name) => (Some(id), Some(name.clone())),
                        None => {
                            warn!(
                                schedule_id = %slot.schedule_id,
                                room_id = %id,
                                "skipping slot with dangling room-change target"
                            );
                            continue;
                        }
                    },
                    None => (slot.room_id, slot.room_name.clone()),
                };

                let substitute_teacher_name = display.substitute_teacher_id.and_then(|id| {
                    day_exceptions
                        .iter()
                        .find(|e| e.substitute_teacher_id == Some(id))
                        .and_then(|e| e.substitute_teacher_name.clone())
                });

                let note = if display.vacated {
                    effect.redirect.as_ref().map(|r| {
                        let target_day = DayOfWeek::from_date(r.date);
                        let target_period = r
                            .time_slot_id
                            .and_then(|id| periods.get(&id))
                            .map(|p| p.sequence)
                            .unwrap_or(period.sequence);
                        format!("moved to {} period {}", target_day.label(), target_period)
                    })
                } else {
                    None
                };

                rows.push(EffectiveScheduleRow {
                    schedule_id: Some(slot.schedule_id),
                    class_id: slot.class_id,
                    class_name: slot.class_name.clone(),
                    teacher_id: slot.teacher_id,
                    teacher_name: slot.teacher_name.clone(),
                    substitute_teacher_id: display.substitute_teacher_id,
                    substitute_teacher_name,
                    day_of_week: day,
                    date: occurrence_date,
                    time_slot_id,
                    period: period.sequence,
                    starts_at: period.starts_at,
                    ends_at: period.ends_at,
                    room_id,
                    room_name,
                    status: display.status_override.unwrap_or(slot.status),
                    exception_type: display.applied,
                    note,
                });
            }

            if let Some(redirect) = &effect.redirect {
                if !redirect_shown {
                    continue;
                }

                let target_slot_id = redirect.time_slot_id.unwrap_or(slot.time_slot_id);
                let Some(period) = periods.get(&target_slot_id) else {
                    warn!(
                        schedule_id = %slot.schedule_id,
                        "skipping moved occurrence with missing target period"
                    );
                    continue;
                };

                let room_id = redirect.room_id.or(slot.room_id);
                let room_name = room_id.and_then(|id| room_names.get(&id).cloned());

                let origin_period = slot.period.unwrap_or(0);
                let note = format!("moved from {} period {}", day.label(), origin_period);

                let substitute_teacher_name =
                    redirect.substitute_teacher_id.and_then(|id| {
                        day_exceptions
                            .iter()
                            .find(|e| e.substitute_teacher_id == Some(id))
                            .and_then(|e| e.substitute_teacher_name.clone())
                    });

                rows.push(EffectiveScheduleRow {
                    schedule_id: Some(slot.schedule_id),
                    class_id: slot.class_id,
                    class_name: slot.class_name.clone(),
                    teacher_id: slot.teacher_id,
                    teacher_name: slot.teacher_name.clone(),
                    substitute_teacher_id: redirect.substitute_teacher_id,
                    substitute_teacher_name,
                    day_of_week: DayOfWeek::from_date(redirect.date),
                    date: redirect.date,
                    time_slot_id: target_slot_id,
                    period: period.sequence,
                    starts_at: period.starts_at,
                    ends_at: period.ends_at,
                    room_id,
                    room_name,
                    status: if redirect.kind == ExceptionType::Exam {
                        ScheduleStatus::Exam
                    } else {
                        slot.status
                    },
                    exception_type: Some(redirect.kind),
                    note: Some(note),
                });
            }
        }

        Self::append_standalone_exams(db, ctx, &query, week_start, week_end, &periods, &mut rows)
            .await?;

        rows.sort_by(|a, b| {
            (a.date, a.period, a.class_name.as_str()).cmp(&(b.date, b.period, b.class_name.as_str()))
        });

        Ok(WeeklyScheduleResponse {
            week_start_date: week_start,
            rows,
        })
    }

    /// Final exams with no base slot resolve directly from the class
    /// and the exception record.
    async fn append_standalone_exams(
        db: &PgPool,
        ctx: &AuthContext,
        query: &WeeklyScheduleQuery,
        week_start: NaiveDate,
        week_end: NaiveDate,
        periods: &HashMap<TimeSlotId, PeriodInfo>,
        rows: &mut Vec<EffectiveScheduleRow>,
    ) -> Result<(), AppError> {
        let exams = sqlx::query_as::<_, StandaloneExamRow>(
            r#"SELECT e.class_id, c.name AS class_name, c.teacher_id, t.name AS teacher_name,
                      e.exception_date, e.moved_to_time_slot_id, e.moved_to_room_id,
                      r.name AS room_name
               FROM schedule_exceptions e
               JOIN classes c ON c.id = e.class_id
               JOIN teachers t ON t.id = c.teacher_id
               LEFT JOIN rooms r ON r.id = e.moved_to_room_id
               WHERE e.approval_status = 'approved'
                 AND e.class_schedule_id IS NULL
                 AND e.exception_type = 'exam'
                 AND e.exception_date BETWEEN $1 AND $2
                 AND ($3::uuid IS NULL OR c.department_id = $3)
                 AND ($4::uuid IS NULL OR e.class_id = $4)
                 AND ($5::uuid IS NULL OR c.teacher_id = $5)"#,
        )
        .bind(week_start)
        .bind(week_end)
        .bind(query.department_id)
        .bind(query.class_id)
        .bind(query.teacher_id)
        .fetch_all(db)
        .await?;

        for exam in exams {
            if !visible_to(
                ctx,
                ScheduleStatus::Exam,
                exam.moved_to_room_id,
                exam.teacher_id,
                None,
            ) {
                continue;
            }

            let Some(slot_id) = exam.moved_to_time_slot_id else {
                warn!(
                    class_id = %exam.class_id,
                    date = %exam.exception_date,
                    "skipping standalone exam with no period"
                );
                continue;
            };
            let Some(period) = periods.get(&slot_id) else {
                warn!(
                    class_id = %exam.class_id,
                    "skipping standalone exam with dangling period reference"
                );
                continue;
            };

            rows.push(EffectiveScheduleRow {
                schedule_id: None,
                class_id: exam.class_id,
                class_name: exam.class_name,
                teacher_id: exam.teacher_id,
                teacher_name: exam.teacher_name,
                substitute_teacher_id: None,
                substitute_teacher_name: None,
                day_of_week: DayOfWeek::from_date(exam.exception_date),
                date: exam.exception_date,
                time_slot_id: slot_id,
                period: period.sequence,
                starts_at: period.starts_at,
                ends_at: period.ends_at,
                room_id: exam.moved_to_room_id,
                room_name: exam.room_name,
                status: ScheduleStatus::Exam,
                exception_type: Some(ExceptionType::Exam),
                note: None,
            });
        }

        Ok(())
    }
}

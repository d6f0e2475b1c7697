use anyhow::anyhow;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::instrument;

use classrota_core::AppError;
use classrota_models::{DayOfWeek, ExceptionType, RoomId, ScheduleId, TimeSlotId};

use crate::modules::availability::model::{
    AvailableRoomsQuery, AvailableRoomsResponse, FreedRoom, OccupiedRoom, RoomCandidate,
    RoomFreeResponse,
};

/// A slot occupying a room at the requested day/period.
#[derive(Debug, sqlx::FromRow)]
struct OccupancyRow {
    schedule_id: ScheduleId,
    room_id: RoomId,
    class_name: String,
    teacher_name: String,
}

/// An approved exception that may vacate an occupying slot on the date.
#[derive(Debug, sqlx::FromRow)]
struct VacancyRow {
    class_schedule_id: ScheduleId,
    exception_type: ExceptionType,
    exception_date: NaiveDate,
    original_room_id: Option<RoomId>,
    moved_to_date: Option<NaiveDate>,
    moved_to_time_slot_id: Option<TimeSlotId>,
    moved_to_room_id: Option<RoomId>,
}

/// An approved exception redirected into the requested date/period.
#[derive(Debug, sqlx::FromRow)]
struct RedirectRow {
    moved_to_room_id: RoomId,
    class_name: String,
    teacher_name: String,
}

/// Whether an approved cancel/move/exam exception actually vacates the
/// slot's original room on its date.
///
/// A cancellation always vacates. A move/exam vacates only when the
/// redirect relocates the occurrence: different date, different period,
/// or different room. A move/exam with no redirect leaves the class in
/// place.
pub(crate) fn exception_vacates(
    exception_type: ExceptionType,
    exception_date: NaiveDate,
    original_slot: TimeSlotId,
    original_room: Option<RoomId>,
    moved_to_date: Option<NaiveDate>,
    moved_to_time_slot_id: Option<TimeSlotId>,
    moved_to_room_id: Option<RoomId>,
) -> bool {
    match exception_type {
        ExceptionType::Cancelled => true,
        ExceptionType::Moved | ExceptionType::Exam => {
            moved_to_date.is_some_and(|d| d != exception_date)
                || moved_to_time_slot_id.is_some_and(|s| s != original_slot)
                || moved_to_room_id.is_some_and(|r| Some(r) != original_room)
        }
        _ => false,
    }
}

pub struct AvailabilityService;

impl AvailabilityService {
    fn parse_day(day_of_week: i16) -> Result<DayOfWeek, AppError> {
        DayOfWeek::from_i16(day_of_week)
            .ok_or_else(|| AppError::validation(anyhow!("day_of_week must be 1..7")))
    }

    /// Rooms occupied by an active recurring slot at (day, period).
    async fn occupancies(
        db: &PgPool,
        day: DayOfWeek,
        time_slot_id: TimeSlotId,
    ) -> Result<Vec<OccupancyRow>, AppError> {
        let rows = sqlx::query_as::<_, OccupancyRow>(
            r#"SELECT cs.id AS schedule_id, cs.room_id, c.name AS class_name, t.name AS teacher_name
               FROM class_schedules cs
               JOIN classes c ON c.id = cs.class_id
               JOIN teachers t ON t.id = c.teacher_id
               WHERE cs.day_of_week = $1
                 AND cs.time_slot_id = $2
                 AND cs.status IN ('assigned', 'active')
                 AND cs.room_id IS NOT NULL"#,
        )
        .bind(day)
        .bind(time_slot_id)
        .fetch_all(db)
        .await?;

        Ok(rows)
    }

    /// Approved exceptions on `date` attached to slots at (day, period).
    async fn vacancies_on(
        db: &PgPool,
        day: DayOfWeek,
        time_slot_id: TimeSlotId,
        date: NaiveDate,
    ) -> Result<Vec<VacancyRow>, AppError> {
        let rows = sqlx::query_as::<_, VacancyRow>(
            r#"SELECT e.class_schedule_id, e.exception_type, e.exception_date,
                      cs.room_id AS original_room_id,
                      e.moved_to_date, e.moved_to_time_slot_id, e.moved_to_room_id
               FROM schedule_exceptions e
               JOIN class_schedules cs ON cs.id = e.class_schedule_id
               WHERE e.approval_status = 'approved'
                 AND e.exception_date = $1
                 AND e.exception_type IN ('cancelled', 'moved', 'exam')
                 AND cs.day_of_week = $2
                 AND cs.time_slot_id = $3"#,
        )
        .bind(date)
        .bind(day)
        .bind(time_slot_id)
        .fetch_all(db)
        .await?;

        Ok(rows)
    }

    /// Rooms occupied on `date` at `time_slot_id` by approved redirects
    /// (moves and exams landing there).
    async fn redirects_into(
        db: &PgPool,
        time_slot_id: TimeSlotId,
        date: NaiveDate,
    ) -> Result<Vec<RedirectRow>, AppError> {
        let rows = sqlx::query_as::<_, RedirectRow>(
            r#"SELECT e.moved_to_room_id, c.name AS class_name, t.name AS teacher_name
               FROM schedule_exceptions e
               JOIN classes c ON c.id = e.class_id
               JOIN teachers t ON t.id = c.teacher_id
               WHERE e.approval_status = 'approved'
                 AND e.moved_to_date = $1
                 AND e.moved_to_time_slot_id = $2
                 AND e.moved_to_room_id IS NOT NULL"#,
        )
        .bind(date)
        .bind(time_slot_id)
        .fetch_all(db)
        .await?;

        Ok(rows)
    }

    /// Partition candidate rooms into normal / freed-by-exception /
    /// occupied for one (day, period) and optional calendar date.
    #[instrument(skip(db))]
    pub async fn list_free_rooms(
        db: &PgPool,
        query: AvailableRoomsQuery,
    ) -> Result<AvailableRoomsResponse, AppError> {
        let day = Self::parse_day(query.day_of_week)?;

        let candidates = sqlx::query_as::<_, RoomCandidate>(
            r#"SELECT r.id, r.name, r.capacity, r.room_type_id, r.department_id, rt.is_lab
               FROM rooms r
               JOIN room_types rt ON rt.id = r.room_type_id
               WHERE r.is_available = TRUE
                 AND ($1::uuid IS NULL OR r.room_type_id = $1)
                 AND ($2::uuid IS NULL OR r.department_id IS NULL OR r.department_id = $2)
                 AND ($3::int IS NULL OR rt.is_lab OR r.capacity >= $3)
               ORDER BY r.name"#,
        )
        .bind(query.class_room_type_id)
        .bind(query.department_id)
        .bind(query.capacity)
        .fetch_all(db)
        .await?;

        let occupancies = Self::occupancies(db, day, query.time_slot_id).await?;

        let vacancies = match query.date {
            Some(date) => Self::vacancies_on(db, day, query.time_slot_id, date).await?,
            None => Vec::new(),
        };
        let redirects = match query.date {
            Some(date) => Self::redirects_into(db, query.time_slot_id, date).await?,
            None => Vec::new(),
        };

        let mut normal_rooms = Vec::new();
        let mut freed_rooms = Vec::new();
        let mut occupied_rooms = Vec::new();

        for room in candidates {
            if let Some(redirect) = redirects.iter().find(|r| r.moved_to_room_id == room.id) {
                occupied_rooms.push(OccupiedRoom {
                    room,
                    occupied_by_class: redirect.class_name.clone(),
                    occupied_by_teacher: redirect.teacher_name.clone(),
                });
                continue;
            }

            let occupancy = occupancies.iter().find(|o| o.room_id == room.id);
            match occupancy {
                None => normal_rooms.push(room),
                Some(occupancy) => {
                    let vacated = vacancies.iter().find(|v| {
                        v.class_schedule_id == occupancy.schedule_id
                            && exception_vacates(
                                v.exception_type,
                                v.exception_date,
                                query.time_slot_id,
                                v.original_room_id,
                                v.moved_to_date,
                                v.moved_to_time_slot_id,
                                v.moved_to_room_id,
                            )
                    });
                    match vacated {
                        Some(vacancy) => freed_rooms.push(FreedRoom {
                            room,
                            vacated_by_class: occupancy.class_name.clone(),
                            exception_type: vacancy.exception_type,
                        }),
                        None => occupied_rooms.push(OccupiedRoom {
                            room,
                            occupied_by_class: occupancy.class_name.clone(),
                            occupied_by_teacher: occupancy.teacher_name.clone(),
                        }),
                    }
                }
            }
        }

        let total_available = normal_rooms.len() + freed_rooms.len();

        Ok(AvailableRoomsResponse {
            normal_rooms,
            freed_rooms,
            occupied_rooms,
            total_available,
        })
    }

    /// Probe a single room at (day, period), optionally on a date.
    ///
    /// Without a date the check is purely structural (recurring
    /// assignments only); with a date the exception overlay applies:
    /// approved exceptions can both vacate the room and occupy it via a
    /// redirect.
    #[instrument(skip(db))]
    pub async fn is_room_free(
        db: &PgPool,
        room_id: RoomId,
        day_of_week: i16,
        time_slot_id: TimeSlotId,
        on_date: Option<NaiveDate>,
    ) -> Result<RoomFreeResponse, AppError> {
        let day = Self::parse_day(day_of_week)?;

        let is_available = sqlx::query_scalar::<_, bool>(
            "SELECT is_available FROM rooms WHERE id = $1",
        )
        .bind(room_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Room not found")))?;

        if !is_available {
            return Ok(RoomFreeResponse {
                free: false,
                freed_by_exception: false,
            });
        }

        if let Some(date) = on_date {
            let redirected = Self::redirects_into(db, time_slot_id, date)
                .await?
                .iter()
                .any(|r| r.moved_to_room_id == room_id);
            if redirected {
                return Ok(RoomFreeResponse {
                    free: false,
                    freed_by_exception: false,
                });
            }
        }

        let occupancies = Self::occupancies(db, day, time_slot_id).await?;
        let occupancy = occupancies.iter().find(|o| o.room_id == room_id);

        let Some(occupancy) = occupancy else {
            return Ok(RoomFreeResponse {
                free: true,
                freed_by_exception: false,
            });
        };

        if let Some(date) = on_date {
            let vacated = Self::vacancies_on(db, day, time_slot_id, date)
                .await?
                .iter()
                .any(|v| {
                    v.class_schedule_id == occupancy.schedule_id
                        && exception_vacates(
                            v.exception_type,
                            v.exception_date,
                            time_slot_id,
                            v.original_room_id,
                            v.moved_to_date,
                            v.moved_to_time_slot_id,
                            v.moved_to_room_id,
                        )
                });
            if vacated {
                return Ok(RoomFreeResponse {
                    free: true,
                    freed_by_exception: true,
                });
            }
        }

        Ok(RoomFreeResponse {
            free: false,
            freed_by_exception: false,
        })
    }
}

#[cfg(test)]
mod vacancy_tests {
    use super::*;

    fn ids() -> (TimeSlotId, TimeSlotId, RoomId, RoomId) {
        (
            TimeSlotId::from_u128(1),
            TimeSlotId::from_u128(2),
            RoomId::from_u128(10),
            RoomId::from_u128(11),
        )
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    #[test]
    fn cancellation_always_vacates() {
        let (slot, _, room, _) = ids();
        assert!(exception_vacates(
            ExceptionType::Cancelled,
            date(6),
            slot,
            Some(room),
            None,
            None,
            None,
        ));
    }

    #[test]
    fn move_to_other_date_vacates() {
        let (slot, _, room, _) = ids();
        assert!(exception_vacates(
            ExceptionType::Moved,
            date(6),
            slot,
            Some(room),
            Some(date(8)),
            None,
            None,
        ));
    }

    #[test]
    fn move_in_place_to_other_room_vacates_original() {
        let (slot, _, room, other_room) = ids();
        assert!(exception_vacates(
            ExceptionType::Moved,
            date(6),
            slot,
            Some(room),
            Some(date(6)),
            Some(slot),
            Some(other_room),
        ));
    }

    #[test]
    fn move_without_redirect_does_not_vacate() {
        let (slot, _, room, _) = ids();
        assert!(!exception_vacates(
            ExceptionType::Moved,
            date(6),
            slot,
            Some(room),
            None,
            None,
            None,
        ));
    }

    #[test]
    fn exam_in_same_room_does_not_vacate() {
        let (slot, _, room, _) = ids();
        assert!(!exception_vacates(
            ExceptionType::Exam,
            date(6),
            slot,
            Some(room),
            Some(date(6)),
            Some(slot),
            Some(room),
        ));
    }

    #[test]
    fn substitute_never_vacates() {
        let (slot, _, room, _) = ids();
        assert!(!exception_vacates(
            ExceptionType::Substitute,
            date(6),
            slot,
            Some(room),
            None,
            None,
            None,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        create_approved_exception, create_class, create_room, create_schedule, date, force_assign,
        mark_room_unavailable, seed_reference,
    };

    fn rooms_query(
        time_slot_id: TimeSlotId,
        day_of_week: i16,
        on_date: Option<NaiveDate>,
    ) -> AvailableRoomsQuery {
        AvailableRoomsQuery {
            time_slot_id,
            day_of_week,
            date: on_date,
            capacity: None,
            class_room_type_id: None,
            department_id: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unassigned_room_is_normal(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        create_room(&pool, "R101", 30, refs.room_type_id, None).await;

        let result =
            AvailabilityService::list_free_rooms(&pool, rooms_query(refs.period_1, 2, None))
                .await
                .unwrap();

        assert_eq!(result.normal_rooms.len(), 1);
        assert!(result.freed_rooms.is_empty());
        assert!(result.occupied_rooms.is_empty());
        assert_eq!(result.total_available, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn assigned_room_is_occupied(pool: PgPool) {
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
        force_assign(&pool, schedule, room).await;

        let result =
            AvailabilityService::list_free_rooms(&pool, rooms_query(refs.period_1, 2, None))
                .await
                .unwrap();

        assert!(result.normal_rooms.is_empty());
        assert_eq!(result.occupied_rooms.len(), 1);
        assert_eq!(result.occupied_rooms[0].occupied_by_class, "Algebra I");

        // Other day: free
        let result =
            AvailabilityService::list_free_rooms(&pool, rooms_query(refs.period_1, 3, None))
                .await
                .unwrap();
        assert_eq!(result.normal_rooms.len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn cancellation_frees_the_room_for_the_date(pool: PgPool) {
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
        force_assign(&pool, schedule, room).await;

        // 2025-10-06 is a Monday
        create_approved_exception(
            &pool,
            Some(schedule),
            class,
            date(2025, 10, 6),
            ExceptionType::Cancelled,
            None,
            None,
            None,
            None,
        )
        .await;

        let result = AvailabilityService::list_free_rooms(
            &pool,
            rooms_query(refs.period_1, 2, Some(date(2025, 10, 6))),
        )
        .await
        .unwrap();

        assert_eq!(result.freed_rooms.len(), 1);
        assert_eq!(result.freed_rooms[0].vacated_by_class, "Algebra I");
        assert_eq!(result.total_available, 1);

        // Without the date, the structural view still shows it occupied
        let result =
            AvailabilityService::list_free_rooms(&pool, rooms_query(refs.period_1, 2, None))
                .await
                .unwrap();
        assert_eq!(result.occupied_rooms.len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn redirect_occupies_target_room(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let target = create_room(&pool, "R202", 30, refs.room_type_id, None).await;
        let class = create_class(
            &pool,
            "Physics",
            &refs,
            refs.room_type_id,
            25,
            date(2025, 9, 1),
            date(2026, 1, 30),
        )
        .await;
        let schedule = create_schedule(&pool, class, DayOfWeek::Monday, refs.period_1).await;

        // Moved from Monday to Wednesday 2025-10-08 into R202, period 2
        create_approved_exception(
            &pool,
            Some(schedule),
            class,
            date(2025, 10, 6),
            ExceptionType::Moved,
            Some(date(2025, 10, 8)),
            Some(refs.period_2),
            Some(target),
            None,
        )
        .await;

        let result = AvailabilityService::list_free_rooms(
            &pool,
            rooms_query(refs.period_2, 4, Some(date(2025, 10, 8))),
        )
        .await
        .unwrap();

        assert_eq!(result.occupied_rooms.len(), 1);
        assert_eq!(result.occupied_rooms[0].occupied_by_class, "Physics");

        let free =
            AvailabilityService::is_room_free(&pool, target, 4, refs.period_2, Some(date(2025, 10, 8)))
                .await
                .unwrap();
        assert!(!free.free);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn capacity_filter_skipped_for_labs(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        create_room(&pool, "Small Lecture", 10, refs.room_type_id, None).await;
        create_room(&pool, "Small Lab", 10, refs.lab_type_id, None).await;

        let mut query = rooms_query(refs.period_1, 2, None);
        query.capacity = Some(20);
        let result = AvailabilityService::list_free_rooms(&pool, query).await.unwrap();

        assert_eq!(result.normal_rooms.len(), 1);
        assert_eq!(result.normal_rooms[0].name, "Small Lab");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn department_affinity_excludes_other_departments(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let other_dept: classrota_models::DepartmentId =
            sqlx::query_scalar("INSERT INTO departments (name) VALUES ('Other') RETURNING id")
                .fetch_one(&pool)
                .await
                .unwrap();
        create_room(&pool, "Shared", 30, refs.room_type_id, None).await;
        create_room(&pool, "Ours", 30, refs.room_type_id, Some(refs.department_id)).await;
        create_room(&pool, "Theirs", 30, refs.room_type_id, Some(other_dept)).await;

        let mut query = rooms_query(refs.period_1, 2, None);
        query.department_id = Some(refs.department_id);
        let result = AvailabilityService::list_free_rooms(&pool, query).await.unwrap();

        let names: Vec<_> = result.normal_rooms.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Ours", "Shared"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unavailable_room_is_excluded(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let room = create_room(&pool, "Closed", 30, refs.room_type_id, None).await;
        mark_room_unavailable(&pool, room).await;

        let result =
            AvailabilityService::list_free_rooms(&pool, rooms_query(refs.period_1, 2, None))
                .await
                .unwrap();
        assert!(result.normal_rooms.is_empty());

        let free = AvailabilityService::is_room_free(&pool, room, 2, refs.period_1, None)
            .await
            .unwrap();
        assert!(!free.free);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_room_is_not_found(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let missing = RoomId::new();
        let err = AvailabilityService::is_room_free(&pool, missing, 2, refs.period_1, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, classrota_core::ErrorCode::NotFound);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn invalid_day_is_rejected(pool: PgPool) {
        let refs = seed_reference(&pool).await;
        let err =
            AvailabilityService::list_free_rooms(&pool, rooms_query(refs.period_1, 9, None))
                .await
                .unwrap_err();
        assert_eq!(err.code, classrota_core::ErrorCode::Validation);
    }
}

use sqlx::PgPool;
use tracing::instrument;

use classrota_core::AppError;

use crate::events::{EventKind, EventPublisher};
use crate::metrics;
use crate::modules::stats::model::ScheduleStats;

#[derive(Debug, sqlx::FromRow)]
struct SlotCounts {
    total_slots: i64,
    assigned_slots: i64,
    pending_slots: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ClassCounts {
    total_classes: i64,
    assigned_classes: i64,
}

pub struct StatsService;

impl StatsService {
    /// Aggregate the current assignment state. Nothing here is cached;
    /// every call reads the live tables.
    #[instrument(skip(db, events))]
    pub async fn compute_stats(
        db: &PgPool,
        events: &EventPublisher,
    ) -> Result<ScheduleStats, AppError> {
        let slots = sqlx::query_as::<_, SlotCounts>(
            r#"SELECT COUNT(*) AS total_slots,
                      COUNT(*) FILTER (WHERE status = 'assigned') AS assigned_slots,
                      COUNT(*) FILTER (WHERE status = 'pending_assignment') AS pending_slots
               FROM class_schedules"#,
        )
        .fetch_one(db)
        .await?;

        // A class counts as assigned only when every one of its slots is.
        let classes = sqlx::query_as::<_, ClassCounts>(
            r#"SELECT COUNT(*) AS total_classes,
                      COUNT(*) FILTER (WHERE unassigned = 0 AND slot_count > 0) AS assigned_classes
               FROM (
                   SELECT c.id,
                          COUNT(cs.id) AS slot_count,
                          COUNT(cs.id) FILTER (WHERE cs.status <> 'assigned') AS unassigned
                   FROM classes c
                   LEFT JOIN class_schedules cs ON cs.class_id = c.id
                   GROUP BY c.id
               ) per_class"#,
        )
        .fetch_one(db)
        .await?;

        let assignment_rate = if slots.total_slots > 0 {
            slots.assigned_slots as f64 / slots.total_slots as f64
        } else {
            0.0
        };

        let stats = ScheduleStats {
            total_classes: classes.total_classes,
            pending_classes: classes.total_classes - classes.assigned_classes,
            assigned_classes: classes.assigned_classes,
            total_slots: slots.total_slots,
            pending_slots: slots.pending_slots,
            assigned_slots: slots.assigned_slots,
            assignment_rate,
        };

        metrics::set_schedule_gauges(stats.pending_slots, stats.assigned_slots, stats.assignment_rate);
        events.publish(EventKind::StatsUpdated, Vec::new(), &stats);

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classrota_models::{DayOfWeek, UserId};

    use crate::modules::assignments::service::AssignmentService;
    use crate::test_support::{create_class, create_room, create_schedule, date, seed_reference};

    #[sqlx::test(migrations = "./migrations")]
    async fn empty_schedule_has_zero_rate(pool: PgPool) {
        let events = EventPublisher::spawn();
        let stats = StatsService::compute_stats(&pool, &events).await.unwrap();
        assert_eq!(stats.total_slots, 0);
        assert_eq!(stats.assignment_rate, 0.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn counts_follow_assignments(pool: PgPool) {
        let events = EventPublisher::spawn();
        let refs = seed_reference(&pool).await;
        let r101 = create_room(&pool, "R101", 30, refs.room_type_id, None).await;
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
        create_schedule(&pool, class, DayOfWeek::Wednesday, refs.period_1).await;

        let stats = StatsService::compute_stats(&pool, &events).await.unwrap();
        assert_eq!(stats.total_classes, 1);
        assert_eq!(stats.pending_classes, 1);
        assert_eq!(stats.total_slots, 2);
        assert_eq!(stats.assigned_slots, 0);

        AssignmentService::assign_room(&pool, &events, slot_a, r101, UserId::new())
            .await
            .unwrap();

        let stats = StatsService::compute_stats(&pool, &events).await.unwrap();
        assert_eq!(stats.assigned_slots, 1);
        assert_eq!(stats.pending_slots, 1);
        assert_eq!(stats.assigned_classes, 0);
        assert!((stats.assignment_rate - 0.5).abs() < f64::EPSILON);
    }
}

use serde::Serialize;
use utoipa::ToSchema;

/// Snapshot of the assignment workflow's progress.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleStats {
    pub total_classes: i64,
    pub pending_classes: i64,
    pub assigned_classes: i64,
    pub total_slots: i64,
    pub pending_slots: i64,
    pub assigned_slots: i64,
    /// Assigned share of all slots, 0.0 when there are none.
    pub assignment_rate: f64,
}

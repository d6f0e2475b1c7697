//! Closed status and type enumerations.
//!
//! Every state that the original scheduling workflow encodes is a named
//! variant here, stored in Postgres as an enum type of the same name.
//! Display strings come from a single `label()` lookup per enum so call
//! sites cannot drift.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of a recurring schedule slot.
///
/// Invariant: a slot's `room_id` is non-null iff its status is
/// `Assigned`, `Active`, or `Exam` (enforced by a CHECK constraint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "schedule_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    PendingAssignment,
    Assigned,
    Active,
    Cancelled,
    Suspended,
    Exam,
}

impl ScheduleStatus {
    /// Statuses under which the slot's room counts as occupied for
    /// conflict checks.
    pub fn occupies_room(self) -> bool {
        matches!(self, ScheduleStatus::Assigned | ScheduleStatus::Active)
    }

    /// Statuses that require a room to be set.
    pub fn requires_room(self) -> bool {
        matches!(
            self,
            ScheduleStatus::Assigned | ScheduleStatus::Active | ScheduleStatus::Exam
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ScheduleStatus::PendingAssignment => "Pending assignment",
            ScheduleStatus::Assigned => "Assigned",
            ScheduleStatus::Active => "Active",
            ScheduleStatus::Cancelled => "Cancelled",
            ScheduleStatus::Suspended => "Suspended",
            ScheduleStatus::Exam => "Exam",
        }
    }
}

/// Kind of a schedule exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "exception_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExceptionType {
    Cancelled,
    Moved,
    Substitute,
    RoomChange,
    Exam,
}

impl ExceptionType {
    /// Whether an approved exception of this kind vacates the slot's
    /// original room on the exception date.
    pub fn vacates_original(self) -> bool {
        matches!(
            self,
            ExceptionType::Cancelled | ExceptionType::Moved | ExceptionType::Exam
        )
    }

    /// Whether this kind may carry a redirect target (date/slot/room).
    pub fn carries_redirect(self) -> bool {
        matches!(self, ExceptionType::Moved | ExceptionType::Exam)
    }

    pub fn label(self) -> &'static str {
        match self {
            ExceptionType::Cancelled => "Cancelled",
            ExceptionType::Moved => "Moved",
            ExceptionType::Substitute => "Substitute teacher",
            ExceptionType::RoomChange => "Room change",
            ExceptionType::Exam => "Exam",
        }
    }
}

/// Approval workflow state of a schedule exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "approval_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn label(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        }
    }
}

/// Derived class-level status: `Assigned` iff every slot of the class is
/// assigned. Never stored; recomputed from the slots on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClassStatus {
    Pending,
    Assigned,
}

impl ClassStatus {
    pub fn label(self) -> &'static str {
        match self {
            ClassStatus::Pending => "Pending",
            ClassStatus::Assigned => "Assigned",
        }
    }
}

/// Role of the caller viewing the schedule, supplied by the upstream
/// auth context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    Admin,
    Teacher,
    Student,
}

impl ViewerRole {
    pub fn label(self) -> &'static str {
        match self {
            ViewerRole::Admin => "Administrator",
            ViewerRole::Teacher => "Teacher",
            ViewerRole::Student => "Student",
        }
    }
}

impl std::str::FromStr for ViewerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(ViewerRole::Admin),
            "teacher" => Ok(ViewerRole::Teacher),
            "student" => Ok(ViewerRole::Student),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

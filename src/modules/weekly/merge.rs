//! The exception merge table.
//!
//! Several approved exceptions can target the same (slot, date)
//! occurrence. What the occurrence looks like in the weekly view is
//! decided here, by an ordered list of merge rules applied over the
//! exception set, producing one [`MergedEffect`] before any row
//! formatting happens:
//!
//! cancelled > room-change > substitute > moved/exam > none
//!
//! The first rule that matches the set decides how the original
//! day/period renders; a cross-date move additionally yields a redirect
//! that the resolver may materialize as a second row when it lands
//! inside the requested week.

use chrono::NaiveDate;

use classrota_models::{ExceptionType, RoomId, ScheduleStatus, TeacherId, TimeSlotId};

use crate::modules::weekly::model::OccurrenceException;

/// Named merge rules, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    Cancelled,
    RoomChange,
    Substitute,
    MovedOrExam,
}

pub const MERGE_PRIORITY: [MergeRule; 4] = [
    MergeRule::Cancelled,
    MergeRule::RoomChange,
    MergeRule::Substitute,
    MergeRule::MovedOrExam,
];

impl MergeRule {
    fn matches(self, exception: &OccurrenceException) -> bool {
        match self {
            MergeRule::Cancelled => exception.exception_type == ExceptionType::Cancelled,
            MergeRule::RoomChange => exception.exception_type == ExceptionType::RoomChange,
            MergeRule::Substitute => exception.exception_type == ExceptionType::Substitute,
            MergeRule::MovedOrExam => matches!(
                exception.exception_type,
                ExceptionType::Moved | ExceptionType::Exam
            ),
        }
    }
}

/// How the occurrence renders at its original day/period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OriginalDisplay {
    pub status_override: Option<ScheduleStatus>,
    pub room_override: Option<RoomId>,
    pub time_slot_override: Option<TimeSlotId>,
    pub substitute_teacher_id: Option<TeacherId>,
    /// The occurrence left this day/period for another date. The
    /// resolver shows the vacated row only while the redirect lands in
    /// the displayed week; a move out of the week suppresses it.
    pub vacated: bool,
    /// The exception kind that decided this display, if any.
    pub applied: Option<ExceptionType>,
}

/// A cross-date redirect of the occurrence (move or exam relocation).
#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    pub kind: ExceptionType,
    pub date: NaiveDate,
    /// `None` keeps the original period.
    pub time_slot_id: Option<TimeSlotId>,
    /// `None` keeps the original room.
    pub room_id: Option<RoomId>,
    /// Carried over from a coexisting substitute exception.
    pub substitute_teacher_id: Option<TeacherId>,
}

/// The merged outcome for one (slot, date) occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEffect {
    /// `None` suppresses the original-day row (occurrence moved away).
    pub original: Option<OriginalDisplay>,
    pub redirect: Option<Redirect>,
}

impl MergedEffect {
    fn unchanged() -> Self {
        Self {
            original: Some(OriginalDisplay::default()),
            redirect: None,
        }
    }
}

/// Apply the merge table to the approved exceptions of one occurrence.
pub fn merge_exceptions(exceptions: &[OccurrenceException]) -> MergedEffect {
    let winner = MERGE_PRIORITY
        .iter()
        .find_map(|rule| exceptions.iter().find(|e| rule.matches(e)).map(|e| (*rule, e)));

    let Some((rule, exception)) = winner else {
        return MergedEffect::unchanged();
    };

    // A substitute present anywhere in the set travels with the
    // occurrence even when it loses the display precedence.
    let substitute = exceptions
        .iter()
        .find(|e| e.exception_type == ExceptionType::Substitute)
        .and_then(|e| e.substitute_teacher_id);

    // The redirect is decided independently of the display winner: any
    // moved/exam exception with a cross-date target surfaces the
    // occurrence there, unless a cancellation governs the set.
    let redirect = if rule == MergeRule::Cancelled {
        None
    } else {
        exceptions
            .iter()
            .find(|e| MergeRule::MovedOrExam.matches(e))
            .and_then(|moved| {
                moved
                    .moved_to_date
                    .filter(|d| *d != moved.exception_date)
                    .map(|date| Redirect {
                        kind: moved.exception_type,
                        date,
                        time_slot_id: moved.moved_to_time_slot_id,
                        room_id: moved.moved_to_room_id,
                        substitute_teacher_id: substitute.or(moved.substitute_teacher_id),
                    })
            })
    };

    let original = match rule {
        MergeRule::Cancelled => Some(OriginalDisplay {
            status_override: Some(ScheduleStatus::Suspended),
            applied: Some(ExceptionType::Cancelled),
            ..Default::default()
        }),
        MergeRule::RoomChange => Some(OriginalDisplay {
            room_override: exception.moved_to_room_id,
            applied: Some(ExceptionType::RoomChange),
            ..Default::default()
        }),
        MergeRule::Substitute => Some(OriginalDisplay {
            substitute_teacher_id: exception.substitute_teacher_id,
            applied: Some(ExceptionType::Substitute),
            ..Default::default()
        }),
        MergeRule::MovedOrExam => {
            let status_override = (exception.exception_type == ExceptionType::Exam)
                .then_some(ScheduleStatus::Exam);

            let moved_in_place = exception
                .moved_to_date
                .is_none_or(|d| d == exception.exception_date);

            let no_redirect = exception.moved_to_date.is_none()
                && exception.moved_to_time_slot_id.is_none()
                && exception.moved_to_room_id.is_none();

            if no_redirect {
                // Occurrence stays where it is (exam in the regular room).
                Some(OriginalDisplay {
                    status_override,
                    applied: Some(exception.exception_type),
                    ..Default::default()
                })
            } else if moved_in_place {
                // Same-day redirect: one row, the updated original.
                Some(OriginalDisplay {
                    status_override,
                    room_override: exception.moved_to_room_id,
                    time_slot_override: exception.moved_to_time_slot_id,
                    substitute_teacher_id: substitute,
                    applied: Some(exception.exception_type),
                    ..Default::default()
                })
            } else {
                // Cross-date move: the original day/period is vacated;
                // the redirect above carries the occurrence.
                Some(OriginalDisplay {
                    status_override,
                    vacated: true,
                    applied: Some(exception.exception_type),
                    ..Default::default()
                })
            }
        }
    };

    MergedEffect { original, redirect }
}

//! # Classrota Models
//!
//! Domain value types for the classrota API.
//!
//! - [`ids`]: strongly-typed UUID newtypes for every entity
//! - [`status`]: closed status/type enumerations with display labels
//! - [`week`]: day-of-week and week-pattern value types and week math

pub mod ids;
pub mod status;
pub mod week;

pub use ids::{
    ClassId, DepartmentId, ExceptionId, RoomId, RoomTypeId, ScheduleId, TeacherId, TimeSlotId,
    UserId,
};
pub use status::{ApprovalStatus, ClassStatus, ExceptionType, ScheduleStatus, ViewerRole};
pub use week::{DayOfWeek, WeekPattern};

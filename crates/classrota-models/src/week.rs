//! Day-of-week and week-pattern value types, plus the week math used by
//! the resolver.
//!
//! Days are numbered 1..7 with 1 = Sunday, matching the stored
//! `smallint` column. Week indices are counted from the Sunday-based
//! calendar week containing a class's start date (week 1).

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Day of the week, 1 = Sunday ... 7 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[repr(i16)]
pub enum DayOfWeek {
    Sunday = 1,
    Monday = 2,
    Tuesday = 3,
    Wednesday = 4,
    Thursday = 5,
    Friday = 6,
    Saturday = 7,
}

impl DayOfWeek {
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(DayOfWeek::Sunday),
            2 => Some(DayOfWeek::Monday),
            3 => Some(DayOfWeek::Tuesday),
            4 => Some(DayOfWeek::Wednesday),
            5 => Some(DayOfWeek::Thursday),
            6 => Some(DayOfWeek::Friday),
            7 => Some(DayOfWeek::Saturday),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Sun => DayOfWeek::Sunday,
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
        }
    }

    /// The calendar date this day falls on within the week starting at
    /// `week_start` (a Sunday).
    pub fn date_in_week(self, week_start: NaiveDate) -> NaiveDate {
        week_start + Days::new(self.as_i16() as u64 - 1)
    }

    pub fn label(self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "Sunday",
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
        }
    }
}

// On the wire a day is its 1..7 number, not a variant name.
impl Serialize for DayOfWeek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.as_i16())
    }
}

impl<'de> Deserialize<'de> for DayOfWeek {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i16::deserialize(deserializer)?;
        DayOfWeek::from_i16(value).ok_or_else(|| {
            serde::de::Error::custom(format!("day of week must be 1..7, got {value}"))
        })
    }
}

/// Recurrence parity of a slot within the semester.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    utoipa::ToSchema,
)]
#[sqlx(type_name = "week_pattern", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WeekPattern {
    Every,
    Odd,
    Even,
}

impl WeekPattern {
    /// Whether a 1-indexed semester week matches this pattern.
    pub fn includes(self, week_index: i32) -> bool {
        match self {
            WeekPattern::Every => true,
            WeekPattern::Odd => week_index % 2 == 1,
            WeekPattern::Even => week_index % 2 == 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WeekPattern::Every => "Every week",
            WeekPattern::Odd => "Odd weeks",
            WeekPattern::Even => "Even weeks",
        }
    }
}

/// The Sunday starting the calendar week that contains `date`.
pub fn sunday_of(date: NaiveDate) -> NaiveDate {
    date - Days::new(date.weekday().num_days_from_sunday() as u64)
}

/// 1-indexed week number of the week starting at `week_start`, counted
/// from the week containing `class_start`. May be zero or negative for
/// weeks before the class starts.
pub fn week_index_for(class_start: NaiveDate, week_start: NaiveDate) -> i32 {
    let days = (week_start - sunday_of(class_start)).num_days();
    (days.div_euclid(7) + 1) as i32
}

//! Schedule definitions.
//!
//! A schedule is a recurrence description that produces Start/End (or a
//! single Once) lifecycle event for every topic attached to it.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::resource::ResourceAttachment;

/// Recurrence kind of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleType {
    Daily,
    Weekly,
    Monthly,
    DateWise,
    Custom,
    Yearly,
}

impl ScheduleType {
    pub const ALL: [ScheduleType; 6] = [
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::DateWise,
        Self::Custom,
        Self::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::DateWise => "DateWise",
            Self::Custom => "Custom",
            Self::Yearly => "Yearly",
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refinement of a schedule type. Its meaning depends on the type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleSubType {
    #[default]
    Once,
    Every,
    SelectedDays,
    Weekdays,
    Weekenddays,
}

impl fmt::Display for ScheduleSubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Once => "Once",
            Self::Every => "Every",
            Self::SelectedDays => "SelectedDays",
            Self::Weekdays => "Weekdays",
            Self::Weekenddays => "Weekenddays",
        };
        f.write_str(s)
    }
}

/// Enabled state stored on the schedule itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleStatus {
    #[default]
    Enabled,
    Disabled,
}

/// Day of week. Ordered Sunday first, matching cron numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

impl Day {
    /// Three-letter name used in cron day-of-week fields.
    pub fn cron_name(&self) -> &'static str {
        match self {
            Self::Sunday => "SUN",
            Self::Monday => "MON",
            Self::Tuesday => "TUE",
            Self::Wednesday => "WED",
            Self::Thursday => "THU",
            Self::Friday => "FRI",
            Self::Saturday => "SAT",
        }
    }

    pub fn number(&self) -> u8 {
        *self as u8
    }
}

impl From<Weekday> for Day {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Sun => Self::Sunday,
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
        }
    }
}

/// A schedule definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,

    pub name: String,

    pub schedule_type: ScheduleType,

    #[serde(default)]
    pub sub_type: ScheduleSubType,

    pub start_date_time: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date_time: Option<DateTime<Utc>>,

    /// Days used when `sub_type` is `SelectedDays`.
    #[serde(default)]
    pub start_days: Vec<Day>,

    #[serde(default)]
    pub status: ScheduleStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Raw 6-field cron expression, honored by `Custom` schedules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
}

impl Schedule {
    pub fn new(
        name: impl Into<String>,
        schedule_type: ScheduleType,
        start_date_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            schedule_type,
            sub_type: ScheduleSubType::Once,
            start_date_time,
            end_date_time: None,
            start_days: Vec::new(),
            status: ScheduleStatus::Enabled,
            details: None,
            cron_expression: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_sub_type(mut self, sub_type: ScheduleSubType) -> Self {
        self.sub_type = sub_type;
        self
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end_date_time = Some(end);
        self
    }

    pub fn with_days(mut self, days: Vec<Day>) -> Self {
        self.start_days = days;
        self
    }

    pub fn with_status(mut self, status: ScheduleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_cron(mut self, expression: impl Into<String>) -> Self {
        self.cron_expression = Some(expression.into());
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.status == ScheduleStatus::Enabled
    }
}

/// A schedule joined with its current resource attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDetail {
    pub schedule: Schedule,
    pub attached_resources: Vec<ResourceAttachment>,
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;

//! Cron expression builders.
//!
//! Every builder emits the 6-field format
//! `second minute hour day-of-month month day-of-week` and checks the result
//! against the `cron` crate before returning it. Day-of-week fields use
//! names (`MON`, `SUN`) so the output does not depend on numeric dialect.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Timelike};
use cron::Schedule;

use topicron_protocols::{Day, SchedulingError};

/// Parse an expression, reporting why it is unschedulable.
pub fn parse(expression: &str) -> Result<Schedule, SchedulingError> {
    Schedule::from_str(expression).map_err(|e| SchedulingError::Cron {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

/// Every day at `time`.
pub fn daily(time: NaiveTime) -> Result<String, SchedulingError> {
    checked(format!("0 {} {} * * *", time.minute(), time.hour()))
}

/// Monday through Friday at `time`.
pub fn week_days(time: NaiveTime) -> Result<String, SchedulingError> {
    checked(format!("0 {} {} * * MON-FRI", time.minute(), time.hour()))
}

/// Sunday and Saturday at `time`.
pub fn weekend_days(time: NaiveTime) -> Result<String, SchedulingError> {
    checked(format!("0 {} {} * * SUN,SAT", time.minute(), time.hour()))
}

/// The given days at `time`. Days are deduplicated and sorted Sunday first.
pub fn selected_days(time: NaiveTime, days: &[Day]) -> Result<String, SchedulingError> {
    if days.is_empty() {
        return Err(SchedulingError::Validation(
            "selected days cannot be empty".to_string(),
        ));
    }

    let days: BTreeSet<Day> = days.iter().copied().collect();
    let field = days
        .iter()
        .map(Day::cron_name)
        .collect::<Vec<_>>()
        .join(",");
    checked(format!("0 {} {} * * {}", time.minute(), time.hour(), field))
}

/// Day `day_of_month` of every month at `time`.
pub fn monthly(day_of_month: u32, time: NaiveTime) -> Result<String, SchedulingError> {
    if !(1..=31).contains(&day_of_month) {
        return Err(SchedulingError::Validation(format!(
            "day of month out of range: {}",
            day_of_month
        )));
    }
    checked(format!(
        "0 {} {} {} * *",
        time.minute(),
        time.hour(),
        day_of_month
    ))
}

/// `month`/`day` of every year at `time`.
pub fn yearly(month: u32, day: u32, time: NaiveTime) -> Result<String, SchedulingError> {
    // 2024 is a leap year, so Feb 29 is accepted.
    if NaiveDate::from_ymd_opt(2024, month, day).is_none() {
        return Err(SchedulingError::Validation(format!(
            "no such calendar day: {}/{}",
            month, day
        )));
    }
    checked(format!(
        "0 {} {} {} {} *",
        time.minute(),
        time.hour(),
        day,
        month
    ))
}

fn checked(expression: String) -> Result<String, SchedulingError> {
    parse(&expression)?;
    Ok(expression)
}

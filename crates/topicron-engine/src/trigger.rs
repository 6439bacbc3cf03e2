//! Trigger fire-time computation.
//!
//! Misfire policy is "do nothing": a fire that is overdue by more than
//! [`MISFIRE_THRESHOLD_SECS`] is skipped and the trigger moves on to its next
//! future occurrence. A skipped one-shot trigger completes without firing.

use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use cron::Schedule;

use topicron_protocols::{EngineError, TriggerInfo, TriggerSpec, TriggerState};

/// How late a fire may be and still run.
pub const MISFIRE_THRESHOLD_SECS: i64 = 60;

fn misfire_threshold() -> Duration {
    Duration::seconds(MISFIRE_THRESHOLD_SECS)
}

/// Check that a trigger spec can produce fire times.
pub fn validate(spec: &TriggerSpec) -> Result<(), EngineError> {
    match spec {
        TriggerSpec::Once { .. } => Ok(()),
        TriggerSpec::Daily { hour, minute } => daily_time(*hour, *minute).map(|_| ()),
        TriggerSpec::Cron { expression } => parse_cron(expression).map(|_| ()),
    }
}

/// Next fire strictly after `after`.
pub fn next_fire_after(
    spec: &TriggerSpec,
    after: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, EngineError> {
    match spec {
        TriggerSpec::Once { at } => Ok((*at > after).then_some(*at)),
        TriggerSpec::Daily { hour, minute } => {
            let time = daily_time(*hour, *minute)?;
            let today = after.date_naive().and_time(time).and_utc();
            if today > after {
                Ok(Some(today))
            } else {
                Ok(Some(today + Duration::days(1)))
            }
        }
        TriggerSpec::Cron { expression } => Ok(parse_cron(expression)?.after(&after).next()),
    }
}

/// First fire time for a freshly registered trigger.
///
/// A one-shot time slightly in the past still fires if it is within the
/// misfire threshold.
pub fn first_fire(
    spec: &TriggerSpec,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, EngineError> {
    match spec {
        TriggerSpec::Once { at } => Ok((*at + misfire_threshold() >= now).then_some(*at)),
        _ => next_fire_after(spec, now),
    }
}

/// Result of processing a due trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    /// Whether the due fire should run (false when it misfired).
    pub fire: bool,
    pub next_fire: Option<DateTime<Utc>>,
}

impl Advance {
    pub fn state(&self) -> TriggerState {
        if self.next_fire.is_some() {
            TriggerState::Normal
        } else {
            TriggerState::Complete
        }
    }
}

/// Process a trigger whose fire time `scheduled_for` is at or before `now`.
pub fn advance(
    spec: &TriggerSpec,
    scheduled_for: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Advance, EngineError> {
    let fire = now - scheduled_for <= misfire_threshold();
    let next_fire = next_fire_after(spec, now)?;
    Ok(Advance { fire, next_fire })
}

/// Re-apply the misfire policy to a trigger leaving the paused state.
pub fn resume(info: &mut TriggerInfo, now: DateTime<Utc>) -> Result<(), EngineError> {
    match info.next_fire {
        Some(next) if next + misfire_threshold() < now => {
            info.next_fire = next_fire_after(&info.spec, now)?;
        }
        _ => {}
    }
    info.state = if info.next_fire.is_some() {
        TriggerState::Normal
    } else {
        TriggerState::Complete
    };
    Ok(())
}

fn daily_time(hour: u32, minute: u32) -> Result<NaiveTime, EngineError> {
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| EngineError::InvalidTrigger(format!("invalid time {}:{}", hour, minute)))
}

fn parse_cron(expression: &str) -> Result<Schedule, EngineError> {
    Schedule::from_str(expression)
        .map_err(|e| EngineError::InvalidTrigger(format!("{}: {}", expression, e)))
}

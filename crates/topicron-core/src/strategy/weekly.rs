use async_trait::async_trait;

use topicron_protocols::{Schedule, ScheduleSubType, ScheduleType, SchedulingError};

use super::{not_implemented, start_and_end, PlannedEvent, Recurrence, ScheduleJobStrategy};

/// Fires on weekdays, weekend days or an explicit set of days.
pub struct WeeklyStrategy;

#[async_trait]
impl ScheduleJobStrategy for WeeklyStrategy {
    fn schedule_type(&self) -> ScheduleType {
        ScheduleType::Weekly
    }

    fn description(&self) -> &'static str {
        "Executes on specific days of the week"
    }

    fn plan(&self, schedule: &Schedule) -> Result<Vec<PlannedEvent>, SchedulingError> {
        match schedule.sub_type {
            ScheduleSubType::Weekdays => {
                start_and_end(schedule, |at| Ok(Recurrence::WeekDays(at.time())))
            }
            ScheduleSubType::Weekenddays => {
                start_and_end(schedule, |at| Ok(Recurrence::WeekendDays(at.time())))
            }
            ScheduleSubType::SelectedDays => start_and_end(schedule, |at| {
                Ok(Recurrence::SelectedDays(
                    at.time(),
                    schedule.start_days.clone(),
                ))
            }),
            ScheduleSubType::Every => Err(not_implemented(schedule)),
            other => Err(SchedulingError::Validation(format!(
                "Unsupported weekly sub-type: {}",
                other
            ))),
        }
    }
}

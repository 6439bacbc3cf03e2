use async_trait::async_trait;
use chrono::Datelike;

use topicron_protocols::{Schedule, ScheduleSubType, ScheduleType, SchedulingError};

use super::{not_implemented, start_and_end, PlannedEvent, Recurrence, ScheduleJobStrategy};

/// Fires every month. Each event keeps the day of month of its own timestamp.
pub struct MonthlyStrategy;

#[async_trait]
impl ScheduleJobStrategy for MonthlyStrategy {
    fn schedule_type(&self) -> ScheduleType {
        ScheduleType::Monthly
    }

    fn description(&self) -> &'static str {
        "Executes monthly on a specific day"
    }

    fn plan(&self, schedule: &Schedule) -> Result<Vec<PlannedEvent>, SchedulingError> {
        if schedule.sub_type == ScheduleSubType::Every {
            return Err(not_implemented(schedule));
        }
        start_and_end(schedule, |at| {
            Ok(Recurrence::Monthly {
                day: at.day(),
                time: at.time(),
            })
        })
    }
}

use async_trait::async_trait;
use chrono::Datelike;

use topicron_engine::cron;
use topicron_protocols::{Schedule, ScheduleType, SchedulingError};

use super::{start_and_end, PlannedEvent, Recurrence, ScheduleJobStrategy};

/// Fires once a year on the month and day of each event.
pub struct YearlyStrategy;

#[async_trait]
impl ScheduleJobStrategy for YearlyStrategy {
    fn schedule_type(&self) -> ScheduleType {
        ScheduleType::Yearly
    }

    fn description(&self) -> &'static str {
        "Executes annually on a specific date"
    }

    fn plan(&self, schedule: &Schedule) -> Result<Vec<PlannedEvent>, SchedulingError> {
        start_and_end(schedule, |at| {
            Ok(Recurrence::Cron(cron::yearly(at.month(), at.day(), at.time())?))
        })
    }
}

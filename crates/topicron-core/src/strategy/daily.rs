use async_trait::async_trait;

use topicron_protocols::{Schedule, ScheduleSubType, ScheduleType, SchedulingError};

use super::{not_implemented, start_and_end, PlannedEvent, Recurrence, ScheduleJobStrategy};

/// Fires at the schedule's time of day, every day.
pub struct DailyStrategy;

#[async_trait]
impl ScheduleJobStrategy for DailyStrategy {
    fn schedule_type(&self) -> ScheduleType {
        ScheduleType::Daily
    }

    fn description(&self) -> &'static str {
        "Executes daily at a fixed time"
    }

    fn plan(&self, schedule: &Schedule) -> Result<Vec<PlannedEvent>, SchedulingError> {
        if schedule.sub_type == ScheduleSubType::Every {
            return Err(not_implemented(schedule));
        }
        start_and_end(schedule, |at| Ok(Recurrence::Daily(at.time())))
    }
}

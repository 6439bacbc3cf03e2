use async_trait::async_trait;

use topicron_protocols::{Schedule, ScheduleEventType, ScheduleType, SchedulingError};

use super::{PlannedEvent, Recurrence, ScheduleJobStrategy};

/// Fires once at the schedule's absolute start (and end) instants.
pub struct DateWiseStrategy;

#[async_trait]
impl ScheduleJobStrategy for DateWiseStrategy {
    fn schedule_type(&self) -> ScheduleType {
        ScheduleType::DateWise
    }

    fn description(&self) -> &'static str {
        "Executes once on specific dates"
    }

    fn plan(&self, schedule: &Schedule) -> Result<Vec<PlannedEvent>, SchedulingError> {
        let start = schedule.start_date_time;
        Ok(match schedule.end_date_time {
            None => vec![PlannedEvent::new(
                ScheduleEventType::Once,
                Recurrence::Once(start),
            )],
            Some(end) => vec![
                PlannedEvent::new(ScheduleEventType::Start, Recurrence::DateWise(start)),
                PlannedEvent::new(ScheduleEventType::End, Recurrence::DateWise(end)),
            ],
        })
    }
}

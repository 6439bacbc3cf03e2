use async_trait::async_trait;

use topicron_engine::cron;
use topicron_protocols::{Schedule, ScheduleEventType, ScheduleType, SchedulingError};

use super::{PlannedEvent, Recurrence, ScheduleJobStrategy};

/// Fires on the schedule's own cron expression.
///
/// Without an explicit expression, start and end each fire daily at their
/// time of day. With one, it drives the start (or once) event and the end
/// event, if any, still fires daily at the end time.
pub struct CustomStrategy;

#[async_trait]
impl ScheduleJobStrategy for CustomStrategy {
    fn schedule_type(&self) -> ScheduleType {
        ScheduleType::Custom
    }

    fn description(&self) -> &'static str {
        "Executes on a custom cron expression"
    }

    fn plan(&self, schedule: &Schedule) -> Result<Vec<PlannedEvent>, SchedulingError> {
        let explicit = schedule
            .cron_expression
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());

        let start_cron = match explicit {
            Some(expression) => {
                cron::parse(expression)?;
                expression.to_string()
            }
            None => cron::daily(schedule.start_date_time.time())?,
        };

        let Some(end) = schedule.end_date_time else {
            return Ok(vec![PlannedEvent::new(
                ScheduleEventType::Once,
                Recurrence::Cron(start_cron),
            )]);
        };

        let end_cron = cron::daily(end.time())?;
        let mut plan = vec![PlannedEvent::new(
            ScheduleEventType::Start,
            Recurrence::Cron(start_cron.clone()),
        )];
        if end_cron != start_cron {
            plan.push(PlannedEvent::new(
                ScheduleEventType::End,
                Recurrence::Cron(end_cron),
            ));
        }
        Ok(plan)
    }
}

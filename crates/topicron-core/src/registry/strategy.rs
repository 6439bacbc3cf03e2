//! Schedule type to strategy resolution.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use topicron_protocols::{ScheduleType, SchedulingError};

use crate::strategy::{
    CustomStrategy, DailyStrategy, DateWiseStrategy, MonthlyStrategy, ScheduleJobStrategy,
    WeeklyStrategy, YearlyStrategy,
};

/// Fixed table of strategies, built once at startup.
pub struct StrategyRegistry {
    ordered: Vec<Arc<dyn ScheduleJobStrategy>>,
    by_type: HashMap<ScheduleType, Arc<dyn ScheduleJobStrategy>>,
}

impl StrategyRegistry {
    /// Build from an explicit list. A later entry for the same type wins the
    /// exact lookup; fallback scans keep registration order.
    pub fn new(strategies: Vec<Arc<dyn ScheduleJobStrategy>>) -> Self {
        let by_type = strategies
            .iter()
            .map(|s| (s.schedule_type(), s.clone()))
            .collect();
        Self {
            ordered: strategies,
            by_type,
        }
    }

    /// One strategy per schedule type.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Arc::new(DailyStrategy),
            Arc::new(WeeklyStrategy),
            Arc::new(MonthlyStrategy),
            Arc::new(DateWiseStrategy),
            Arc::new(CustomStrategy),
            Arc::new(YearlyStrategy),
        ])
    }

    pub fn get_strategy(
        &self,
        schedule_type: ScheduleType,
    ) -> Result<Arc<dyn ScheduleJobStrategy>, SchedulingError> {
        if let Some(strategy) = self.by_type.get(&schedule_type) {
            return Ok(strategy.clone());
        }

        if let Some(strategy) = self.ordered.iter().find(|s| s.can_handle(schedule_type)) {
            warn!(
                %schedule_type,
                fallback = %strategy.schedule_type(),
                "No exact strategy, using fallback"
            );
            return Ok(strategy.clone());
        }

        Err(SchedulingError::NoStrategy {
            schedule_type: schedule_type.to_string(),
            available: self.available(),
        })
    }

    /// Registered schedule types, in registration order.
    pub fn available(&self) -> Vec<String> {
        self.ordered
            .iter()
            .map(|s| s.schedule_type().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

//! Engine runner that polls for due jobs and hands them to an executor.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use topicron_protocols::{EngineError, FiredJob, JobEngine, JobExecutor};

/// Polls a [`JobEngine`] and runs each due job on its own task.
pub struct EngineRunner {
    engine: Arc<dyn JobEngine>,
    executor: Arc<dyn JobExecutor>,
    tick_interval: Duration,
}

impl EngineRunner {
    pub fn new(engine: Arc<dyn JobEngine>, executor: Arc<dyn JobExecutor>) -> Self {
        Self {
            engine,
            executor,
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Set the poll interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Start the runner loop. Runs until the shutdown channel changes, then
    /// waits for in-flight jobs to finish.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        info!(
            engine = self.engine.name(),
            "Engine runner started (tick interval: {:?})",
            self.tick_interval
        );

        let mut interval = time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = shutdown;
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.dispatch_due(&mut tasks).await {
                        Ok(0) => {}
                        Ok(n) => debug!("Dispatched {} due job(s)", n),
                        Err(e) => error!("Engine poll failed: {}", e),
                    }
                    while let Some(result) = tasks.try_join_next() {
                        if let Err(e) = result {
                            error!("Job task failed: {}", e);
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("Engine runner shutting down");
                    break;
                }
            }
        }

        if !tasks.is_empty() {
            info!("Waiting for {} in-flight job(s)", tasks.len());
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!("Job task failed: {}", e);
            }
        }
    }

    /// Poll once and run every due job to completion.
    pub async fn tick(&self) -> Result<usize, EngineError> {
        let due = self.engine.acquire_due(Utc::now()).await?;
        let n = due.len();
        for job in due {
            run_job(self.engine.clone(), self.executor.clone(), job).await;
        }
        Ok(n)
    }

    async fn dispatch_due(&self, tasks: &mut JoinSet<()>) -> Result<usize, EngineError> {
        let due = self.engine.acquire_due(Utc::now()).await?;
        let n = due.len();
        for job in due {
            tasks.spawn(run_job(self.engine.clone(), self.executor.clone(), job));
        }
        Ok(n)
    }
}

async fn run_job(engine: Arc<dyn JobEngine>, executor: Arc<dyn JobExecutor>, job: FiredJob) {
    let key = job.job_key.clone();
    executor.execute(job).await;
    if let Err(e) = engine.complete(&key).await {
        error!(job_key = %key, "Failed to mark job complete: {}", e);
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;

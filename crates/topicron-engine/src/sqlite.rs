//! SQLite-backed job engine.
//!
//! Trigger state is written through on every change, so registered jobs
//! survive a restart. A job that was acquired but never completed is
//! re-delivered once, flagged as recovering, on the next start.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::params;
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{info, warn};

use topicron_protocols::{
    EngineError, FiredJob, JobData, JobDetail, JobEngine, JobKey, TriggerInfo, TriggerSpec,
    TriggerState,
};

use crate::schema::init_schema;
use crate::trigger;

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;

/// Durable job engine on SQLite.
pub struct SqliteEngine {
    conn: Connection,
    recovered: Mutex<Vec<FiredJob>>,
}

impl SqliteEngine {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, EngineError> {
        let conn = Connection::open_in_memory().await.map_err(storage)?;
        Self::init(conn).await
    }

    /// Open (or create) a file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(path).await.map_err(storage)?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, EngineError> {
        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(storage)?;

        let recovered = Self::load_interrupted(&conn).await?;
        if !recovered.is_empty() {
            info!("Recovering {} interrupted job(s)", recovered.len());
        }

        Ok(Self {
            conn,
            recovered: Mutex::new(recovered),
        })
    }

    /// Collect jobs left in flight by a previous process.
    async fn load_interrupted(conn: &Connection) -> Result<Vec<FiredJob>, EngineError> {
        let rows = conn
            .call(|conn| {
                let tx = conn.transaction()?;
                let rows = {
                    let mut stmt = tx.prepare(
                        "SELECT job_key, job_data, scheduled_for FROM engine_jobs
                         WHERE in_flight = 1 AND request_recovery = 1",
                    )?;
                    stmt.query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?
                };
                tx.execute(
                    "UPDATE engine_jobs SET in_flight = 0
                     WHERE in_flight = 1 AND request_recovery = 0",
                    [],
                )?;
                tx.commit()?;
                Ok(rows)
            })
            .await
            .map_err(storage)?;

        let mut jobs = Vec::with_capacity(rows.len());
        for (key, data, scheduled_for) in rows {
            let data: JobData = match serde_json::from_str(&data) {
                Ok(data) => data,
                Err(e) => {
                    warn!(job_key = %key, "Dropping unreadable job data: {}", e);
                    continue;
                }
            };
            let scheduled_for = match scheduled_for.as_deref().map(parse_ts) {
                Some(Ok(at)) => at,
                _ => Utc::now(),
            };
            jobs.push(FiredJob {
                job_key: JobKey::from_raw(key),
                data,
                scheduled_for,
                recovering: true,
            });
        }
        Ok(jobs)
    }
}

#[async_trait]
impl JobEngine for SqliteEngine {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn add_job(
        &self,
        job: JobDetail,
        spec: TriggerSpec,
    ) -> Result<TriggerInfo, EngineError> {
        trigger::validate(&spec)?;
        let next_fire = trigger::first_fire(&spec, Utc::now())?;
        let state = if next_fire.is_some() {
            TriggerState::Normal
        } else {
            TriggerState::Complete
        };

        let info = TriggerInfo {
            key: job.key.trigger_key(),
            job_key: job.key.clone(),
            spec: spec.clone(),
            state,
            next_fire,
        };

        let job_key = job.key.to_string();
        let trigger_key = info.key.to_string();
        let data = serde_json::to_string(&job.data).map_err(serialization)?;
        let spec = serde_json::to_string(&spec).map_err(serialization)?;
        let next_fire = next_fire.map(ts);
        let created = ts(Utc::now());
        let (durable, request_recovery) = (job.durable, job.request_recovery);
        let store = durable || state != TriggerState::Complete;

        let accepted = self
            .conn
            .call(move |conn| {
                if !store {
                    // A non-durable job that never fires is not kept.
                    let exists: bool = conn.query_row(
                        "SELECT EXISTS(SELECT 1 FROM engine_jobs WHERE job_key = ?1)",
                        [&job_key],
                        |row| row.get(0),
                    )?;
                    return Ok(!exists);
                }
                let n = conn.execute(
                    "INSERT OR IGNORE INTO engine_jobs
                     (job_key, job_data, durable, request_recovery, trigger_key,
                      trigger_spec, trigger_state, next_fire, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        job_key,
                        data,
                        durable,
                        request_recovery,
                        trigger_key,
                        spec,
                        state.as_str(),
                        next_fire,
                        created
                    ],
                )?;
                Ok(n > 0)
            })
            .await
            .map_err(storage)?;

        if !accepted {
            return Err(EngineError::JobExists(job.key.to_string()));
        }
        Ok(info)
    }

    async fn delete_job(&self, key: &JobKey) -> Result<bool, EngineError> {
        let key = key.to_string();
        let n = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM engine_jobs WHERE job_key = ?1", [&key])?))
            .await
            .map_err(storage)?;
        Ok(n > 0)
    }

    async fn pause_job(&self, key: &JobKey) -> Result<(), EngineError> {
        let raw = key.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE engine_jobs SET trigger_state = 'paused'
                     WHERE job_key = ?1 AND trigger_state = 'normal'",
                    [&raw],
                )?;
                let mut stmt = conn.prepare("SELECT 1 FROM engine_jobs WHERE job_key = ?1")?;
                Ok(stmt.exists([&raw])?)
            })
            .await
            .map_err(storage)?;

        if !exists {
            return Err(EngineError::JobNotFound(key.to_string()));
        }
        Ok(())
    }

    async fn resume_job(&self, key: &JobKey) -> Result<(), EngineError> {
        let mut info = self
            .trigger_info(key)
            .await?
            .ok_or_else(|| EngineError::JobNotFound(key.to_string()))?;
        if info.state != TriggerState::Paused {
            return Ok(());
        }

        trigger::resume(&mut info, Utc::now())?;

        let raw = key.to_string();
        let state = info.state.as_str();
        let next_fire = info.next_fire.map(ts);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE engine_jobs SET trigger_state = ?2, next_fire = ?3
                     WHERE job_key = ?1 AND trigger_state = 'paused'",
                    params![raw, state, next_fire],
                )?;
                Ok(())
            })
            .await
            .map_err(storage)
    }

    async fn job_keys(&self) -> Result<Vec<JobKey>, EngineError> {
        let keys = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT job_key FROM engine_jobs")?;
                let keys = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(storage)?;
        Ok(keys.into_iter().map(JobKey::from_raw).collect())
    }

    async fn job_data(&self, key: &JobKey) -> Result<Option<JobData>, EngineError> {
        let raw = key.to_string();
        let data = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT job_data FROM engine_jobs WHERE job_key = ?1")?;
                let mut rows = stmt.query([&raw])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row.get::<_, String>(0)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(storage)?;

        data.map(|d| serde_json::from_str(&d).map_err(serialization))
            .transpose()
    }

    async fn trigger_info(&self, key: &JobKey) -> Result<Option<TriggerInfo>, EngineError> {
        let raw = key.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT trigger_spec, trigger_state, next_fire
                     FROM engine_jobs WHERE job_key = ?1",
                )?;
                let mut rows = stmt.query([&raw])?;
                match rows.next()? {
                    Some(row) => Ok(Some((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))),
                    None => Ok(None),
                }
            })
            .await
            .map_err(storage)?;

        let Some((spec, state, next_fire)) = row else {
            return Ok(None);
        };

        Ok(Some(TriggerInfo {
            key: key.trigger_key(),
            job_key: key.clone(),
            spec: serde_json::from_str(&spec).map_err(serialization)?,
            state: state.parse()?,
            next_fire: next_fire.as_deref().map(parse_ts).transpose()?,
        }))
    }

    async fn acquire_due(&self, now: DateTime<Utc>) -> Result<Vec<FiredJob>, EngineError> {
        let mut fired: Vec<FiredJob> = std::mem::take(&mut *self.recovered.lock());

        let now_ts = ts(now);
        let due = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let rows = {
                    let mut stmt = tx.prepare(
                        "SELECT job_key, job_data, trigger_spec, next_fire FROM engine_jobs
                         WHERE trigger_state = 'normal' AND next_fire IS NOT NULL
                           AND next_fire <= ?1",
                    )?;
                    stmt.query_map([&now_ts], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?
                };

                let mut due = Vec::new();
                for (key, data, spec, next_fire) in rows {
                    match step(&spec, &next_fire, now) {
                        Ok((advance, scheduled_for)) => {
                            tx.execute(
                                "UPDATE engine_jobs SET trigger_state = ?2, next_fire = ?3,
                                 in_flight = CASE WHEN ?4 THEN 1 ELSE in_flight END,
                                 scheduled_for = ?5
                                 WHERE job_key = ?1",
                                params![
                                    key,
                                    advance.state().as_str(),
                                    advance.next_fire.map(ts),
                                    advance.fire,
                                    ts(scheduled_for)
                                ],
                            )?;
                            if advance.fire {
                                due.push((key, data, scheduled_for));
                            } else if advance.next_fire.is_none() {
                                tx.execute(
                                    "DELETE FROM engine_jobs WHERE job_key = ?1 AND durable = 0",
                                    [&key],
                                )?;
                            }
                        }
                        Err(e) => {
                            warn!(job_key = %key, "Trigger error: {}", e);
                            tx.execute(
                                "UPDATE engine_jobs SET trigger_state = 'error' WHERE job_key = ?1",
                                [&key],
                            )?;
                        }
                    }
                }

                tx.commit()?;
                Ok(due)
            })
            .await
            .map_err(storage)?;

        for (key, data, scheduled_for) in due {
            match serde_json::from_str::<JobData>(&data) {
                Ok(data) => fired.push(FiredJob {
                    job_key: JobKey::from_raw(key),
                    data,
                    scheduled_for,
                    recovering: false,
                }),
                Err(e) => warn!(job_key = %key, "Skipping job with unreadable data: {}", e),
            }
        }

        Ok(fired)
    }

    async fn complete(&self, key: &JobKey) -> Result<(), EngineError> {
        let raw = key.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE engine_jobs SET in_flight = 0 WHERE job_key = ?1",
                    [&raw],
                )?;
                conn.execute(
                    "DELETE FROM engine_jobs
                     WHERE job_key = ?1 AND trigger_state = 'complete' AND durable = 0",
                    [&raw],
                )?;
                Ok(())
            })
            .await
            .map_err(storage)
    }
}

fn step(
    spec: &str,
    next_fire: &str,
    now: DateTime<Utc>,
) -> Result<(trigger::Advance, DateTime<Utc>), EngineError> {
    let spec: TriggerSpec = serde_json::from_str(spec).map_err(serialization)?;
    let scheduled_for = parse_ts(next_fire)?;
    let advance = trigger::advance(&spec, scheduled_for, now)?;
    Ok((advance, scheduled_for))
}

/// Fixed-width UTC timestamps so that text comparison orders correctly.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, EngineError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::Serialization(format!("bad timestamp {}: {}", s, e)))
}

fn storage(e: tokio_rusqlite::Error) -> EngineError {
    EngineError::Storage(e.to_string())
}

fn serialization(e: serde_json::Error) -> EngineError {
    EngineError::Serialization(e.to_string())
}

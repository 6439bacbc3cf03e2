//! Engine database schema.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Initialize the engine schema.
pub fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = r#"
-- One row per job; each job owns exactly one trigger
CREATE TABLE IF NOT EXISTS engine_jobs (
    job_key TEXT PRIMARY KEY,
    job_data TEXT NOT NULL DEFAULT '{}',
    durable INTEGER NOT NULL DEFAULT 1,
    request_recovery INTEGER NOT NULL DEFAULT 1,
    trigger_key TEXT NOT NULL,
    trigger_spec TEXT NOT NULL,
    trigger_state TEXT NOT NULL,
    next_fire TEXT,
    in_flight INTEGER NOT NULL DEFAULT 0,
    scheduled_for TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_engine_jobs_due ON engine_jobs(trigger_state, next_fire);
CREATE INDEX IF NOT EXISTS idx_engine_jobs_in_flight ON engine_jobs(in_flight);
"#;

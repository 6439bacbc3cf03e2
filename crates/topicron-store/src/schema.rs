//! Store database schema.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Initialize the store schema.
pub fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schedules (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    schedule_type TEXT NOT NULL,
    sub_type TEXT NOT NULL,
    start_date_time TEXT NOT NULL,
    end_date_time TEXT,
    start_days TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL,
    details TEXT,
    cron_expression TEXT,
    updated_at TEXT NOT NULL
);

-- Attachments are owned by a schedule but not cascaded at this layer
CREATE TABLE IF NOT EXISTS resource_attachments (
    id TEXT PRIMARY KEY,
    schedule_id TEXT NOT NULL,
    resource_id TEXT NOT NULL,
    resource_type TEXT NOT NULL,
    metadata TEXT
);

CREATE INDEX IF NOT EXISTS idx_resource_attachments_schedule
    ON resource_attachments(schedule_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_creation() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        for table in ["schedules", "resource_attachments"] {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")
                .unwrap();
            assert!(stmt.exists([table]).unwrap());
        }
    }
}

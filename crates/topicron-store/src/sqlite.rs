//! SQLite-backed schedule and resource store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use topicron_protocols::{
    Day, ResourceAttachment, ResourceRepository, ResourceType, Schedule, ScheduleRepository,
    StoreError,
};

use crate::schema::init_schema;

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;

const SCHEDULE_COLUMNS: &str = "id, name, schedule_type, sub_type, start_date_time, \
     end_date_time, start_days, status, details, cron_expression";

const ATTACHMENT_COLUMNS: &str = "id, schedule_id, resource_id, resource_type, metadata";

/// Both repositories over a single SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::init(conn).await
    }

    /// Open (or create) a file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "Opening store database");
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(query)?;
        Ok(Self { conn })
    }

    async fn query_schedules(
        &self,
        filter: Option<Uuid>,
    ) -> Result<Vec<Schedule>, StoreError> {
        let rows = self
            .conn
            .call(move |conn| {
                let rows = match filter {
                    Some(id) => {
                        let sql = format!("SELECT {} FROM schedules WHERE id = ?1", SCHEDULE_COLUMNS);
                        let mut stmt = conn.prepare(&sql)?;
                        stmt.query_map([id.to_string()], ScheduleRow::from_row)?
                            .collect::<Result<Vec<_>, _>>()?
                    }
                    None => {
                        let sql = format!("SELECT {} FROM schedules", SCHEDULE_COLUMNS);
                        let mut stmt = conn.prepare(&sql)?;
                        stmt.query_map([], ScheduleRow::from_row)?
                            .collect::<Result<Vec<_>, _>>()?
                    }
                };
                Ok(rows)
            })
            .await
            .map_err(query)?;

        rows.into_iter().map(ScheduleRow::into_schedule).collect()
    }

    async fn query_attachments(
        &self,
        sql_filter: &'static str,
        arg: Option<Uuid>,
    ) -> Result<Vec<ResourceAttachment>, StoreError> {
        let rows = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM resource_attachments {}",
                    ATTACHMENT_COLUMNS, sql_filter
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = match arg {
                    Some(id) => stmt
                        .query_map([id.to_string()], AttachmentRow::from_row)?
                        .collect::<Result<Vec<_>, _>>()?,
                    None => stmt
                        .query_map([], AttachmentRow::from_row)?
                        .collect::<Result<Vec<_>, _>>()?,
                };
                Ok(rows)
            })
            .await
            .map_err(query)?;

        rows.into_iter().map(AttachmentRow::into_attachment).collect()
    }
}

#[async_trait]
impl ScheduleRepository for SqliteStore {
    async fn get_all(&self) -> Result<Vec<Schedule>, StoreError> {
        self.query_schedules(None).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Schedule>, StoreError> {
        Ok(self.query_schedules(Some(id)).await?.into_iter().next())
    }

    async fn add(&self, schedule: &Schedule) -> Result<(), StoreError> {
        let row = ScheduleRow::from_schedule(schedule)?;
        let id = schedule.id;
        let inserted = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "INSERT OR IGNORE INTO schedules
                     (id, name, schedule_type, sub_type, start_date_time, end_date_time,
                      start_days, status, details, cron_expression, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        row.id,
                        row.name,
                        row.schedule_type,
                        row.sub_type,
                        row.start_date_time,
                        row.end_date_time,
                        row.start_days,
                        row.status,
                        row.details,
                        row.cron_expression,
                        Utc::now().to_rfc3339()
                    ],
                )?;
                Ok(n)
            })
            .await
            .map_err(query)?;

        if inserted == 0 {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        Ok(())
    }

    async fn update(&self, schedule: &Schedule) -> Result<(), StoreError> {
        let row = ScheduleRow::from_schedule(schedule)?;
        let id = schedule.id;
        let updated = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE schedules SET name = ?2, schedule_type = ?3, sub_type = ?4,
                     start_date_time = ?5, end_date_time = ?6, start_days = ?7, status = ?8,
                     details = ?9, cron_expression = ?10, updated_at = ?11
                     WHERE id = ?1",
                    params![
                        row.id,
                        row.name,
                        row.schedule_type,
                        row.sub_type,
                        row.start_date_time,
                        row.end_date_time,
                        row.start_days,
                        row.status,
                        row.details,
                        row.cron_expression,
                        Utc::now().to_rfc3339()
                    ],
                )?;
                Ok(n)
            })
            .await
            .map_err(query)?;

        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let n = self
            .conn
            .call(move |conn| {
                Ok(conn.execute("DELETE FROM schedules WHERE id = ?1", [id.to_string()])?)
            })
            .await
            .map_err(query)?;
        Ok(n > 0)
    }
}

#[async_trait]
impl ResourceRepository for SqliteStore {
    async fn get_all(&self) -> Result<Vec<ResourceAttachment>, StoreError> {
        self.query_attachments("", None).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<ResourceAttachment>, StoreError> {
        Ok(self
            .query_attachments("WHERE id = ?1", Some(id))
            .await?
            .into_iter()
            .next())
    }

    async fn get_by_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Vec<ResourceAttachment>, StoreError> {
        self.query_attachments("WHERE schedule_id = ?1", Some(schedule_id))
            .await
    }

    async fn add(&self, attachment: &ResourceAttachment) -> Result<(), StoreError> {
        let row = AttachmentRow::from_attachment(attachment)?;
        let inserted = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "INSERT OR IGNORE INTO resource_attachments
                     (id, schedule_id, resource_id, resource_type, metadata)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        row.id,
                        row.schedule_id,
                        row.resource_id,
                        row.resource_type,
                        row.metadata
                    ],
                )?;
                Ok(n)
            })
            .await
            .map_err(query)?;

        if inserted == 0 {
            return Err(StoreError::AlreadyExists(attachment.id.to_string()));
        }
        Ok(())
    }

    async fn update(&self, attachment: &ResourceAttachment) -> Result<(), StoreError> {
        let row = AttachmentRow::from_attachment(attachment)?;
        let updated = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE resource_attachments
                     SET schedule_id = ?2, resource_id = ?3, resource_type = ?4, metadata = ?5
                     WHERE id = ?1",
                    params![
                        row.id,
                        row.schedule_id,
                        row.resource_id,
                        row.resource_type,
                        row.metadata
                    ],
                )?;
                Ok(n)
            })
            .await
            .map_err(query)?;

        if updated == 0 {
            return Err(StoreError::NotFound(attachment.id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let n = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM resource_attachments WHERE id = ?1",
                    [id.to_string()],
                )?)
            })
            .await
            .map_err(query)?;
        Ok(n > 0)
    }
}

struct ScheduleRow {
    id: String,
    name: String,
    schedule_type: String,
    sub_type: String,
    start_date_time: String,
    end_date_time: Option<String>,
    start_days: String,
    status: String,
    details: Option<String>,
    cron_expression: Option<String>,
}

impl ScheduleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            schedule_type: row.get(2)?,
            sub_type: row.get(3)?,
            start_date_time: row.get(4)?,
            end_date_time: row.get(5)?,
            start_days: row.get(6)?,
            status: row.get(7)?,
            details: row.get(8)?,
            cron_expression: row.get(9)?,
        })
    }

    fn from_schedule(schedule: &Schedule) -> Result<Self, StoreError> {
        Ok(Self {
            id: schedule.id.to_string(),
            name: schedule.name.clone(),
            schedule_type: enum_to_text(&schedule.schedule_type)?,
            sub_type: enum_to_text(&schedule.sub_type)?,
            start_date_time: schedule.start_date_time.to_rfc3339(),
            end_date_time: schedule.end_date_time.map(|t| t.to_rfc3339()),
            start_days: serde_json::to_string(&schedule.start_days).map_err(serialization)?,
            status: enum_to_text(&schedule.status)?,
            details: schedule.details.clone(),
            cron_expression: schedule.cron_expression.clone(),
        })
    }

    fn into_schedule(self) -> Result<Schedule, StoreError> {
        let start_days: Vec<Day> =
            serde_json::from_str(&self.start_days).map_err(serialization)?;
        Ok(Schedule {
            id: parse_uuid(&self.id)?,
            name: self.name,
            schedule_type: enum_from_text(self.schedule_type)?,
            sub_type: enum_from_text(self.sub_type)?,
            start_date_time: parse_ts(&self.start_date_time)?,
            end_date_time: self.end_date_time.as_deref().map(parse_ts).transpose()?,
            start_days,
            status: enum_from_text(self.status)?,
            details: self.details,
            cron_expression: self.cron_expression,
        })
    }
}

struct AttachmentRow {
    id: String,
    schedule_id: String,
    resource_id: String,
    resource_type: String,
    metadata: Option<String>,
}

impl AttachmentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            schedule_id: row.get(1)?,
            resource_id: row.get(2)?,
            resource_type: row.get(3)?,
            metadata: row.get(4)?,
        })
    }

    fn from_attachment(attachment: &ResourceAttachment) -> Result<Self, StoreError> {
        Ok(Self {
            id: attachment.id.to_string(),
            schedule_id: attachment.schedule_id.to_string(),
            resource_id: attachment.resource_id.clone(),
            resource_type: attachment.resource_type.as_str().to_string(),
            metadata: attachment
                .metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(serialization)?,
        })
    }

    fn into_attachment(self) -> Result<ResourceAttachment, StoreError> {
        let resource_type: ResourceType = self
            .resource_type
            .parse()
            .unwrap_or_default();
        Ok(ResourceAttachment {
            id: parse_uuid(&self.id)?,
            schedule_id: parse_uuid(&self.schedule_id)?,
            resource_id: self.resource_id,
            resource_type,
            metadata: self
                .metadata
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .map_err(serialization)?,
        })
    }
}

/// Unit enums are stored as their bare serde name.
fn enum_to_text<T: Serialize>(value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value).map_err(serialization)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(StoreError::Serialization(format!(
            "expected a unit variant, got {}",
            other
        ))),
    }
}

fn enum_from_text<T: DeserializeOwned>(text: String) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(text)).map_err(serialization)
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|e| StoreError::Serialization(format!("bad id {}: {}", s, e)))
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("bad timestamp {}: {}", s, e)))
}

fn query(e: tokio_rusqlite::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

fn serialization(e: serde_json::Error) -> StoreError {
    StoreError::Serialization(e.to_string())
}

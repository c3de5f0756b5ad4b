use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::log_record::{LogRecord, NewLogRecord};
use crate::schema::outbox_log;

#[derive(Debug, Clone, Queryable, Selectable, QueryableByName, Identifiable)]
#[diesel(table_name = outbox_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LogRecordRow {
    pub id: i64,
    pub event_type: String,
    pub body: String,
    pub flow_id: Option<String>,
    pub compaction_key: Option<String>,
    pub eid: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    pub locked_by: Option<String>,
    pub locked_until: Option<DateTime<Utc>>,
}

impl From<LogRecordRow> for LogRecord {
    fn from(row: LogRecordRow) -> Self {
        LogRecord {
            id: row.id,
            event_type: row.event_type,
            body: row.body,
            flow_id: row.flow_id,
            compaction_key: row.compaction_key,
            eid: row.eid,
            created_at: row.created_at,
            last_modified_at: row.last_modified_at,
            locked_by: row.locked_by,
            locked_until: row.locked_until,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = outbox_log)]
pub struct NewLogRecordRow {
    pub event_type: String,
    pub body: String,
    pub flow_id: Option<String>,
    pub compaction_key: Option<String>,
    pub eid: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

impl NewLogRecordRow {
    pub fn stamped(record: NewLogRecord, now: DateTime<Utc>) -> Self {
        Self {
            event_type: record.event_type,
            body: record.body,
            flow_id: record.flow_id,
            compaction_key: record.compaction_key,
            eid: record.eid,
            created_at: now,
            last_modified_at: now,
        }
    }
}

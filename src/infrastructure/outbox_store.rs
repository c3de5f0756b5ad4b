use std::sync::Arc;

use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text, Timestamptz};

use crate::db::DbPool;
use crate::domain::clock::Clock;
use crate::domain::errors::{OutboxError, OutboxResult};
use crate::domain::log_record::{LogRecord, NewLogRecord};
use crate::domain::ports::OutboxStore;
use crate::schema::outbox_log;

use super::batch_query::{pg_placeholders, BatchQuery, DEFAULT_SHAPES};
use super::models::{LogRecordRow, NewLogRecordRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for OutboxError {
    fn from(e: diesel::result::Error) -> Self {
        OutboxError::Database(e.to_string())
    }
}

impl From<r2d2::Error> for OutboxError {
    fn from(e: r2d2::Error) -> Self {
        OutboxError::Database(e.to_string())
    }
}

/// Claims up to `$4` unlocked or expired rows in id order. The predicate is
/// repeated on the outer UPDATE so a row taken by a concurrent claim no
/// longer matches once that claim commits.
const CLAIM_SQL: &str = "UPDATE outbox_log \
     SET locked_by = $1, locked_until = $2, last_modified_at = $3 \
     WHERE id IN (\
         SELECT id FROM outbox_log \
         WHERE locked_until IS NULL OR locked_until < $3 \
         ORDER BY id \
         LIMIT $4 \
         FOR UPDATE SKIP LOCKED\
     ) \
     AND (locked_until IS NULL OR locked_until < $3)";

// ── Store ─────────────────────────────────────────────────────────────────────

pub struct DieselOutboxStore {
    pool: DbPool,
    clock: Arc<dyn Clock>,
    by_ids: BatchQuery,
}

impl DieselOutboxStore {
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        let by_ids = BatchQuery::new(&DEFAULT_SHAPES, |n| {
            format!(
                "SELECT id, event_type, body, flow_id, compaction_key, eid, created_at, \
                 last_modified_at, locked_by, locked_until FROM outbox_log WHERE id IN ({})",
                pg_placeholders(n)
            )
        });
        Self {
            pool,
            clock,
            by_ids,
        }
    }
}

impl OutboxStore for DieselOutboxStore {
    type Tx = PgConnection;

    fn transaction<R, F>(&self, f: F) -> OutboxResult<R>
    where
        F: FnOnce(&mut PgConnection) -> OutboxResult<R>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<_, OutboxError, _>(|conn| f(conn))
    }

    fn persist(&self, conn: &mut PgConnection, records: Vec<NewLogRecord>) -> OutboxResult<usize> {
        let now = self.clock.now();
        let rows: Vec<NewLogRecordRow> = records
            .into_iter()
            .map(|r| NewLogRecordRow::stamped(r, now))
            .collect();
        Ok(diesel::insert_into(outbox_log::table)
            .values(&rows)
            .execute(conn)?)
    }

    fn claim(
        &self,
        token: &str,
        now: DateTime<Utc>,
        expiry: DateTime<Utc>,
        limit: i64,
    ) -> OutboxResult<usize> {
        let mut conn = self.pool.get()?;
        let claimed = diesel::sql_query(CLAIM_SQL)
            .bind::<Text, _>(token)
            .bind::<Timestamptz, _>(expiry)
            .bind::<Timestamptz, _>(now)
            .bind::<BigInt, _>(limit)
            .execute(&mut conn)?;

        Ok(claimed)
    }

    fn fetch_claimed(&self, token: &str, now: DateTime<Utc>) -> OutboxResult<Vec<LogRecord>> {
        let mut conn = self.pool.get()?;
        let rows = outbox_log::table
            .filter(outbox_log::locked_by.eq(token))
            .filter(outbox_log::locked_until.gt(now))
            .order(outbox_log::id.asc())
            .select(LogRecordRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(LogRecord::from).collect())
    }

    fn delete(&self, record: &LogRecord) -> OutboxResult<()> {
        let mut conn = self.pool.get()?;
        diesel::delete(outbox_log::table.find(record.id)).execute(&mut conn)?;
        Ok(())
    }

    fn find_by_ids(&self, ids: &[i64]) -> OutboxResult<Vec<LogRecord>> {
        let mut conn = self.pool.get()?;
        let mut rows = self.by_ids.run(ids, |sql, chunk| {
            let mut query = diesel::sql_query(sql).into_boxed::<Pg>();
            for id in chunk {
                query = query.bind::<BigInt, _>(*id);
            }
            query.load::<LogRecordRow>(&mut conn)
        })?;
        rows.sort_by_key(|row| row.id);
        Ok(rows.into_iter().map(LogRecord::from).collect())
    }
}

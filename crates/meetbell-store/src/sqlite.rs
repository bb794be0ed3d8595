//! SQLite-backed meeting store.
//!
//! Instants are stored as UTC epoch milliseconds so range predicates are
//! plain integer comparisons. Every engine-driven write is a single guarded
//! `UPDATE ... WHERE` touching one column, which gives compare-and-set
//! semantics without any lock held across the engine's awaits.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meetbell_core::clock::{Clock, SystemClock};
use meetbell_core::error::{MeetbellError, Result};
use meetbell_core::traits::MeetingStore;
use meetbell_core::types::{
    Meeting, MeetingFilter, MeetingStatus, MeetingUpdate, ReminderKind, RemindersSent,
    UpdateOutcome,
};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params};

const SELECT_COLUMNS: &str = "id, title, description, start_ms, end_ms, participants, created_by,
     status, remind_one_day, remind_one_hour, remind_fifteen_mins, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Open or create the meetings database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| store_err("DB open", e))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        let store = Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
        };
        store.migrate()?;
        tracing::debug!("🗄️ Meeting store opened at {}", path.display());
        Ok(store)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| store_err("DB open", e))?;
        let store = Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Stamp `updated_at` from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS meetings (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                start_ms INTEGER NOT NULL,
                end_ms INTEGER NOT NULL,
                participants TEXT NOT NULL DEFAULT '[]',   -- JSON array of addresses
                created_by TEXT,
                status TEXT NOT NULL DEFAULT 'scheduled',
                remind_one_day INTEGER NOT NULL DEFAULT 0,
                remind_one_hour INTEGER NOT NULL DEFAULT 0,
                remind_fifteen_mins INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (end_ms > start_ms)
            );
            CREATE INDEX IF NOT EXISTS idx_meetings_status_start ON meetings(status, start_ms);
            CREATE INDEX IF NOT EXISTS idx_meetings_owner ON meetings(created_by);
            ",
        )
        .map_err(|e| store_err("Migration", e))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| MeetbellError::Store(format!("Lock: {e}")))
    }

    fn exists(conn: &Connection, id: &str) -> Result<bool> {
        conn.query_row("SELECT 1 FROM meetings WHERE id = ?1", [id], |_| Ok(()))
            .optional()
            .map(|r| r.is_some())
            .map_err(|e| store_err("Exists", e))
    }
}

#[async_trait]
impl MeetingStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert(&self, meeting: &Meeting) -> Result<()> {
        let participants = serde_json::to_string(&meeting.participants)
            .map_err(|e| MeetbellError::Store(format!("Serialize participants: {e}")))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO meetings
             (id, title, description, start_ms, end_ms, participants, created_by, status,
              remind_one_day, remind_one_hour, remind_fifteen_mins, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                meeting.id,
                meeting.title,
                meeting.description,
                meeting.start_time.timestamp_millis(),
                meeting.end_time.timestamp_millis(),
                participants,
                meeting.created_by,
                meeting.status.as_str(),
                meeting.reminders_sent.one_day_before as i32,
                meeting.reminders_sent.one_hour_before as i32,
                meeting.reminders_sent.fifteen_mins_before as i32,
                meeting.created_at.to_rfc3339(),
                meeting.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| store_err("Insert meeting", e))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Meeting>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM meetings WHERE id = ?1"),
            [id],
            row_to_meeting,
        )
        .optional()
        .map_err(|e| store_err("Get meeting", e))
    }

    async fn find(&self, filter: &MeetingFilter) -> Result<Vec<Meeting>> {
        let (clause, values) = where_clause(filter);
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM meetings{clause} ORDER BY start_ms"
            ))
            .map_err(|e| store_err("Prepare find", e))?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(values), row_to_meeting)
            .map_err(|e| store_err("Find meetings", e))?;

        let mut meetings = Vec::new();
        for row in rows {
            match row {
                Ok(m) => meetings.push(m),
                Err(e) => tracing::warn!("⚠️ Skipping unreadable meeting row: {e}"),
            }
        }
        Ok(meetings)
    }

    async fn update(&self, id: &str, update: MeetingUpdate) -> Result<UpdateOutcome> {
        let now = self.clock.now().to_rfc3339();
        let conn = self.lock()?;
        let changed = match update {
            MeetingUpdate::MarkReminderSent(kind) => {
                let col = reminder_column(kind);
                let sql = format!(
                    "UPDATE meetings SET {col} = 1, updated_at = ?1 WHERE id = ?2 AND {col} = 0"
                );
                conn.execute(&sql, params![now, id])
                .map_err(|e| store_err("Mark reminder", e))?
            }
            MeetingUpdate::Transition { from, to } => {
                if from.can_transition_to(to) {
                    conn.execute(
                        "UPDATE meetings SET status = ?1, updated_at = ?2 \
                         WHERE id = ?3 AND status = ?4",
                        params![to.as_str(), now, id, from.as_str()],
                    )
                    .map_err(|e| store_err("Transition", e))?
                } else {
                    0
                }
            }
        };

        if changed > 0 {
            Ok(UpdateOutcome::Applied)
        } else if Self::exists(&conn, id)? {
            Ok(UpdateOutcome::Unchanged)
        } else {
            Ok(UpdateOutcome::NotFound)
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let n = conn
            .execute("DELETE FROM meetings WHERE id = ?1", [id])
            .map_err(|e| store_err("Delete meeting", e))?;
        Ok(n > 0)
    }

    async fn delete_many(&self, filter: &MeetingFilter) -> Result<u64> {
        let (clause, values) = where_clause(filter);
        let conn = self.lock()?;
        let n = conn
            .execute(
                &format!("DELETE FROM meetings{clause}"),
                rusqlite::params_from_iter(values),
            )
            .map_err(|e| store_err("Delete meetings", e))?;
        Ok(n as u64)
    }
}

fn store_err(context: &str, e: rusqlite::Error) -> MeetbellError {
    MeetbellError::Store(format!("{context}: {e}"))
}

fn reminder_column(kind: ReminderKind) -> &'static str {
    match kind {
        ReminderKind::OneDayBefore => "remind_one_day",
        ReminderKind::OneHourBefore => "remind_one_hour",
        ReminderKind::FifteenMinsBefore => "remind_fifteen_mins",
    }
}

/// Translate a filter into a `WHERE` clause with positional parameters.
fn where_clause(filter: &MeetingFilter) -> (String, Vec<Value>) {
    let mut conds = Vec::new();
    let mut values = Vec::new();

    if let Some(statuses) = &filter.statuses {
        if statuses.is_empty() {
            conds.push("0".to_string());
        } else {
            let placeholders: Vec<String> = statuses
                .iter()
                .map(|s| {
                    values.push(Value::Text(s.as_str().to_string()));
                    format!("?{}", values.len())
                })
                .collect();
            conds.push(format!("status IN ({})", placeholders.join(", ")));
        }
    }
    if let Some(cutoff) = filter.end_before {
        values.push(Value::Integer(cutoff.timestamp_millis()));
        conds.push(format!("end_ms < ?{}", values.len()));
    }
    if let Some(owner) = &filter.created_by {
        values.push(Value::Text(owner.clone()));
        conds.push(format!("created_by = ?{}", values.len()));
    }

    if conds.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conds.join(" AND ")), values)
    }
}

fn conversion_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}

fn millis_to_utc(idx: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| conversion_err(idx, format!("timestamp out of range: {ms}")))
}

fn rfc3339_to_utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_meeting(row: &rusqlite::Row<'_>) -> rusqlite::Result<Meeting> {
    let status_str: String = row.get(7)?;
    let status = MeetingStatus::parse(&status_str)
        .ok_or_else(|| conversion_err(7, format!("unknown status '{status_str}'")))?;
    let participants_str: String = row.get(5)?;
    let participants: Vec<String> = serde_json::from_str(&participants_str)
        .map_err(|e| conversion_err(5, format!("participants: {e}")))?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    Ok(Meeting {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_time: millis_to_utc(3, row.get(3)?)?,
        end_time: millis_to_utc(4, row.get(4)?)?,
        participants,
        created_by: row.get(6)?,
        status,
        reminders_sent: RemindersSent {
            one_day_before: row.get::<_, i32>(8)? != 0,
            one_hour_before: row.get::<_, i32>(9)? != 0,
            fifteen_mins_before: row.get::<_, i32>(10)? != 0,
        },
        created_at: rfc3339_to_utc(&created_at),
        updated_at: rfc3339_to_utc(&updated_at),
    })
}

use std::path::Path;

use contracts::{Event, EventKind, LoggedEvent, Payload};
use kernel_core::{EventLog, LogError};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const EVENT_COLUMNS: &str = "seq, id, parent_id, type, source, name, payload_json, confidence";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("row {seq} has unknown event type `{kind}`")]
    CorruptRow { seq: u64, kind: String },
}

impl From<PersistenceError> for LogError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::Serde(err) => LogError::Serialization(err),
            other => LogError::Backend(Box::new(other)),
        }
    }
}

/// Optional filters for [`SqliteEventLog::find`]; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub kind: Option<EventKind>,
    pub source: Option<String>,
    pub name: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogStats {
    pub total: u64,
    pub observation: u64,
    pub action: u64,
    pub outcome: u64,
    pub internal: u64,
    pub system: u64,
    pub last_seq: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParentLinkReport {
    pub checked: usize,
    /// `(event_id, missing_parent_id)` pairs.
    pub missing: Vec<(String, String)>,
}

/// Append-only event log backed by a single SQLite table.
#[derive(Debug)]
pub struct SqliteEventLog {
    conn: Connection,
}

impl SqliteEventLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    pub fn close(self) -> Result<(), PersistenceError> {
        self.conn.close().map_err(|(_, err)| PersistenceError::Sqlite(err))
    }

    pub fn get(&self, event_id: &str) -> Result<Option<Event>, PersistenceError> {
        Ok(self.get_with_seq(event_id)?.map(|logged| logged.event))
    }

    pub fn get_with_seq(&self, event_id: &str) -> Result<Option<LoggedEvent>, PersistenceError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1 LIMIT 1"),
                params![event_id],
                RawEvent::from_row,
            )
            .optional()?;

        raw.map(RawEvent::decode).transpose()
    }

    /// Matching events in ascending sequence order, at most `limit` (min 1).
    pub fn find(
        &self,
        filter: &EventFilter,
        limit: usize,
    ) -> Result<Vec<LoggedEvent>, PersistenceError> {
        let mut clauses = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(kind) = filter.kind {
            clauses.push("type = ?");
            values.push(kind.as_str().to_string());
        }
        if let Some(source) = &filter.source {
            clauses.push("source = ?");
            values.push(source.clone());
        }
        if let Some(name) = &filter.name {
            clauses.push("name = ?");
            values.push(name.clone());
        }
        if let Some(parent_id) = &filter.parent_id {
            clauses.push("parent_id = ?");
            values.push(parent_id.clone());
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events {where_clause} ORDER BY seq ASC LIMIT {}",
            limit.max(1)
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), RawEvent::from_row)?;
        collect_rows(rows)
    }

    pub fn count(&self) -> Result<u64, PersistenceError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(to_u64(count))
    }

    pub fn stats(&self) -> Result<LogStats, PersistenceError> {
        let stats = self.conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN type = 'observation' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type = 'action' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type = 'outcome' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type = 'internal' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type = 'system' THEN 1 ELSE 0 END), 0),
                COALESCE(MAX(seq), 0)
             FROM events",
            [],
            |row| {
                Ok(LogStats {
                    total: to_u64(row.get(0)?),
                    observation: to_u64(row.get(1)?),
                    action: to_u64(row.get(2)?),
                    outcome: to_u64(row.get(3)?),
                    internal: to_u64(row.get(4)?),
                    system: to_u64(row.get(5)?),
                    last_seq: to_u64(row.get(6)?),
                })
            },
        )?;
        Ok(stats)
    }

    /// Reports events whose `parent_id` names no event in the log.
    pub fn verify_parent_links(&self, limit: usize) -> Result<ParentLinkReport, PersistenceError> {
        let checked: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (
                SELECT 1 FROM events WHERE parent_id IS NOT NULL LIMIT ?1
             )",
            params![i64::try_from(limit.max(1)).unwrap_or(i64::MAX)],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT child.id, child.parent_id
             FROM (
                SELECT seq, id, parent_id FROM events
                WHERE parent_id IS NOT NULL
                ORDER BY seq ASC
                LIMIT ?1
             ) AS child
             LEFT JOIN events AS parent ON parent.id = child.parent_id
             WHERE parent.id IS NULL
             ORDER BY child.seq ASC",
        )?;
        let rows = stmt.query_map(
            params![i64::try_from(limit.max(1)).unwrap_or(i64::MAX)],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;

        let mut missing = Vec::new();
        for row in rows {
            missing.push(row?);
        }

        Ok(ParentLinkReport {
            checked: usize::try_from(checked).unwrap_or(0),
            missing,
        })
    }

    fn configure(&mut self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                parent_id TEXT NULL,
                type TEXT NOT NULL,
                source TEXT NOT NULL,
                name TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                confidence REAL NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_parent_id ON events(parent_id);
            CREATE INDEX IF NOT EXISTS idx_events_type ON events(type);
            CREATE INDEX IF NOT EXISTS idx_events_source ON events(source);
            CREATE INDEX IF NOT EXISTS idx_events_name ON events(name);
            ",
        )?;
        Ok(())
    }

    fn tail(&self) -> Result<u64, PersistenceError> {
        let seq: i64 =
            self.conn
                .query_row("SELECT COALESCE(MAX(seq), 0) FROM events", [], |row| {
                    row.get(0)
                })?;
        Ok(to_u64(seq))
    }
}

impl EventLog for SqliteEventLog {
    fn append(&mut self, event: &Event) -> Result<u64, LogError> {
        insert_event(&self.conn, event)?;
        Ok(to_u64(self.conn.last_insert_rowid()))
    }

    fn append_many(&mut self, events: &[Event]) -> Result<(usize, u64), LogError> {
        if events.is_empty() {
            return Ok((0, self.tail()?));
        }

        let tx = self.conn.transaction().map_err(PersistenceError::from)?;
        for event in events {
            insert_event(&tx, event)?;
        }
        tx.commit().map_err(PersistenceError::from)?;

        Ok((events.len(), self.tail()?))
    }

    fn iter_since(&self, seq_exclusive: u64) -> Result<Vec<LoggedEvent>, LogError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE seq > ?1 ORDER BY seq ASC"
            ))
            .map_err(PersistenceError::from)?;
        let rows = stmt
            .query_map(
                params![i64::try_from(seq_exclusive).unwrap_or(i64::MAX)],
                RawEvent::from_row,
            )
            .map_err(PersistenceError::from)?;
        Ok(collect_rows(rows)?)
    }

    fn recent(&self, n: usize) -> Result<Vec<Event>, LogError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events ORDER BY seq DESC LIMIT ?1"
            ))
            .map_err(PersistenceError::from)?;
        let rows = stmt
            .query_map(
                params![i64::try_from(n).unwrap_or(i64::MAX)],
                RawEvent::from_row,
            )
            .map_err(PersistenceError::from)?;

        let mut events: Vec<Event> = collect_rows(rows)?
            .into_iter()
            .map(|logged| logged.event)
            .collect();
        events.reverse();
        Ok(events)
    }

    fn last_seq(&self) -> Result<u64, LogError> {
        Ok(self.tail()?)
    }
}

fn insert_event(conn: &Connection, event: &Event) -> Result<(), LogError> {
    let payload_json = serde_json::to_string(&event.payload)?;
    conn.execute(
        "INSERT INTO events (id, parent_id, type, source, name, payload_json, confidence)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.id.as_str(),
            event.parent_id.as_deref(),
            event.kind.as_str(),
            event.source.as_str(),
            event.name.as_str(),
            payload_json,
            event.confidence,
        ],
    )
    .map_err(|err| match err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            LogError::Integrity {
                event_id: event.id.clone(),
                reason: format!("constraint violation while appending `{}`", event.name),
            }
        }
        other => LogError::from(PersistenceError::from(other)),
    })?;
    Ok(())
}

/// Row as stored, before the type tag and payload are decoded.
struct RawEvent {
    seq: i64,
    id: String,
    parent_id: Option<String>,
    kind: String,
    source: String,
    name: String,
    payload_json: String,
    confidence: Option<f64>,
}

impl RawEvent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            seq: row.get(0)?,
            id: row.get(1)?,
            parent_id: row.get(2)?,
            kind: row.get(3)?,
            source: row.get(4)?,
            name: row.get(5)?,
            payload_json: row.get(6)?,
            confidence: row.get(7)?,
        })
    }

    fn decode(self) -> Result<LoggedEvent, PersistenceError> {
        let seq = to_u64(self.seq);
        let kind = self
            .kind
            .parse::<EventKind>()
            .map_err(|_| PersistenceError::CorruptRow {
                seq,
                kind: self.kind.clone(),
            })?;
        let payload = serde_json::from_str::<Payload>(&self.payload_json)?;

        Ok(LoggedEvent {
            seq,
            event: Event {
                kind,
                source: self.source,
                name: self.name,
                payload,
                id: self.id,
                parent_id: self.parent_id,
                confidence: self.confidence,
            },
        })
    }
}

fn collect_rows(
    rows: impl Iterator<Item = rusqlite::Result<RawEvent>>,
) -> Result<Vec<LoggedEvent>, PersistenceError> {
    let mut events = Vec::new();
    for row in rows {
        events.push(row?.decode()?);
    }
    Ok(events)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

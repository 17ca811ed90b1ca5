//! Append-only event log contract and an in-memory implementation.
//!
//! Sequence numbers are assigned at append time, start at 1, and are the only
//! ordering key. Records are never mutated or removed.

use std::collections::HashSet;

use contracts::{Event, LoggedEvent};

use crate::error::LogError;

pub trait EventLog {
    /// Appends one event and returns its sequence number.
    fn append(&mut self, event: &Event) -> Result<u64, LogError>;

    /// Appends a batch atomically. Returns `(appended, new_tail_seq)`.
    fn append_many(&mut self, events: &[Event]) -> Result<(usize, u64), LogError>;

    /// All records with `seq > seq_exclusive`, ascending.
    fn iter_since(&self, seq_exclusive: u64) -> Result<Vec<LoggedEvent>, LogError>;

    /// The last `n` events in ascending order.
    fn recent(&self, n: usize) -> Result<Vec<Event>, LogError>;

    /// Current tail sequence number, 0 when empty.
    fn last_seq(&self) -> Result<u64, LogError>;

    /// History is permanent; this always fails.
    fn delete_all(&mut self) -> Result<(), LogError> {
        Err(LogError::DeletionForbidden)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryEventLog {
    entries: Vec<LoggedEvent>,
    ids: HashSet<String>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LoggedEvent] {
        &self.entries
    }

    fn tail(&self) -> u64 {
        self.entries.last().map(|entry| entry.seq).unwrap_or(0)
    }

    fn push_unchecked(&mut self, event: &Event) -> u64 {
        let seq = self.tail() + 1;
        self.ids.insert(event.id.clone());
        self.entries.push(LoggedEvent {
            seq,
            event: event.clone(),
        });
        seq
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&mut self, event: &Event) -> Result<u64, LogError> {
        if self.ids.contains(&event.id) {
            return Err(LogError::duplicate_id(&event.id));
        }
        Ok(self.push_unchecked(event))
    }

    fn append_many(&mut self, events: &[Event]) -> Result<(usize, u64), LogError> {
        let mut batch_ids = HashSet::with_capacity(events.len());
        for event in events {
            if self.ids.contains(&event.id) || !batch_ids.insert(event.id.as_str()) {
                return Err(LogError::duplicate_id(&event.id));
            }
        }

        for event in events {
            self.push_unchecked(event);
        }
        Ok((events.len(), self.tail()))
    }

    fn iter_since(&self, seq_exclusive: u64) -> Result<Vec<LoggedEvent>, LogError> {
        let start = self.entries.partition_point(|entry| entry.seq <= seq_exclusive);
        Ok(self.entries[start..].to_vec())
    }

    fn recent(&self, n: usize) -> Result<Vec<Event>, LogError> {
        let start = self.entries.len().saturating_sub(n);
        Ok(self.entries[start..]
            .iter()
            .map(|entry| entry.event.clone())
            .collect())
    }

    fn last_seq(&self) -> Result<u64, LogError> {
        Ok(self.tail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{payload, EventKind};
    use serde_json::json;

    fn obs(name: &str) -> Event {
        Event::observation("world", name, payload(json!({ "x": 1 })))
    }

    #[test]
    fn sequence_numbers_start_at_one_and_increase() {
        let mut log = InMemoryEventLog::new();
        assert_eq!(log.last_seq().unwrap(), 0);
        assert_eq!(log.append(&obs("a")).unwrap(), 1);
        assert_eq!(log.append(&obs("b")).unwrap(), 2);
        let (count, tail) = log.append_many(&[obs("c"), obs("d")]).unwrap();
        assert_eq!((count, tail), (2, 4));
    }

    #[test]
    fn iter_since_is_exclusive_and_ascending() {
        let mut log = InMemoryEventLog::new();
        log.append_many(&[obs("a"), obs("b"), obs("c")]).unwrap();
        let since = log.iter_since(1).unwrap();
        assert_eq!(since.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![2, 3]);
        assert!(log.iter_since(3).unwrap().is_empty());
        assert_eq!(log.iter_since(0).unwrap().len(), 3);
    }

    #[test]
    fn recent_returns_tail_in_ascending_order() {
        let mut log = InMemoryEventLog::new();
        log.append_many(&[obs("a"), obs("b"), obs("c")]).unwrap();
        let names = log
            .recent(2)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(log.recent(10).unwrap().len(), 3);
        assert!(log.recent(0).unwrap().is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected_without_partial_writes() {
        let mut log = InMemoryEventLog::new();
        let first = obs("a");
        log.append(&first).unwrap();

        assert!(matches!(log.append(&first), Err(LogError::Integrity { .. })));

        let fresh = obs("b");
        let result = log.append_many(&[fresh.clone(), fresh]);
        assert!(matches!(result, Err(LogError::Integrity { .. })));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn deletion_always_fails() {
        let mut log = InMemoryEventLog::new();
        log.append(&obs("a")).unwrap();
        assert!(matches!(log.delete_all(), Err(LogError::DeletionForbidden)));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let mut log = InMemoryEventLog::new();
        let event = Event::new(
            EventKind::Outcome,
            "world",
            "move_ok",
            payload(json!({ "ok": true, "nested": { "k": [1, 2] } })),
        )
        .with_parent("parent-1")
        .with_confidence(0.75);
        log.append(&event).unwrap();

        assert_eq!(log.iter_since(0).unwrap()[0].event, event);
        assert_eq!(log.recent(1).unwrap()[0], event);
    }
}

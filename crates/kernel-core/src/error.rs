use thiserror::Error;

/// Failures surfaced by an [`EventLog`](crate::memory::EventLog).
///
/// Every variant is fatal to the append that produced it; the log is left
/// without the offending record(s).
#[derive(Debug, Error)]
pub enum LogError {
    #[error("event payload could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("integrity violation while appending event {event_id}: {reason}")]
    Integrity { event_id: String, reason: String },

    #[error("deletion of log history is forbidden")]
    DeletionForbidden,

    #[error("event log backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LogError {
    pub fn duplicate_id(event_id: &str) -> Self {
        Self::Integrity {
            event_id: event_id.to_string(),
            reason: "event id already present in log".to_string(),
        }
    }
}

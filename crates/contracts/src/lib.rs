//! v1 cross-boundary contracts for the regulation kernel, persistence, and dashboard.
//!
//! Everything that crosses a crate boundary or lands in the event log is
//! defined here: the immutable [`Event`] record, the typed payloads the
//! regulator publishes, advisory snapshots, and runtime configuration.

pub mod advisory;
pub mod regulation;
pub mod world;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub use advisory::{HealthSnapshot, PhaseSnapshot, PhaseState};
pub use regulation::{LightTick, RegulatorSnapshot, Signal, StateUpdate};
pub use world::{GridPos, IdentityRecord, Percept, PerceptKind, WorldObjectRef, WorldSnapshot};

pub const SCHEMA_VERSION_V1: &str = "1.0";

/// Free-form key/value payload carried by every event.
pub type Payload = Map<String, Value>;

/// Well-known event names shared between producers and consumers.
pub mod names {
    pub const STATE_UPDATE: &str = "state_update";
    pub const LIGHT_TICK: &str = "light_tick";
    pub const WARNING_HIGH_AROUSAL: &str = "warning_high_arousal_persistence";
    pub const WARNING_LOW_RECOVERY: &str = "warning_low_recovery_persistence";
    pub const PREDICTION_ERROR: &str = "prediction_error";
    pub const EXPECTATION_CONFIRMED: &str = "expectation_confirmed";
    pub const PREFERENCE_UPDATED: &str = "preference_updated";
    pub const BOUNDARY_DETECTED: &str = "boundary_detected";
    pub const MOVE: &str = "move";
    pub const MOVE_OK: &str = "move_ok";
    pub const MOVE_BLOCKED: &str = "move_blocked";
    pub const UNKNOWN_ACTION: &str = "unknown_action";
    pub const AGENT_SPAWNED: &str = "agent_spawned";
    pub const POSITION: &str = "position";
    pub const COLLISION: &str = "collision";
    pub const BOUNDARY_CONTACT: &str = "boundary_contact";
    pub const UTTERANCE: &str = "utterance";
    pub const BOOT: &str = "boot";
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Something perceived.
    Observation,
    /// Something attempted.
    Action,
    /// Result of an action.
    Outcome,
    /// Regulatory or cognitive shift.
    Internal,
    /// Boot, shutdown, warnings.
    System,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::Observation,
        Self::Action,
        Self::Outcome,
        Self::Internal,
        Self::System,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Observation => "observation",
            Self::Action => "action",
            Self::Outcome => "outcome",
            Self::Internal => "internal",
            Self::System => "system",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(pub String);

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event kind: {}", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw)
            .ok_or_else(|| UnknownEventKind(raw.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Event record
// ---------------------------------------------------------------------------

/// Immutable record of something that happened.
///
/// Ordering is never carried by the event itself; the log assigns a sequence
/// number at append time. `parent_id` is a causal reference only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub source: String,
    pub name: String,
    #[serde(default)]
    pub payload: Payload,
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl Event {
    pub fn new(
        kind: EventKind,
        source: impl Into<String>,
        name: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            name: name.into(),
            payload,
            id: Uuid::new_v4().to_string(),
            parent_id: None,
            confidence: None,
        }
    }

    pub fn observation(source: impl Into<String>, name: impl Into<String>, payload: Payload) -> Self {
        Self::new(EventKind::Observation, source, name, payload)
    }

    pub fn action(source: impl Into<String>, name: impl Into<String>, payload: Payload) -> Self {
        Self::new(EventKind::Action, source, name, payload)
    }

    pub fn outcome(source: impl Into<String>, name: impl Into<String>, payload: Payload) -> Self {
        Self::new(EventKind::Outcome, source, name, payload)
    }

    pub fn internal(source: impl Into<String>, name: impl Into<String>, payload: Payload) -> Self {
        Self::new(EventKind::Internal, source, name, payload)
    }

    pub fn system(source: impl Into<String>, name: impl Into<String>, payload: Payload) -> Self {
        Self::new(EventKind::System, source, name, payload)
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn is(&self, kind: EventKind, name: &str) -> bool {
        self.kind == kind && self.name == name
    }

    pub fn payload_f64(&self, key: &str) -> Option<f64> {
        self.payload.get(key).and_then(Value::as_f64)
    }

    pub fn payload_bool(&self, key: &str) -> Option<bool> {
        self.payload.get(key).and_then(Value::as_bool)
    }

    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        format!("[{}] {}:{} ({})", self.kind, self.source, self.name, self.id)
    }
}

/// An event paired with the sequence number the log assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggedEvent {
    pub seq: u64,
    pub event: Event,
}

/// Converts a serializable value into an event payload.
///
/// Non-object values are wrapped under a `value` key.
pub fn to_payload<T: Serialize>(value: &T) -> Result<Payload, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = Payload::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}

/// Builds a payload from a `json!` object literal; anything else yields an empty payload.
pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemConfig {
    pub schema_version: String,
    pub memory_path: String,
    pub identity_path: String,
    pub world_size: (i64, i64),
    pub spawn_at: (i64, i64),
    #[serde(default)]
    pub enable_autonomy: bool,
    #[serde(default)]
    pub enable_cognition: bool,
    pub recent_window: usize,
    pub agent_seed: u64,
    pub learning_rate: f64,
    pub boundary_threshold: u32,
    pub creation_tag: String,
    pub continuity_version: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            memory_path: "data/memory/memory.db".to_string(),
            identity_path: "data/identity/identity.json".to_string(),
            world_size: (5, 5),
            spawn_at: (2, 2),
            enable_autonomy: false,
            enable_cognition: false,
            recent_window: 200,
            agent_seed: 1337,
            learning_rate: 0.05,
            boundary_threshold: 2,
            creation_tag: "gridmind".to_string(),
            continuity_version: 1,
        }
    }
}

impl SystemConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        fn env_string(key: &str) -> Option<String> {
            std::env::var(key)
                .ok()
                .filter(|value| !value.trim().is_empty())
        }
        fn env_parse<T: FromStr>(key: &str) -> Option<T> {
            env_string(key).and_then(|value| value.trim().parse().ok())
        }
        fn env_flag(key: &str) -> Option<bool> {
            env_string(key).map(|value| {
                matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            })
        }

        let defaults = Self::default();
        Self {
            memory_path: env_string("GRIDMIND_MEMORY_PATH").unwrap_or(defaults.memory_path),
            identity_path: env_string("GRIDMIND_IDENTITY_PATH").unwrap_or(defaults.identity_path),
            world_size: env_string("GRIDMIND_WORLD_SIZE")
                .and_then(|raw| parse_world_size(&raw))
                .unwrap_or(defaults.world_size),
            enable_autonomy: env_flag("GRIDMIND_AUTONOMY").unwrap_or(defaults.enable_autonomy),
            enable_cognition: env_flag("GRIDMIND_COGNITION").unwrap_or(defaults.enable_cognition),
            recent_window: env_parse("GRIDMIND_RECENT_WINDOW").unwrap_or(defaults.recent_window),
            agent_seed: env_parse("GRIDMIND_AGENT_SEED").unwrap_or(defaults.agent_seed),
            ..defaults
        }
    }
}

/// Parses a `WxH` world size such as `"7x5"`.
pub fn parse_world_size(raw: &str) -> Option<(i64, i64)> {
    let (w, h) = raw.trim().split_once(['x', 'X'])?;
    let width = w.trim().parse::<i64>().ok()?;
    let height = h.trim().parse::<i64>().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

// ---------------------------------------------------------------------------
// API errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidCommand,
    InvalidQuery,
    PersistenceFailure,
    IdentityUnavailable,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_serializes_kind_under_type_key() {
        let event = Event::action("user", names::MOVE, payload(json!({ "dx": 1, "dy": 0 })));
        let encoded = serde_json::to_value(&event).expect("serialize");
        assert_eq!(encoded["type"], json!("action"));
        assert_eq!(encoded["payload"]["dx"], json!(1));
        assert!(encoded["parent_id"].is_null());
    }

    #[test]
    fn event_kind_parses_its_own_label() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>(), Ok(kind));
        }
        assert!("dream".parse::<EventKind>().is_err());
    }

    #[test]
    fn events_get_distinct_ids() {
        let a = Event::internal("test", "a", Payload::new());
        let b = Event::internal("test", "a", Payload::new());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn world_size_parsing() {
        assert_eq!(parse_world_size("7x5"), Some((7, 5)));
        assert_eq!(parse_world_size(" 3 X 4 "), Some((3, 4)));
        assert_eq!(parse_world_size("0x4"), None);
        assert_eq!(parse_world_size("wide"), None);
    }

    #[test]
    fn non_object_values_are_wrapped() {
        let wrapped = to_payload(&3.5_f64).expect("serialize");
        assert_eq!(wrapped.get("value"), Some(&json!(3.5)));
    }
}

//! Regulator state and the payloads it publishes into the log.

use serde::{Deserialize, Serialize};

use crate::{names, Event, EventKind};

/// Point-in-time copy of the bounded regulatory vector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RegulatorSnapshot {
    pub arousal: f64,
    pub valence: f64,
    pub confidence: f64,
    pub confidence_floor: f64,
    pub uncertainty: f64,
    pub curiosity: f64,
}

impl RegulatorSnapshot {
    /// Field-wise `self - prev`.
    pub fn delta_from(&self, prev: &Self) -> Self {
        Self {
            arousal: self.arousal - prev.arousal,
            valence: self.valence - prev.valence,
            confidence: self.confidence - prev.confidence,
            confidence_floor: self.confidence_floor - prev.confidence_floor,
            uncertainty: self.uncertainty - prev.uncertainty,
            curiosity: self.curiosity - prev.curiosity,
        }
    }
}

/// Counts and ratios extracted from one batch of new log records.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub new_total: usize,
    pub observations: usize,
    pub actions: usize,
    pub outcomes: usize,
    pub internal: usize,
    pub system: usize,
    pub failures: usize,
    pub successes: usize,
    pub failure_rate: f64,
    pub activity_ratio: f64,
}

/// Payload of an Internal `state_update` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateUpdate {
    pub cycles: u64,
    pub stagnation: bool,
    pub delta: RegulatorSnapshot,
    pub state: RegulatorSnapshot,
    #[serde(default)]
    pub signal: Option<Signal>,
}

impl StateUpdate {
    /// Decodes the payload of a `state_update` event; anything else yields `None`.
    pub fn from_event(event: &Event) -> Option<Self> {
        if !event.is(EventKind::Internal, names::STATE_UPDATE) {
            return None;
        }
        serde_json::from_value(serde_json::Value::Object(event.payload.clone())).ok()
    }

    /// The newest `state_update` in `events`. A malformed newest update
    /// yields `None`; older updates are never used in its place.
    pub fn latest(events: &[Event]) -> Option<Self> {
        events
            .iter()
            .rev()
            .find(|event| event.is(EventKind::Internal, names::STATE_UPDATE))
            .and_then(Self::from_event)
    }
}

/// Payload of an Internal `light_tick` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LightTick {
    pub new_event_count: usize,
    pub delta: RegulatorSnapshot,
    pub state: RegulatorSnapshot,
}

//! Per-location scalar preferences learned from prediction results.

use std::collections::BTreeMap;

use contracts::{names, payload, Event, EventKind, GridPos};
use serde_json::json;

pub const PREFERENCE_SOURCE: &str = "preference";

/// Prediction errors below this leave preferences untouched.
pub const MISMATCH_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct PreferenceEngine {
    learning_rate: f64,
    scores: BTreeMap<String, f64>,
}

impl Default for PreferenceEngine {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl PreferenceEngine {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            scores: BTreeMap::new(),
        }
    }

    pub fn score(&self, key: &str) -> f64 {
        self.scores.get(key).copied().unwrap_or(0.0)
    }

    pub fn scores(&self) -> &BTreeMap<String, f64> {
        &self.scores
    }

    pub fn observe(&mut self, events: &[Event]) -> Vec<Event> {
        let mut emitted = Vec::new();

        for event in events {
            if event.kind != EventKind::Internal {
                continue;
            }
            let Some(key) = location_key(event) else {
                continue;
            };

            let (delta, confidence) = if event.name == names::EXPECTATION_CONFIRMED {
                (self.learning_rate, None)
            } else if event.name == names::PREDICTION_ERROR {
                let error = event.payload_f64("error").unwrap_or(0.0);
                if error < MISMATCH_THRESHOLD {
                    continue;
                }
                (-self.learning_rate * error, Some((1.0 - error).max(0.0)))
            } else {
                continue;
            };

            let score = self.scores.entry(key.clone()).or_insert(0.0);
            *score += delta;
            let score = *score;
            let confidence = confidence.unwrap_or_else(|| score.clamp(0.0, 1.0));

            emitted.push(
                Event::internal(
                    PREFERENCE_SOURCE,
                    names::PREFERENCE_UPDATED,
                    payload(json!({ "key": key, "delta": delta, "score": score })),
                )
                .with_parent(event.id.clone())
                .with_confidence(confidence),
            );
        }

        emitted
    }
}

/// `pos:x,y` from `payload.observed.position`, if present.
pub fn location_key(event: &Event) -> Option<String> {
    observed_position(event).map(|pos| format!("pos:{pos}"))
}

pub(crate) fn observed_position(event: &Event) -> Option<GridPos> {
    event
        .payload
        .get("observed")
        .and_then(|observed| observed.get("position"))
        .and_then(GridPos::from_value)
}

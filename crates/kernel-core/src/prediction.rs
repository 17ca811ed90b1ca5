//! Single-step expectation tracking over actions and their outcomes.

use std::collections::BTreeMap;

use contracts::{names, payload, Event, EventKind};
use serde_json::{json, Value};
use tracing::debug;

pub const PREDICTION_SOURCE: &str = "prediction";

/// Error below which an outcome also counts as a confirmation.
pub const CONFIRMATION_TOLERANCE: f64 = 0.1;

pub type Expectation = BTreeMap<String, f64>;

/// Holds at most one pending expectation. A new action replaces whatever
/// was pending, resolved or not.
#[derive(Debug, Clone, Default)]
pub struct PredictionEngine {
    expected: Option<Expectation>,
}

impl PredictionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&Expectation> {
        self.expected.as_ref()
    }

    pub fn observe(&mut self, events: &[Event]) -> Vec<Event> {
        let mut emitted = Vec::new();

        for event in events {
            match event.kind {
                EventKind::Action => {
                    if self.expected.is_some() {
                        debug!(action = %event.name, "replacing unresolved expectation");
                    }
                    self.expected = Some(expectation_for(event));
                }
                EventKind::Outcome => {
                    if let Some(expected) = self.expected.take() {
                        emitted.extend(resolve(&expected, event));
                    }
                }
                _ => {}
            }
        }

        emitted
    }
}

fn expectation_for(action: &Event) -> Expectation {
    let mut expected = Expectation::new();
    if action.name == names::MOVE {
        expected.insert("dx".to_string(), action.payload_f64("dx").unwrap_or(0.0));
        expected.insert("dy".to_string(), action.payload_f64("dy").unwrap_or(0.0));
    }
    expected
}

/// Sum of absolute differences; keys missing from the outcome count as 0.
pub fn prediction_error(expected: &Expectation, observed: &Event) -> f64 {
    expected
        .iter()
        .map(|(key, value)| (value - observed.payload_f64(key).unwrap_or(0.0)).abs())
        .sum()
}

fn resolve(expected: &Expectation, outcome: &Event) -> Vec<Event> {
    let error = prediction_error(expected, outcome);
    let observed = Value::Object(outcome.payload.clone());
    let expected = json!(expected);

    let mut emitted = vec![Event::internal(
        PREDICTION_SOURCE,
        names::PREDICTION_ERROR,
        payload(json!({
            "error": error,
            "expected": expected,
            "observed": observed,
        })),
    )
    .with_parent(outcome.id.clone())
    .with_confidence((1.0 - error.min(1.0)).max(0.0))];

    if error < CONFIRMATION_TOLERANCE {
        emitted.push(
            Event::internal(
                PREDICTION_SOURCE,
                names::EXPECTATION_CONFIRMED,
                payload(json!({ "expected": expected, "observed": observed })),
            )
            .with_parent(outcome.id.clone())
            .with_confidence(1.0),
        );
    }

    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Payload;

    fn move_action(dx: i64, dy: i64) -> Event {
        Event::action("agent", names::MOVE, payload(json!({ "dx": dx, "dy": dy })))
    }

    fn outcome(dx: i64, dy: i64) -> Event {
        Event::outcome(
            "world",
            names::MOVE_OK,
            payload(json!({ "ok": true, "dx": dx, "dy": dy, "position": [1, 1] })),
        )
    }

    #[test]
    fn matching_outcome_confirms() {
        let mut engine = PredictionEngine::new();
        let emitted = engine.observe(&[move_action(1, 0), outcome(1, 0)]);

        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].name, names::PREDICTION_ERROR);
        assert_eq!(emitted[0].payload_f64("error"), Some(0.0));
        assert_eq!(emitted[0].confidence, Some(1.0));
        assert_eq!(emitted[1].name, names::EXPECTATION_CONFIRMED);
        assert_eq!(emitted[1].payload["observed"]["position"], json!([1, 1]));
        assert!(engine.pending().is_none());
    }

    #[test]
    fn blocked_outcome_reports_error_without_confirmation() {
        let mut engine = PredictionEngine::new();
        let emitted = engine.observe(&[move_action(1, 0), outcome(0, 0)]);

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].payload_f64("error"), Some(1.0));
        assert_eq!(emitted[0].confidence, Some(0.0));
    }

    #[test]
    fn outcome_without_pending_expectation_is_ignored() {
        let mut engine = PredictionEngine::new();
        assert!(engine.observe(&[outcome(1, 0)]).is_empty());
    }

    #[test]
    fn expectation_resolves_only_once() {
        let mut engine = PredictionEngine::new();
        let emitted = engine.observe(&[move_action(0, 1), outcome(0, 1), outcome(0, 1)]);
        assert_eq!(emitted.len(), 2);
    }

    #[test]
    fn second_action_replaces_pending_expectation() {
        let mut engine = PredictionEngine::new();
        let emitted = engine.observe(&[move_action(1, 0), move_action(0, 1), outcome(0, 1)]);
        assert_eq!(emitted[0].payload_f64("error"), Some(0.0));
    }

    #[test]
    fn unrecognized_action_expects_nothing() {
        let mut engine = PredictionEngine::new();
        let wave = Event::action("user", "wave", Payload::new());
        let emitted = engine.observe(&[wave, outcome(3, 3)]);
        assert_eq!(emitted[0].payload_f64("error"), Some(0.0));
        assert_eq!(emitted[0].payload["expected"], json!({}));
    }

    #[test]
    fn missing_observed_keys_count_as_zero() {
        let expected = Expectation::from([("dx".to_string(), -1.0), ("dy".to_string(), 0.5)]);
        let observed = Event::outcome("world", "x", Payload::new());
        assert!((prediction_error(&expected, &observed) - 1.5).abs() < 1e-12);
    }
}

//! Structural typing of raw events into percepts.
//!
//! Percepts carry no labels or inference; each one is a reshaped copy of the
//! event fields that matter for its kind.

use contracts::{names, payload, Event, EventKind, GridPos, Percept, PerceptKind};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default)]
pub struct PerceptionEngine {
    last_position: Option<GridPos>,
}

impl PerceptionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last position reported by a `position` observation.
    pub fn last_position(&self) -> Option<GridPos> {
        self.last_position
    }

    pub fn process(&mut self, events: &[Event]) -> Vec<Percept> {
        events
            .iter()
            .filter_map(|event| match event.kind {
                EventKind::Observation => Some(self.from_observation(event)),
                EventKind::Outcome => Some(from_outcome(event)),
                _ => None,
            })
            .collect()
    }

    fn from_observation(&mut self, event: &Event) -> Percept {
        let field = |key: &str| event.payload.get(key).cloned().unwrap_or(Value::Null);

        let (kind, body) = match event.name.as_str() {
            names::POSITION => match GridPos::from_value(&Value::Object(event.payload.clone())) {
                Some(at) => {
                    self.last_position = Some(at);
                    (PerceptKind::Position, at.to_object())
                }
                None => unknown(event),
            },
            names::COLLISION => (
                PerceptKind::Contact,
                json!({ "object_id": field("object_id"), "at": field("at") }),
            ),
            names::BOUNDARY_CONTACT => (
                PerceptKind::Boundary,
                json!({ "from": field("from"), "attempt": field("attempt") }),
            ),
            _ => unknown(event),
        };

        Percept {
            kind,
            source_event_id: event.id.clone(),
            payload: payload(body),
        }
    }
}

fn unknown(event: &Event) -> (PerceptKind, Value) {
    (
        PerceptKind::Unknown,
        json!({ "name": event.name, "payload": event.payload }),
    )
}

fn from_outcome(event: &Event) -> Percept {
    let field = |key: &str| event.payload.get(key).cloned().unwrap_or(Value::Null);
    Percept {
        kind: PerceptKind::ActionResult,
        source_event_id: event.id.clone(),
        payload: payload(json!({
            "ok": field("ok"),
            "reason": field("reason"),
            "parent_id": event.parent_id,
            "name": event.name,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Payload;

    #[test]
    fn position_observation_updates_last_position() {
        let mut engine = PerceptionEngine::new();
        let event = Event::observation("world", names::POSITION, payload(json!({ "x": 2, "y": 3 })));
        let percepts = engine.process(&[event.clone()]);

        assert_eq!(percepts.len(), 1);
        assert_eq!(percepts[0].kind, PerceptKind::Position);
        assert_eq!(percepts[0].source_event_id, event.id);
        assert_eq!(engine.last_position(), Some(GridPos::new(2, 3)));
    }

    #[test]
    fn malformed_position_is_unknown() {
        let mut engine = PerceptionEngine::new();
        let event = Event::observation("world", names::POSITION, payload(json!({ "x": "a" })));
        let percepts = engine.process(&[event]);
        assert_eq!(percepts[0].kind, PerceptKind::Unknown);
        assert!(engine.last_position().is_none());
    }

    #[test]
    fn contact_boundary_and_results_are_typed() {
        let mut engine = PerceptionEngine::new();
        let events = vec![
            Event::observation(
                "world",
                names::COLLISION,
                payload(json!({ "object_id": "object:1:1", "at": [1, 1] })),
            ),
            Event::observation(
                "world",
                names::BOUNDARY_CONTACT,
                payload(json!({ "from": [0, 0], "attempt": [-1, 0] })),
            ),
            Event::outcome("world", names::MOVE_BLOCKED, payload(json!({ "ok": false, "reason": "collision" })))
                .with_parent("a-1"),
            Event::internal("regulator", names::STATE_UPDATE, Payload::new()),
            Event::observation("user", names::UTTERANCE, payload(json!({ "text": "hi" }))),
        ];

        let kinds: Vec<_> = engine.process(&events).into_iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PerceptKind::Contact,
                PerceptKind::Boundary,
                PerceptKind::ActionResult,
                PerceptKind::Unknown,
            ]
        );

        let result = &engine.process(&events[2..3])[0];
        assert_eq!(result.payload["parent_id"], json!("a-1"));
        assert_eq!(result.payload["reason"], json!("collision"));
    }
}

//! Autonomous agent: a minimal decision shell biased by the regulator's last
//! published state.
//!
//! The agent never plans or sets goals. Each decision either rests, waits, or
//! picks one unit move, avoiding a move that just failed.

use contracts::{names, payload, Event, EventKind, StateUpdate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::json;
use tracing::debug;

pub const AGENT_SOURCE: &str = "agent";

const UNIT_MOVES: [(i64, i64); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

const REST_AROUSAL: f64 = 0.75;
const WAIT_CURIOSITY: f64 = 0.15;
const WAIT_CONFIDENCE: f64 = 0.2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentState {
    pub last_action_failed: bool,
    pub last_move: Option<(i64, i64)>,
    pub steps_since_action: u64,
}

#[derive(Debug, Clone)]
pub struct AutonomousAgent {
    state: AgentState,
    rng: StdRng,
}

impl AutonomousAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            state: AgentState::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    /// Next action, if any. Without a published regulator state the agent
    /// does nothing.
    pub fn decide(&mut self, recent: &[Event]) -> Option<Event> {
        let state = StateUpdate::latest(recent)?.state;

        if state.arousal > REST_AROUSAL {
            self.state.steps_since_action += 1;
            debug!(arousal = state.arousal, "agent resting");
            return None;
        }
        if state.curiosity < WAIT_CURIOSITY && state.confidence < WAIT_CONFIDENCE {
            self.state.steps_since_action += 1;
            debug!(
                curiosity = state.curiosity,
                confidence = state.confidence,
                "agent waiting"
            );
            return None;
        }

        let candidates: Vec<(i64, i64)> = UNIT_MOVES
            .iter()
            .copied()
            .filter(|step| !(self.state.last_action_failed && self.state.last_move == Some(*step)))
            .collect();
        let (dx, dy) = *candidates.choose(&mut self.rng)?;

        self.state.last_move = Some((dx, dy));
        self.state.steps_since_action = 0;
        Some(Event::action(
            AGENT_SOURCE,
            names::MOVE,
            payload(json!({ "dx": dx, "dy": dy })),
        ))
    }

    /// Reads the most recent Outcome that answers an action.
    pub fn observe_outcomes(&mut self, recent: &[Event]) {
        let latest = recent
            .iter()
            .rev()
            .find(|event| event.kind == EventKind::Outcome && event.parent_id.is_some());

        if let Some(outcome) = latest {
            match outcome.payload_bool("ok") {
                Some(false) => self.state.last_action_failed = true,
                Some(true) => self.state.last_action_failed = false,
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{to_payload, RegulatorSnapshot};

    fn published(arousal: f64, confidence: f64, curiosity: f64) -> Event {
        let state = RegulatorSnapshot {
            arousal,
            valence: 0.0,
            confidence,
            confidence_floor: 0.05,
            uncertainty: 0.5,
            curiosity,
        };
        let update = StateUpdate {
            cycles: 1,
            stagnation: false,
            delta: state.delta_from(&state),
            state,
            signal: None,
        };
        Event::internal("regulator", names::STATE_UPDATE, to_payload(&update).unwrap())
    }

    fn outcome(ok: bool) -> Event {
        Event::outcome("world", "move", payload(json!({ "ok": ok }))).with_parent("a")
    }

    #[test]
    fn no_state_no_action() {
        let mut agent = AutonomousAgent::new(7);
        assert!(agent.decide(&[]).is_none());
        assert_eq!(agent.state().steps_since_action, 0);
    }

    #[test]
    fn high_arousal_rests() {
        let mut agent = AutonomousAgent::new(7);
        assert!(agent.decide(&[published(0.8, 0.5, 0.5)]).is_none());
        assert_eq!(agent.state().steps_since_action, 1);
    }

    #[test]
    fn low_curiosity_and_confidence_waits() {
        let mut agent = AutonomousAgent::new(7);
        assert!(agent.decide(&[published(0.2, 0.1, 0.1)]).is_none());
    }

    #[test]
    fn picks_a_unit_move() {
        let mut agent = AutonomousAgent::new(7);
        let action = agent.decide(&[published(0.2, 0.5, 0.5)]).unwrap();
        assert_eq!(action.kind, EventKind::Action);
        assert_eq!(action.name, names::MOVE);

        let dx = action.payload["dx"].as_i64().unwrap();
        let dy = action.payload["dy"].as_i64().unwrap();
        assert_eq!(dx.abs() + dy.abs(), 1);
        assert_eq!(agent.state().last_move, Some((dx, dy)));
    }

    #[test]
    fn failed_move_is_not_repeated() {
        let mut agent = AutonomousAgent::new(11);
        let recent = [published(0.2, 0.5, 0.5)];
        for _ in 0..50 {
            let before = agent.decide(&recent).unwrap();
            agent.observe_outcomes(&[outcome(false)]);
            let after = agent.decide(&recent).unwrap();
            assert_ne!(before.payload, after.payload);
        }
    }

    #[test]
    fn same_seed_same_choices() {
        let recent = [published(0.2, 0.5, 0.5)];
        let mut a = AutonomousAgent::new(99);
        let mut b = AutonomousAgent::new(99);
        for _ in 0..10 {
            assert_eq!(
                a.decide(&recent).unwrap().payload,
                b.decide(&recent).unwrap().payload
            );
        }
    }

    #[test]
    fn outcome_tracking_follows_latest_linked_outcome() {
        let mut agent = AutonomousAgent::new(1);
        agent.observe_outcomes(&[outcome(false)]);
        assert!(agent.state().last_action_failed);
        agent.observe_outcomes(&[outcome(false), outcome(true)]);
        assert!(!agent.state().last_action_failed);

        let unlinked = Event::outcome("world", "move", payload(json!({ "ok": false })));
        agent.observe_outcomes(&[outcome(true), unlinked]);
        assert!(!agent.state().last_action_failed);
    }
}

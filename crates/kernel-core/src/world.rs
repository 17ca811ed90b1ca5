//! Objective grid world: bounds, solid objects, one agent body.
//!
//! The world knows only action names and payloads. It emits observations and
//! outcomes and never reads regulator or cognition state.

use std::collections::BTreeMap;

use contracts::{names, payload, Event, GridPos, WorldObjectRef, WorldSnapshot};
use serde_json::{json, Value};
use tracing::trace;

pub const WORLD_SOURCE: &str = "world";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldObject {
    pub object_id: String,
    pub solid: bool,
}

#[derive(Debug, Clone)]
pub struct GridWorld {
    width: i64,
    height: i64,
    objects: BTreeMap<GridPos, WorldObject>,
    agent: Option<GridPos>,
}

impl GridWorld {
    pub fn new(width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            objects: BTreeMap::new(),
            agent: None,
        }
    }

    pub fn size(&self) -> (i64, i64) {
        (self.width, self.height)
    }

    pub fn agent(&self) -> Option<GridPos> {
        self.agent
    }

    pub fn spawn_agent(&mut self, x: i64, y: i64) -> Vec<Event> {
        let at = GridPos::new(x, y);
        self.agent = Some(at);
        vec![Event::observation(
            WORLD_SOURCE,
            names::AGENT_SPAWNED,
            payload(at.to_object()),
        )]
    }

    pub fn add_object(&mut self, x: i64, y: i64, solid: bool) {
        let at = GridPos::new(x, y);
        self.objects.insert(
            at,
            WorldObject {
                object_id: format!("object:{x}:{y}"),
                solid,
            },
        );
    }

    pub fn in_bounds(&self, at: GridPos) -> bool {
        (0..self.width).contains(&at.x) && (0..self.height).contains(&at.y)
    }

    /// Applies one Action. Without a spawned agent nothing happens.
    pub fn step(&mut self, action: &Event) -> Vec<Event> {
        let Some(from) = self.agent else {
            return Vec::new();
        };

        if action.name != names::MOVE {
            return vec![Event::outcome(
                WORLD_SOURCE,
                names::UNKNOWN_ACTION,
                payload(json!({ "ok": false, "reason": "unrecognized_action" })),
            )
            .with_parent(action.id.clone())];
        }

        let dx = displacement(action.payload.get("dx"));
        let dy = displacement(action.payload.get("dy"));
        let target = from.checked_offset(dx, dy);
        trace!(%from, dx, dy, "move attempt");

        let Some(target) = target.filter(|at| self.in_bounds(*at)) else {
            let attempt = target.map(GridPos::to_pair).unwrap_or_else(|| {
                json!([from.x.saturating_add(dx), from.y.saturating_add(dy)])
            });
            return vec![
                Event::observation(
                    WORLD_SOURCE,
                    names::BOUNDARY_CONTACT,
                    payload(json!({ "from": from.to_pair(), "attempt": attempt })),
                ),
                blocked(action, from, "out_of_bounds"),
            ];
        };

        if let Some(object) = self.objects.get(&target).filter(|object| object.solid) {
            return vec![
                Event::observation(
                    WORLD_SOURCE,
                    names::COLLISION,
                    payload(json!({ "object_id": object.object_id, "at": target.to_pair() })),
                ),
                blocked(action, from, "collision"),
            ];
        }

        self.agent = Some(target);
        vec![
            Event::observation(WORLD_SOURCE, names::POSITION, payload(target.to_object())),
            Event::outcome(
                WORLD_SOURCE,
                names::MOVE_OK,
                payload(json!({ "ok": true, "dx": dx, "dy": dy })),
            )
            .with_parent(action.id.clone()),
        ]
    }

    /// Debug view; nothing in the pipeline reads it.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            agent: self.agent,
            objects: self
                .objects
                .iter()
                .map(|(at, object)| WorldObjectRef {
                    object_id: object.object_id.clone(),
                    at: *at,
                    solid: object.solid,
                })
                .collect(),
            size: (self.width, self.height),
        }
    }
}

/// Blocked moves realize no displacement and report where the agent stands.
fn blocked(action: &Event, at: GridPos, reason: &str) -> Event {
    Event::outcome(
        WORLD_SOURCE,
        names::MOVE_BLOCKED,
        payload(json!({
            "ok": false,
            "reason": reason,
            "dx": 0,
            "dy": 0,
            "position": at.to_pair(),
        })),
    )
    .with_parent(action.id.clone())
}

fn displacement(value: Option<&Value>) -> i64 {
    value
        .and_then(|raw| raw.as_i64().or_else(|| raw.as_f64().map(|f| f as i64)))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EventKind, Payload};

    fn move_by(dx: i64, dy: i64) -> Event {
        Event::action("user", names::MOVE, payload(json!({ "dx": dx, "dy": dy })))
    }

    #[test]
    fn no_agent_means_no_events() {
        let mut world = GridWorld::new(5, 5);
        assert!(world.step(&move_by(1, 0)).is_empty());
    }

    #[test]
    fn successful_move_emits_position_and_ok() {
        let mut world = GridWorld::new(5, 5);
        world.spawn_agent(2, 2);
        let action = move_by(1, 0);
        let events = world.step(&action);

        assert_eq!(events.len(), 2);
        assert!(events[0].is(EventKind::Observation, names::POSITION));
        assert_eq!(events[0].payload["x"], json!(3));
        assert!(events[1].is(EventKind::Outcome, names::MOVE_OK));
        assert_eq!(events[1].parent_id.as_deref(), Some(action.id.as_str()));
        assert_eq!(events[1].payload["dx"], json!(1));
        assert!(!events[1].payload.contains_key("position"));
        assert_eq!(world.agent(), Some(GridPos::new(3, 2)));
    }

    #[test]
    fn out_of_bounds_is_blocked() {
        let mut world = GridWorld::new(5, 5);
        world.spawn_agent(4, 0);
        let events = world.step(&move_by(1, 0));

        assert!(events[0].is(EventKind::Observation, names::BOUNDARY_CONTACT));
        assert_eq!(events[0].payload["attempt"], json!([5, 0]));
        assert_eq!(events[1].name, names::MOVE_BLOCKED);
        assert_eq!(events[1].payload["reason"], json!("out_of_bounds"));
        assert_eq!(events[1].payload["position"], json!([4, 0]));
        assert_eq!(world.agent(), Some(GridPos::new(4, 0)));
    }

    #[test]
    fn overflowing_move_is_out_of_bounds() {
        let mut world = GridWorld::new(5, 5);
        world.spawn_agent(2, 2);
        let events = world.step(&move_by(i64::MAX, 0));

        assert_eq!(events.len(), 2);
        assert!(events[0].is(EventKind::Observation, names::BOUNDARY_CONTACT));
        assert_eq!(events[0].payload["attempt"], json!([i64::MAX, 2]));
        assert_eq!(events[1].name, names::MOVE_BLOCKED);
        assert_eq!(events[1].payload["reason"], json!("out_of_bounds"));
        assert_eq!(events[1].payload["position"], json!([2, 2]));

        let huge_float = Event::action(
            "user",
            names::MOVE,
            payload(json!({ "dx": 0, "dy": -1e300 })),
        );
        let events = world.step(&huge_float);
        assert_eq!(events[1].payload["reason"], json!("out_of_bounds"));
        assert_eq!(world.agent(), Some(GridPos::new(2, 2)));
    }

    #[test]
    fn solid_objects_block_and_soft_ones_do_not() {
        let mut world = GridWorld::new(5, 5);
        world.spawn_agent(0, 0);
        world.add_object(1, 0, true);
        world.add_object(0, 1, false);

        let blocked = world.step(&move_by(1, 0));
        assert!(blocked[0].is(EventKind::Observation, names::COLLISION));
        assert_eq!(blocked[0].payload["object_id"], json!("object:1:0"));
        assert_eq!(blocked[1].payload["reason"], json!("collision"));

        let passed = world.step(&move_by(0, 1));
        assert_eq!(passed[1].name, names::MOVE_OK);
        assert_eq!(world.agent(), Some(GridPos::new(0, 1)));
    }

    #[test]
    fn unknown_action_fails_with_reason() {
        let mut world = GridWorld::new(5, 5);
        world.spawn_agent(0, 0);
        let wave = Event::action("user", "wave", Payload::new());
        let events = world.step(&wave);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, names::UNKNOWN_ACTION);
        assert_eq!(events[0].payload_bool("ok"), Some(false));
    }

    #[test]
    fn snapshot_lists_objects() {
        let mut world = GridWorld::new(3, 4);
        world.add_object(1, 1, true);
        let snapshot = world.snapshot();
        assert_eq!(snapshot.size, (3, 4));
        assert!(snapshot.agent.is_none());
        assert_eq!(snapshot.objects.len(), 1);
    }
}

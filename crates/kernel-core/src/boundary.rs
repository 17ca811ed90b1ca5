//! Counts mismatches per location and reports a boundary once.

use std::collections::BTreeMap;

use contracts::{names, payload, Event, EventKind, GridPos};
use serde_json::json;

use crate::preference::observed_position;

pub const BOUNDARY_SOURCE: &str = "boundary";

#[derive(Debug, Clone)]
pub struct BoundaryDetector {
    threshold: u32,
    hits: BTreeMap<GridPos, u32>,
}

impl Default for BoundaryDetector {
    fn default() -> Self {
        Self::new(2)
    }
}

impl BoundaryDetector {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            hits: BTreeMap::new(),
        }
    }

    pub fn hits(&self, at: GridPos) -> u32 {
        self.hits.get(&at).copied().unwrap_or(0)
    }

    /// Emits `boundary_detected` exactly when a location's count reaches
    /// the threshold; later hits only increment.
    pub fn observe(&mut self, events: &[Event]) -> Vec<Event> {
        let mut emitted = Vec::new();

        for event in events {
            if !event.is(EventKind::Internal, names::PREDICTION_ERROR) {
                continue;
            }
            let Some(at) = observed_position(event) else {
                continue;
            };

            let hits = self.hits.entry(at).or_insert(0);
            *hits += 1;
            if *hits == self.threshold {
                emitted.push(
                    Event::internal(
                        BOUNDARY_SOURCE,
                        names::BOUNDARY_DETECTED,
                        payload(json!({ "position": at.to_object(), "hits": *hits })),
                    )
                    .with_parent(event.id.clone())
                    .with_confidence(1.0),
                );
            }
        }

        emitted
    }
}

//! Optional learning stage: prediction feeds preference and boundary.

use contracts::{Event, GridPos};

use crate::boundary::BoundaryDetector;
use crate::prediction::PredictionEngine;
use crate::preference::PreferenceEngine;

#[derive(Debug, Clone, Default)]
pub struct CognitionPipeline {
    prediction: PredictionEngine,
    preference: PreferenceEngine,
    boundary: BoundaryDetector,
}

impl CognitionPipeline {
    pub fn new(learning_rate: f64, boundary_threshold: u32) -> Self {
        Self {
            prediction: PredictionEngine::new(),
            preference: PreferenceEngine::new(learning_rate),
            boundary: BoundaryDetector::new(boundary_threshold),
        }
    }

    /// Feeds external events through prediction, then routes the prediction
    /// results to preference and boundary. Returns everything produced, in
    /// that order.
    pub fn observe(&mut self, events: &[Event]) -> Vec<Event> {
        let predictions = self.prediction.observe(events);
        if predictions.is_empty() {
            return predictions;
        }

        let preferences = self.preference.observe(&predictions);
        let boundaries = self.boundary.observe(&predictions);

        let mut emitted = predictions;
        emitted.extend(preferences);
        emitted.extend(boundaries);
        emitted
    }

    pub fn preference(&self) -> &PreferenceEngine {
        &self.preference
    }

    pub fn boundary_hits(&self, at: GridPos) -> u32 {
        self.boundary.hits(at)
    }
}

//! Read-only advisory reports derived from a window of the log.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stability report. Regulatory fields are `None` when no `state_update`
/// was found in the analyzed window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthSnapshot {
    pub event_count: usize,
    pub arousal: Option<f64>,
    pub confidence: Option<f64>,
    pub confidence_floor: Option<f64>,
    pub uncertainty: Option<f64>,
    pub curiosity: Option<f64>,
    pub zeno_risk: f64,
    pub burnout_risk: f64,
    pub stagnation_risk: f64,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Stable,
    Crowding,
    Transition,
    Stagnant,
}

impl PhaseState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Crowding => "crowding",
            Self::Transition => "transition",
            Self::Stagnant => "stagnant",
        }
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structure/load report over event-type densities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseSnapshot {
    pub event_count: usize,
    pub internal_density: f64,
    pub action_density: f64,
    pub observation_density: f64,
    pub clustering: f64,
    pub volatility: f64,
    pub coherence: f64,
    pub phase_state: PhaseState,
    pub notes: Vec<String>,
}

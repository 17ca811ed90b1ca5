//! Event-sourced regulation core.
//!
//! Everything here reads from or appends to an [`EventLog`]. The background
//! regulator is the only component with cross-step numeric state that drives
//! warnings; cognition engines learn from prediction results; the analyzers
//! are pure functions over a window of recent events.

pub mod agent;
pub mod boundary;
pub mod cognition;
pub mod error;
pub mod health;
pub mod memory;
pub mod perception;
pub mod phase;
pub mod prediction;
pub mod preference;
pub mod regulator;
pub mod signal;
pub mod world;

pub use agent::{AgentState, AutonomousAgent};
pub use boundary::BoundaryDetector;
pub use cognition::CognitionPipeline;
pub use error::LogError;
pub use health::analyze_health;
pub use memory::{EventLog, InMemoryEventLog};
pub use perception::PerceptionEngine;
pub use phase::analyze_phase;
pub use prediction::PredictionEngine;
pub use preference::PreferenceEngine;
pub use regulator::{BackgroundRegulator, CycleKind, RegulatorConfig, RegulatorState};
pub use signal::extract_signal;
pub use world::GridWorld;

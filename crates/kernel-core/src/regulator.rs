//! Background regulator: a bounded internal state driven only by how much
//! new log activity appeared since the last step.
//!
//! The regulator never interprets event meaning. It reads counts, updates a
//! small vector of clamped scalars, and appends Internal/System events that
//! describe what it did.

use contracts::{
    names, payload, to_payload, Event, LightTick, LoggedEvent, RegulatorSnapshot, Signal,
    StateUpdate,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::LogError;
use crate::memory::EventLog;
use crate::signal::extract_signal;

pub const REGULATOR_SOURCE: &str = "regulator";

const LIGHT_AROUSAL_SCALE: f64 = 0.5;
const LIGHT_EXPERIENCE_SCALE: f64 = 0.25;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegulatorConfig {
    pub arousal_min: f64,
    pub arousal_max: f64,
    pub valence_min: f64,
    pub valence_max: f64,
    pub confidence_min: f64,
    pub confidence_max: f64,
    pub uncertainty_min: f64,
    pub uncertainty_max: f64,
    pub curiosity_min: f64,
    pub curiosity_max: f64,

    pub arousal_decay: f64,
    pub uncertainty_decay_on_experience: f64,
    pub curiosity_rise_on_stagnation: f64,
    pub curiosity_decay_on_novelty: f64,

    pub arousal_bump_on_observation: f64,
    pub arousal_bump_on_failure: f64,
    pub confidence_drop_on_failure: f64,
    pub confidence_rise_on_success: f64,
    pub uncertainty_rise_on_failure: f64,

    pub uncertainty_creep_on_stagnation: f64,
    pub confidence_relax_on_stagnation: f64,
    pub confidence_relax_on_light_tick: f64,

    pub confidence_floor_rise_on_recovery: f64,
    pub confidence_floor_max: f64,

    /// New events required before a full experience cycle runs.
    pub cycle_event_threshold: usize,
    /// At or below this many new events a stagnation cycle runs.
    pub stagnation_event_threshold: usize,

    pub high_arousal_threshold: f64,
    pub low_recovery_threshold: f64,
    pub high_arousal_cycle_limit: u32,
    pub low_recovery_cycle_limit: u32,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            arousal_min: 0.02,
            arousal_max: 1.0,
            valence_min: -1.0,
            valence_max: 1.0,
            confidence_min: 0.02,
            confidence_max: 1.0,
            uncertainty_min: 0.0,
            uncertainty_max: 1.0,
            curiosity_min: 0.0,
            curiosity_max: 1.0,

            arousal_decay: 0.03,
            uncertainty_decay_on_experience: 0.02,
            curiosity_rise_on_stagnation: 0.03,
            curiosity_decay_on_novelty: 0.02,

            arousal_bump_on_observation: 0.015,
            arousal_bump_on_failure: 0.06,
            confidence_drop_on_failure: 0.04,
            confidence_rise_on_success: 0.02,
            uncertainty_rise_on_failure: 0.03,

            uncertainty_creep_on_stagnation: 0.01,
            confidence_relax_on_stagnation: 0.01,
            confidence_relax_on_light_tick: 0.005,

            confidence_floor_rise_on_recovery: 0.01,
            confidence_floor_max: 0.60,

            cycle_event_threshold: 10,
            stagnation_event_threshold: 0,

            high_arousal_threshold: 0.85,
            low_recovery_threshold: 0.12,
            high_arousal_cycle_limit: 6,
            low_recovery_cycle_limit: 8,
        }
    }
}

/// Which update a step performs, chosen purely from the new-event count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    Experience,
    Stagnation,
    LightTick,
}

impl RegulatorConfig {
    pub fn select_cycle(&self, new_count: usize) -> CycleKind {
        if new_count >= self.cycle_event_threshold {
            CycleKind::Experience
        } else if new_count <= self.stagnation_event_threshold {
            CycleKind::Stagnation
        } else {
            CycleKind::LightTick
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RegulatorState {
    pub arousal: f64,
    pub valence: f64,
    pub confidence: f64,
    pub confidence_floor: f64,
    pub uncertainty: f64,
    pub curiosity: f64,

    /// Highest sequence number already consumed.
    pub last_seen_seq: u64,
    /// Completed full cycles. Light ticks do not count.
    pub cycles: u64,
    pub consecutive_high_arousal_cycles: u32,
    pub consecutive_low_recovery_cycles: u32,
}

impl Default for RegulatorState {
    fn default() -> Self {
        Self {
            arousal: 0.15,
            valence: 0.0,
            confidence: 0.10,
            confidence_floor: 0.05,
            uncertainty: 0.85,
            curiosity: 0.25,
            last_seen_seq: 0,
            cycles: 0,
            consecutive_high_arousal_cycles: 0,
            consecutive_low_recovery_cycles: 0,
        }
    }
}

impl RegulatorState {
    pub fn snapshot(&self) -> RegulatorSnapshot {
        RegulatorSnapshot {
            arousal: self.arousal,
            valence: self.valence,
            confidence: self.confidence,
            confidence_floor: self.confidence_floor,
            uncertainty: self.uncertainty,
            curiosity: self.curiosity,
        }
    }

    fn clamp_to(&mut self, config: &RegulatorConfig) {
        self.arousal = self.arousal.clamp(config.arousal_min, config.arousal_max);
        self.valence = self.valence.clamp(config.valence_min, config.valence_max);
        self.confidence = self
            .confidence
            .clamp(config.confidence_min, config.confidence_max);
        self.uncertainty = self
            .uncertainty
            .clamp(config.uncertainty_min, config.uncertainty_max);
        self.curiosity = self
            .curiosity
            .clamp(config.curiosity_min, config.curiosity_max);
        self.confidence_floor = self
            .confidence_floor
            .clamp(0.0, config.confidence_floor_max);
    }
}

// ---------------------------------------------------------------------------
// Regulator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BackgroundRegulator {
    config: RegulatorConfig,
    state: RegulatorState,
}

impl BackgroundRegulator {
    /// Fresh regulator whose cursor starts before the first record.
    pub fn new(config: RegulatorConfig) -> Self {
        Self::with_state(config, RegulatorState::default())
    }

    pub fn with_state(config: RegulatorConfig, state: RegulatorState) -> Self {
        Self { config, state }
    }

    /// Fresh regulator positioned at the current tail of `log`; history that
    /// predates the attach is not replayed.
    pub fn attach<L: EventLog + ?Sized>(log: &L, config: RegulatorConfig) -> Result<Self, LogError> {
        let mut regulator = Self::new(config);
        regulator.state.last_seen_seq = log.last_seq()?;
        Ok(regulator)
    }

    pub fn config(&self) -> &RegulatorConfig {
        &self.config
    }

    pub fn state(&self) -> &RegulatorState {
        &self.state
    }

    pub fn snapshot(&self) -> RegulatorSnapshot {
        self.state.snapshot()
    }

    /// Reads everything new in `log`, runs one cycle, and appends what the
    /// cycle emitted. Returns the emitted events.
    pub fn step<L: EventLog + ?Sized>(&mut self, log: &mut L) -> Result<Vec<Event>, LogError> {
        let batch = log.iter_since(self.state.last_seen_seq)?;
        let emitted = self.process(&batch)?;
        if !emitted.is_empty() {
            log.append_many(&emitted)?;
        }
        Ok(emitted)
    }

    /// Runs one cycle over an already-read batch and advances the cursor.
    /// Nothing is written; the caller persists the returned events.
    pub fn process(&mut self, batch: &[LoggedEvent]) -> Result<Vec<Event>, LogError> {
        let new_count = batch.len();
        let kind = self.config.select_cycle(new_count);
        debug!(
            new_count,
            ?kind,
            last_seen_seq = self.state.last_seen_seq,
            "regulator step"
        );

        let emitted = match kind {
            CycleKind::Experience => {
                let signal = extract_signal(batch.iter().map(|logged| &logged.event));
                self.full_cycle(Some(signal))?
            }
            CycleKind::Stagnation => self.full_cycle(None)?,
            CycleKind::LightTick => self.light_tick(new_count)?,
        };

        if let Some(last) = batch.last() {
            self.state.last_seen_seq = self.state.last_seen_seq.max(last.seq);
        }
        Ok(emitted)
    }

    fn full_cycle(&mut self, signal: Option<Signal>) -> Result<Vec<Event>, LogError> {
        let prev = self.state.snapshot();

        match &signal {
            Some(signal) => self.apply_experience(signal),
            None => self.apply_stagnation(),
        }
        self.state.clamp_to(&self.config);
        self.apply_confidence_floor(&prev);

        let warnings = self.burnout_guard(&prev);

        let state = self.state.snapshot();
        let update = StateUpdate {
            cycles: self.state.cycles,
            stagnation: signal.is_none(),
            delta: state.delta_from(&prev),
            state,
            signal,
        };

        let mut emitted = Vec::with_capacity(1 + warnings.len());
        emitted.push(
            Event::internal(REGULATOR_SOURCE, names::STATE_UPDATE, to_payload(&update)?)
                .with_confidence(state.confidence),
        );
        emitted.extend(warnings);

        self.state.cycles += 1;
        Ok(emitted)
    }

    fn apply_experience(&mut self, signal: &Signal) {
        let cfg = &self.config;
        let state = &mut self.state;

        let observation_share = signal.observations as f64 / signal.new_total.max(1) as f64;
        state.arousal += cfg.arousal_bump_on_observation * observation_share;

        if signal.failure_rate > 0.0 {
            state.arousal += cfg.arousal_bump_on_failure * signal.failure_rate;
            state.confidence -= cfg.confidence_drop_on_failure * signal.failure_rate;
            state.uncertainty += cfg.uncertainty_rise_on_failure * signal.failure_rate;
        }

        let success_share = (1.0 - signal.failure_rate).max(0.0);
        state.confidence += cfg.confidence_rise_on_success * success_share;
        state.uncertainty -= cfg.uncertainty_decay_on_experience * success_share;

        state.curiosity -= cfg.curiosity_decay_on_novelty * signal.activity_ratio.min(1.0);
        state.arousal -= cfg.arousal_decay;
    }

    fn apply_stagnation(&mut self) {
        let cfg = &self.config;
        let state = &mut self.state;

        state.curiosity += cfg.curiosity_rise_on_stagnation;
        state.arousal -= cfg.arousal_decay;
        state.uncertainty += cfg.uncertainty_creep_on_stagnation;
        if state.confidence > state.confidence_floor {
            state.confidence -= cfg.confidence_relax_on_stagnation;
        }
    }

    /// Confidence never sits below the floor; the floor ratchets up on a
    /// calming, improving cycle and is pulled down only to stay at or below
    /// confidence.
    fn apply_confidence_floor(&mut self, prev: &RegulatorSnapshot) {
        let state = &mut self.state;

        if state.confidence < state.confidence_floor {
            state.confidence = state.confidence_floor;
        }

        if state.arousal < prev.arousal && state.confidence > prev.confidence {
            state.confidence_floor = (state.confidence_floor
                + self.config.confidence_floor_rise_on_recovery)
                .min(self.config.confidence_floor_max);
        }

        if state.confidence_floor > state.confidence {
            state.confidence_floor = state.confidence;
        }
    }

    fn burnout_guard(&mut self, prev: &RegulatorSnapshot) -> Vec<Event> {
        let cfg = &self.config;
        let state = &mut self.state;
        let mut warnings = Vec::new();

        if state.arousal >= cfg.high_arousal_threshold {
            state.consecutive_high_arousal_cycles += 1;
        } else {
            state.consecutive_high_arousal_cycles = 0;
        }

        let recovery = state.confidence - prev.confidence;
        if recovery < cfg.low_recovery_threshold && state.arousal >= prev.arousal {
            state.consecutive_low_recovery_cycles += 1;
        } else {
            state.consecutive_low_recovery_cycles = 0;
        }

        if state.consecutive_high_arousal_cycles >= cfg.high_arousal_cycle_limit {
            warn!(
                consecutive = state.consecutive_high_arousal_cycles,
                arousal = state.arousal,
                "arousal persistently high"
            );
            warnings.push(Event::system(
                REGULATOR_SOURCE,
                names::WARNING_HIGH_AROUSAL,
                payload(json!({
                    "cycles": state.cycles,
                    "consecutive": state.consecutive_high_arousal_cycles,
                    "arousal": state.arousal,
                    "confidence": state.confidence,
                    "uncertainty": state.uncertainty,
                })),
            ));
        }

        if state.consecutive_low_recovery_cycles >= cfg.low_recovery_cycle_limit {
            warn!(
                consecutive = state.consecutive_low_recovery_cycles,
                confidence = state.confidence,
                "confidence failing to recover"
            );
            warnings.push(Event::system(
                REGULATOR_SOURCE,
                names::WARNING_LOW_RECOVERY,
                payload(json!({
                    "cycles": state.cycles,
                    "consecutive": state.consecutive_low_recovery_cycles,
                    "arousal": state.arousal,
                    "confidence": state.confidence,
                    "confidence_floor": state.confidence_floor,
                })),
            ));
        }

        warnings
    }

    fn light_tick(&mut self, new_count: usize) -> Result<Vec<Event>, LogError> {
        let prev = self.state.snapshot();
        let cfg = &self.config;
        let state = &mut self.state;

        state.arousal -= cfg.arousal_decay * LIGHT_AROUSAL_SCALE;
        if new_count > 0 {
            state.uncertainty -= cfg.uncertainty_decay_on_experience * LIGHT_EXPERIENCE_SCALE;
            state.curiosity -= cfg.curiosity_decay_on_novelty * LIGHT_EXPERIENCE_SCALE;
        } else {
            state.curiosity += cfg.curiosity_rise_on_stagnation * LIGHT_EXPERIENCE_SCALE;
        }

        if state.confidence < state.confidence_floor {
            state.confidence = state.confidence_floor;
        } else {
            state.confidence -= cfg.confidence_relax_on_light_tick;
            if state.confidence < state.confidence_floor {
                state.confidence = state.confidence_floor;
            }
        }

        state.clamp_to(cfg);

        let state = self.state.snapshot();
        let confidence = state.confidence;
        let tick = LightTick {
            new_event_count: new_count,
            delta: state.delta_from(&prev),
            state,
        };
        Ok(vec![Event::internal(
            REGULATOR_SOURCE,
            names::LIGHT_TICK,
            to_payload(&tick)?,
        )
        .with_confidence(confidence)])
    }
}

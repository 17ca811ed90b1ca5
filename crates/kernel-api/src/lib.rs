//! In-process facade: SQLite event log, identity store, and the lifecycle
//! wiring that couples the world, regulator, cognition, and agent.

mod identity;
mod persistence;
mod server;

use contracts::{
    names, payload, Event, HealthSnapshot, IdentityRecord, Percept, PhaseSnapshot,
    RegulatorSnapshot, SystemConfig, WorldSnapshot,
};
use kernel_core::{
    analyze_health, analyze_phase, AutonomousAgent, BackgroundRegulator, CognitionPipeline,
    EventLog, GridWorld, LogError, PerceptionEngine, RegulatorConfig,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

pub use identity::{IdentityError, IdentityStore};
pub use persistence::{EventFilter, LogStats, ParentLinkReport, PersistenceError, SqliteEventLog};
pub use server::{serve, ServerError};

pub const BOOTSTRAP_SOURCE: &str = "bootstrap";
pub const USER_SOURCE: &str = "user";

/// Events the agent looks back over when deciding or reading outcomes.
const AGENT_LOOKBACK: usize = 20;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Everything one external call produced, plus fresh advisory reads.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub emitted: Vec<Event>,
    pub percepts: Vec<Percept>,
    pub health: HealthSnapshot,
    pub phase: PhaseSnapshot,
    pub identity: IdentityRecord,
    pub world: WorldSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    pub identity: IdentityRecord,
    pub world: WorldSnapshot,
    pub regulator: RegulatorSnapshot,
    pub health: HealthSnapshot,
    pub phase: PhaseSnapshot,
    pub last_seq: u64,
    pub autonomy: bool,
    pub cognition: bool,
}

/// Coupling layer only: owns every component and fixes the order in which
/// they see the log.
#[derive(Debug)]
pub struct SystemBootstrap {
    config: SystemConfig,
    identity: IdentityStore,
    log: SqliteEventLog,
    world: GridWorld,
    regulator: BackgroundRegulator,
    perception: PerceptionEngine,
    cognition: CognitionPipeline,
    agent: AutonomousAgent,
}

impl SystemBootstrap {
    pub fn open(config: SystemConfig) -> Result<Self, BootstrapError> {
        Self::open_with(config, RegulatorConfig::default())
    }

    pub fn open_with(
        config: SystemConfig,
        regulator_config: RegulatorConfig,
    ) -> Result<Self, BootstrapError> {
        let identity = IdentityStore::open(
            &config.identity_path,
            config.continuity_version,
            &config.creation_tag,
        )?;
        let mut log = SqliteEventLog::open(&config.memory_path)?;

        let (width, height) = config.world_size;
        let mut world = GridWorld::new(width, height);
        let regulator = BackgroundRegulator::attach(&log, regulator_config)?;

        let (spawn_x, spawn_y) = config.spawn_at;
        log.append_many(&world.spawn_agent(spawn_x, spawn_y))?;

        let record = identity.get()?;
        log.append(&Event::system(
            BOOTSTRAP_SOURCE,
            names::BOOT,
            payload(json!({
                "identity_id": record.identity_id,
                "genesis_id": record.genesis_id,
                "incarnation": record.incarnation,
            })),
        ))?;
        info!(
            identity_id = %record.identity_id,
            incarnation = record.incarnation,
            memory_path = %config.memory_path,
            "system booted"
        );

        Ok(Self {
            cognition: CognitionPipeline::new(config.learning_rate, config.boundary_threshold),
            agent: AutonomousAgent::new(config.agent_seed),
            perception: PerceptionEngine::new(),
            config,
            identity,
            log,
            world,
            regulator,
        })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn log(&self) -> &SqliteEventLog {
        &self.log
    }

    pub fn regulator(&self) -> &BackgroundRegulator {
        &self.regulator
    }

    pub fn cognition(&self) -> &CognitionPipeline {
        &self.cognition
    }

    pub fn set_autonomy(&mut self, enabled: bool) {
        self.config.enable_autonomy = enabled;
    }

    pub fn set_cognition(&mut self, enabled: bool) {
        self.config.enable_cognition = enabled;
    }

    /// User-issued move: action, world response, one regulator step, then
    /// optional cognition over the action and its consequences.
    pub fn apply_move(&mut self, dx: i64, dy: i64) -> Result<StepResult, BootstrapError> {
        let action = Event::action(
            USER_SOURCE,
            names::MOVE,
            payload(json!({ "dx": dx, "dy": dy })),
        );
        let mut emitted = self.act(action)?;

        emitted.extend(self.regulator.step(&mut self.log)?);
        self.observe_outcomes()?;
        let learned = self.learn(&emitted)?;
        emitted.extend(learned);

        self.bundle(emitted)
    }

    /// One background tick, optionally carrying a user utterance. With
    /// autonomy enabled the agent may act once, followed by a second
    /// regulator step.
    pub fn step(&mut self, text: Option<&str>) -> Result<StepResult, BootstrapError> {
        let mut emitted = Vec::new();

        if let Some(text) = text.filter(|text| !text.is_empty()) {
            let utterance = Event::observation(
                USER_SOURCE,
                names::UTTERANCE,
                payload(json!({ "text": text })),
            );
            self.log.append(&utterance)?;
            emitted.push(utterance);
        }

        emitted.extend(self.regulator.step(&mut self.log)?);
        self.observe_outcomes()?;

        if self.config.enable_autonomy {
            let recent = self.log.recent(AGENT_LOOKBACK)?;
            if let Some(action) = self.agent.decide(&recent) {
                let acted = self.act(action)?;
                let learned = self.learn(&acted)?;
                emitted.extend(acted);
                emitted.extend(self.regulator.step(&mut self.log)?);
                emitted.extend(learned);
            }
        }

        self.bundle(emitted)
    }

    pub fn snapshot(&self) -> Result<SystemSnapshot, BootstrapError> {
        let recent = self.log.recent(self.config.recent_window)?;
        Ok(SystemSnapshot {
            identity: self.identity.get()?.clone(),
            world: self.world.snapshot(),
            regulator: self.regulator.snapshot(),
            health: analyze_health(&recent),
            phase: analyze_phase(&recent),
            last_seq: self.log.last_seq()?,
            autonomy: self.config.enable_autonomy,
            cognition: self.config.enable_cognition,
        })
    }

    pub fn recent_events(&self, limit: usize) -> Result<Vec<Event>, BootstrapError> {
        Ok(self.log.recent(limit)?)
    }

    pub fn close(self) -> Result<(), BootstrapError> {
        info!(last_seq = self.log.last_seq()?, "system shutting down");
        self.log.close()?;
        Ok(())
    }

    /// Appends an action, steps the world, appends the world's response.
    fn act(&mut self, action: Event) -> Result<Vec<Event>, BootstrapError> {
        self.log.append(&action)?;
        let world_events = self.world.step(&action);
        self.log.append_many(&world_events)?;
        debug!(action = %action.summary(), responses = world_events.len(), "action applied");

        let mut emitted = Vec::with_capacity(1 + world_events.len());
        emitted.push(action);
        emitted.extend(world_events);
        Ok(emitted)
    }

    fn observe_outcomes(&mut self) -> Result<(), BootstrapError> {
        let recent = self.log.recent(AGENT_LOOKBACK)?;
        self.agent.observe_outcomes(&recent);
        Ok(())
    }

    fn learn(&mut self, events: &[Event]) -> Result<Vec<Event>, BootstrapError> {
        if !self.config.enable_cognition {
            return Ok(Vec::new());
        }
        let learned = self.cognition.observe(events);
        self.log.append_many(&learned)?;
        Ok(learned)
    }

    fn bundle(&mut self, emitted: Vec<Event>) -> Result<StepResult, BootstrapError> {
        let percepts = self.perception.process(&emitted);
        let recent = self.log.recent(self.config.recent_window)?;
        Ok(StepResult {
            emitted,
            percepts,
            health: analyze_health(&recent),
            phase: analyze_phase(&recent),
            identity: self.identity.get()?.clone(),
            world: self.world.snapshot(),
        })
    }
}

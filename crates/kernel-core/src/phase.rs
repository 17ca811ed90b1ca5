//! Structural read of a window: densities, clustering, volatility.

use contracts::{Event, EventKind, PhaseSnapshot, PhaseState};

const CLUSTERING_MIN_EVENTS: usize = 5;
const VOLATILITY_MIN_EVENTS: usize = 6;

pub fn analyze_phase(window: &[Event]) -> PhaseSnapshot {
    let n = window.len();
    if n == 0 {
        return PhaseSnapshot {
            event_count: 0,
            internal_density: 0.0,
            action_density: 0.0,
            observation_density: 0.0,
            clustering: 0.0,
            volatility: 0.0,
            coherence: 1.0,
            phase_state: PhaseState::Stagnant,
            notes: vec!["no_events".to_string()],
        };
    }

    let density = |kind: EventKind| {
        window.iter().filter(|event| event.kind == kind).count() as f64 / n as f64
    };
    let internal_density = density(EventKind::Internal);
    let action_density = density(EventKind::Action);
    let observation_density = density(EventKind::Observation);

    let clustering = internal_clustering(window);
    let volatility = kind_volatility(window);
    let coherence = (1.0 - 0.6 * volatility - 0.4 * internal_density).clamp(0.0, 1.0);

    let mut phase_state = PhaseState::Stable;
    let mut notes = Vec::new();

    if internal_density > 0.55 && clustering > 0.6 {
        phase_state = PhaseState::Crowding;
        notes.push("internal_crowding".to_string());
    }
    if volatility > 0.7 {
        phase_state = PhaseState::Transition;
        notes.push("high_volatility".to_string());
    }
    if action_density < 0.05 && observation_density < 0.05 {
        phase_state = PhaseState::Stagnant;
        notes.push("low_external_activity".to_string());
    }
    if coherence < 0.3 {
        notes.push("low_coherence".to_string());
    }

    PhaseSnapshot {
        event_count: n,
        internal_density,
        action_density,
        observation_density,
        clustering,
        volatility,
        coherence,
        phase_state,
        notes,
    }
}

/// Runs of two or more consecutive Internal events, per five events.
fn internal_clustering(window: &[Event]) -> f64 {
    if window.len() < CLUSTERING_MIN_EVENTS {
        return 0.0;
    }

    let mut runs = 0usize;
    let mut current = 0usize;
    for event in window {
        if event.kind == EventKind::Internal {
            current += 1;
        } else {
            if current >= 2 {
                runs += 1;
            }
            current = 0;
        }
    }
    if current >= 2 {
        runs += 1;
    }

    let scale = (window.len() as f64 / 5.0).max(1.0);
    (runs as f64 / scale).min(1.0)
}

/// Share of adjacent pairs whose kinds differ.
fn kind_volatility(window: &[Event]) -> f64 {
    if window.len() < VOLATILITY_MIN_EVENTS {
        return 0.0;
    }

    let flips = window
        .windows(2)
        .filter(|pair| pair[0].kind != pair[1].kind)
        .count();
    (flips as f64 / (window.len() - 1).max(1) as f64).min(1.0)
}

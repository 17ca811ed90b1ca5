//! Advisory risk scores over a window of recent events.

use contracts::{Event, EventKind, HealthSnapshot, StateUpdate};

const ZENO_MIN_INTERNAL: usize = 5;
const NOTE_THRESHOLD: f64 = 0.7;

/// Pure function of `window`; keeps no state between calls.
pub fn analyze_health(window: &[Event]) -> HealthSnapshot {
    let state = StateUpdate::latest(window).map(|update| update.state);

    let arousal = state.map(|s| s.arousal);
    let confidence = state.map(|s| s.confidence);
    let confidence_floor = state.map(|s| s.confidence_floor);
    let uncertainty = state.map(|s| s.uncertainty);
    let curiosity = state.map(|s| s.curiosity);

    let count = |kind: EventKind| window.iter().filter(|event| event.kind == kind).count();
    let internal = count(EventKind::Internal);
    let external = count(EventKind::Observation) + count(EventKind::Action);

    let zeno_risk = zeno_risk(arousal, confidence, internal, window.len());
    let burnout_risk = burnout_risk(arousal, confidence, confidence_floor);
    let stagnation_risk = match curiosity {
        Some(curiosity) if external == 0 && curiosity > 0.6 => curiosity.min(1.0),
        _ => 0.0,
    };

    let mut notes = Vec::new();
    if zeno_risk > NOTE_THRESHOLD {
        notes.push("elevated_zeno_risk".to_string());
    }
    if burnout_risk > NOTE_THRESHOLD {
        notes.push("elevated_burnout_risk".to_string());
    }
    if stagnation_risk > NOTE_THRESHOLD {
        notes.push("elevated_stagnation_risk".to_string());
    }

    HealthSnapshot {
        event_count: window.len(),
        arousal,
        confidence,
        confidence_floor,
        uncertainty,
        curiosity,
        zeno_risk,
        burnout_risk,
        stagnation_risk,
        notes,
    }
}

/// Self-observation dominating the window while agitated and unsure.
fn zeno_risk(arousal: Option<f64>, confidence: Option<f64>, internal: usize, total: usize) -> f64 {
    let (Some(arousal), Some(confidence)) = (arousal, confidence) else {
        return 0.0;
    };
    if internal < ZENO_MIN_INTERNAL {
        return 0.0;
    }

    let density = internal as f64 / total.max(1) as f64;
    let mut risk = 0.5 * density;
    if arousal > 0.8 && confidence < 0.25 {
        risk += 0.5;
    }
    risk.min(1.0)
}

fn burnout_risk(arousal: Option<f64>, confidence: Option<f64>, floor: Option<f64>) -> f64 {
    let mut risk = 0.0;
    if let Some(arousal) = arousal {
        if arousal > 0.85 {
            risk += 0.4;
        }
    }
    if let (Some(confidence), Some(floor)) = (confidence, floor) {
        if confidence < floor + 0.05 {
            risk += 0.4;
        }
    }
    if let (Some(arousal), Some(confidence)) = (arousal, confidence) {
        if arousal > 0.9 && confidence < 0.2 {
            risk += 0.2;
        }
    }
    f64::min(risk, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{names, to_payload, Payload, RegulatorSnapshot};

    fn state_update(arousal: f64, confidence: f64, floor: f64, curiosity: f64) -> Event {
        let state = RegulatorSnapshot {
            arousal,
            valence: 0.0,
            confidence,
            confidence_floor: floor,
            uncertainty: 0.5,
            curiosity,
        };
        let update = StateUpdate {
            cycles: 0,
            stagnation: true,
            delta: state.delta_from(&state),
            state,
            signal: None,
        };
        Event::internal("regulator", names::STATE_UPDATE, to_payload(&update).unwrap())
    }

    #[test]
    fn empty_window_reports_nothing() {
        let health = analyze_health(&[]);
        assert_eq!(health.event_count, 0);
        assert!(health.arousal.is_none());
        assert!(health.confidence.is_none());
        assert_eq!(health.zeno_risk, 0.0);
        assert_eq!(health.burnout_risk, 0.0);
        assert_eq!(health.stagnation_risk, 0.0);
        assert!(health.notes.is_empty());
    }

    #[test]
    fn burnout_combines_all_terms() {
        let health = analyze_health(&[state_update(0.95, 0.1, 0.08, 0.2)]);
        assert!((health.burnout_risk - 1.0).abs() < 1e-12);
        assert!(health.notes.contains(&"elevated_burnout_risk".to_string()));
    }

    #[test]
    fn zeno_needs_enough_internal_events() {
        let few: Vec<Event> = (0..4).map(|_| state_update(0.9, 0.1, 0.05, 0.2)).collect();
        assert_eq!(analyze_health(&few).zeno_risk, 0.0);

        let many: Vec<Event> = (0..5).map(|_| state_update(0.9, 0.1, 0.05, 0.2)).collect();
        let health = analyze_health(&many);
        assert!((health.zeno_risk - 1.0).abs() < 1e-12);
        assert!(health.notes.contains(&"elevated_zeno_risk".to_string()));
    }

    #[test]
    fn stagnation_uses_curiosity_when_nothing_external_happened() {
        let window = vec![state_update(0.2, 0.5, 0.05, 0.8)];
        let health = analyze_health(&window);
        assert!((health.stagnation_risk - 0.8).abs() < 1e-12);
        assert!(health.notes.contains(&"elevated_stagnation_risk".to_string()));

        let mut active = window;
        active.push(Event::observation("world", names::POSITION, Payload::new()));
        assert_eq!(analyze_health(&active).stagnation_risk, 0.0);
    }

    #[test]
    fn latest_state_update_wins() {
        let window = vec![
            state_update(0.9, 0.1, 0.05, 0.2),
            state_update(0.3, 0.6, 0.05, 0.2),
        ];
        let health = analyze_health(&window);
        assert_eq!(health.arousal, Some(0.3));
        assert_eq!(health.burnout_risk, 0.0);
    }
}

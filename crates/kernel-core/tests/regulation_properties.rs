use contracts::{names, payload, Event, EventKind, Payload, StateUpdate};
use kernel_core::{
    analyze_health, analyze_phase, BackgroundRegulator, CycleKind, EventLog, InMemoryEventLog,
    RegulatorConfig,
};
use proptest::prelude::*;
use serde_json::json;

fn event_for(code: u8) -> Event {
    match code % 7 {
        0 => Event::observation("world", names::POSITION, payload(json!({ "x": 1, "y": 1 }))),
        1 => Event::action("user", names::MOVE, payload(json!({ "dx": 1, "dy": 0 }))),
        2 => Event::outcome("world", names::MOVE_OK, payload(json!({ "ok": true }))),
        3 => Event::outcome("world", names::MOVE_BLOCKED, payload(json!({ "ok": false }))),
        4 => Event::outcome("world", "odd", Payload::new()),
        5 => Event::internal("test", "note", Payload::new()),
        _ => Event::system("test", "tick", Payload::new()),
    }
}

fn batches() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..25), 1..40)
}

proptest! {
    #[test]
    fn regulator_state_stays_bounded_and_above_floor(batches in batches()) {
        let config = RegulatorConfig::default();
        let mut log = InMemoryEventLog::new();
        let mut regulator = BackgroundRegulator::attach(&log, config.clone()).unwrap();

        for batch in batches {
            let events: Vec<Event> = batch.into_iter().map(event_for).collect();
            if !events.is_empty() {
                log.append_many(&events).unwrap();
            }

            let before = regulator.state().clone();
            let tail = log.last_seq().unwrap();
            let new_count = (tail - before.last_seen_seq) as usize;

            let emitted = regulator.step(&mut log).unwrap();
            let after = regulator.state();

            prop_assert!((config.arousal_min..=config.arousal_max).contains(&after.arousal));
            prop_assert!((config.confidence_min..=config.confidence_max).contains(&after.confidence));
            prop_assert!((config.uncertainty_min..=config.uncertainty_max).contains(&after.uncertainty));
            prop_assert!((config.curiosity_min..=config.curiosity_max).contains(&after.curiosity));
            prop_assert!((config.valence_min..=config.valence_max).contains(&after.valence));
            prop_assert!((0.0..=config.confidence_floor_max).contains(&after.confidence_floor));

            prop_assert!(after.confidence >= after.confidence_floor);
            prop_assert!(
                after.confidence_floor >= before.confidence_floor
                    || after.confidence_floor == after.confidence
            );

            prop_assert_eq!(after.last_seen_seq, tail);

            match config.select_cycle(new_count) {
                CycleKind::LightTick => {
                    prop_assert_eq!(after.cycles, before.cycles);
                    prop_assert_eq!(emitted.len(), 1);
                    prop_assert_eq!(emitted[0].name.as_str(), names::LIGHT_TICK);
                }
                kind => {
                    prop_assert_eq!(after.cycles, before.cycles + 1);
                    let update = StateUpdate::from_event(&emitted[0]).unwrap();
                    prop_assert_eq!(update.stagnation, kind == CycleKind::Stagnation);
                    prop_assert_eq!(update.cycles, before.cycles);
                    prop_assert_eq!(update.signal.map(|s| s.new_total), match kind {
                        CycleKind::Experience => Some(new_count),
                        _ => None,
                    });

                    let high = emitted.iter().any(|e| e.is(EventKind::System, names::WARNING_HIGH_AROUSAL));
                    let low = emitted.iter().any(|e| e.is(EventKind::System, names::WARNING_LOW_RECOVERY));
                    prop_assert_eq!(high, after.consecutive_high_arousal_cycles >= config.high_arousal_cycle_limit);
                    prop_assert_eq!(low, after.consecutive_low_recovery_cycles >= config.low_recovery_cycle_limit);
                    if after.arousal < config.high_arousal_threshold {
                        prop_assert_eq!(after.consecutive_high_arousal_cycles, 0);
                    }
                }
            }
        }
    }

    #[test]
    fn analyzers_report_unit_interval_scores(codes in prop::collection::vec(any::<u8>(), 0..80)) {
        let window: Vec<Event> = codes.into_iter().map(event_for).collect();

        let health = analyze_health(&window);
        for risk in [health.zeno_risk, health.burnout_risk, health.stagnation_risk] {
            prop_assert!((0.0..=1.0).contains(&risk));
        }

        let phase = analyze_phase(&window);
        prop_assert_eq!(phase.event_count, window.len());
        for score in [
            phase.internal_density,
            phase.action_density,
            phase.observation_density,
            phase.clustering,
            phase.volatility,
            phase.coherence,
        ] {
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn iter_since_returns_exactly_the_suffix(count in 0_usize..40, cursor in 0_u64..50) {
        let mut log = InMemoryEventLog::new();
        let events: Vec<Event> = (0..count).map(|i| event_for(i as u8)).collect();
        if !events.is_empty() {
            log.append_many(&events).unwrap();
        }

        let suffix = log.iter_since(cursor).unwrap();
        let expected = count.saturating_sub(cursor as usize);
        prop_assert_eq!(suffix.len(), expected);
        for (offset, logged) in suffix.iter().enumerate() {
            prop_assert_eq!(logged.seq, cursor + 1 + offset as u64);
            prop_assert_eq!(&logged.event, &events[(logged.seq - 1) as usize]);
        }
    }
}

//! Count-only signal extraction over a batch of new events.

use contracts::{Event, EventKind, Signal};

/// Reduces a batch to event-type counts and two ratios.
///
/// Only Outcome events carrying a boolean `ok` contribute to the failure
/// rate; outcomes without it are excluded from the denominator.
pub fn extract_signal<'a>(events: impl IntoIterator<Item = &'a Event>) -> Signal {
    let mut signal = Signal::default();

    for event in events {
        signal.new_total += 1;
        match event.kind {
            EventKind::Observation => signal.observations += 1,
            EventKind::Action => signal.actions += 1,
            EventKind::Outcome => {
                signal.outcomes += 1;
                match event.payload_bool("ok") {
                    Some(true) => signal.successes += 1,
                    Some(false) => signal.failures += 1,
                    None => {}
                }
            }
            EventKind::Internal => signal.internal += 1,
            EventKind::System => signal.system += 1,
        }
    }

    let resolved = (signal.failures + signal.successes).max(1);
    signal.failure_rate = signal.failures as f64 / resolved as f64;
    let external = signal.observations + signal.actions + signal.outcomes;
    signal.activity_ratio = external as f64 / signal.new_total.max(1) as f64;
    signal
}

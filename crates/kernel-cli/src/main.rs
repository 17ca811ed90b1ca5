use std::env;
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;

use contracts::{Event, EventKind, SystemConfig};
use kernel_api::{serve, IdentityStore, SqliteEventLog, StepResult, SystemBootstrap};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PARENT_LINK_SCAN: usize = 10_000;

fn print_usage() {
    println!("kernel-cli [command]");
    println!("commands:");
    println!("  (none)");
    println!("    interactive loop; type `help` inside for keys");
    println!("  serve [addr]");
    println!("    default addr: 127.0.0.1:8080");
    println!("  simulate [steps]");
    println!("    runs background steps with autonomy and cognition enabled");
    println!("  stats");
    println!("    per-kind event counts and parent link check");
    println!("  identity rebuild [note]");
    println!("    increments the incarnation, keeping identity ids");
    println!("environment: GRIDMIND_MEMORY_PATH GRIDMIND_IDENTITY_PATH GRIDMIND_WORLD_SIZE");
    println!("             GRIDMIND_AUTONOMY GRIDMIND_COGNITION GRIDMIND_AGENT_SEED GRIDMIND_LOG");
}

fn print_help() {
    println!("w/a/s/d    move up/left/down/right");
    println!("wait       one background step");
    println!("say <text> step carrying an utterance");
    println!("state      identity, position, health, phase");
    println!("auto on|off");
    println!("cognition on|off");
    println!("help       this list");
    println!("quit");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GRIDMIND_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

fn parse_steps(value: Option<&String>) -> Result<u64, String> {
    match value {
        None => Ok(100),
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| format!("invalid steps: {raw}")),
    }
}

fn parse_toggle(value: Option<&str>) -> Option<bool> {
    match value {
        Some("on") => Some(true),
        Some("off") => Some(false),
        _ => None,
    }
}

fn parse_direction(key: &str) -> Option<(i64, i64)> {
    match key {
        "w" => Some((0, -1)),
        "a" => Some((-1, 0)),
        "s" => Some((0, 1)),
        "d" => Some((1, 0)),
        _ => None,
    }
}

fn print_step(result: &StepResult) {
    for event in &result.emitted {
        println!("  {}", event.summary());
    }
    let at = result
        .world
        .agent
        .map(|pos| pos.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  at={} phase={} zeno={:.2} burnout={:.2} stagnation={:.2}",
        at,
        result.phase.phase_state,
        result.health.zeno_risk,
        result.health.burnout_risk,
        result.health.stagnation_risk
    );
}

fn print_state(system: &SystemBootstrap) -> Result<(), String> {
    let snapshot = system.snapshot().map_err(|err| err.to_string())?;
    let at = snapshot
        .world
        .agent
        .map(|pos| pos.to_string())
        .unwrap_or_else(|| "-".to_string());
    let state = snapshot.regulator;

    println!(
        "identity={} incarnation={} last_seq={}",
        snapshot.identity.identity_id, snapshot.identity.incarnation, snapshot.last_seq
    );
    println!(
        "at={} world={}x{} autonomy={} cognition={}",
        at, snapshot.world.size.0, snapshot.world.size.1, snapshot.autonomy, snapshot.cognition
    );
    println!(
        "arousal={:.3} valence={:.3} confidence={:.3} floor={:.3} uncertainty={:.3} curiosity={:.3}",
        state.arousal,
        state.valence,
        state.confidence,
        state.confidence_floor,
        state.uncertainty,
        state.curiosity
    );
    println!(
        "phase={} coherence={:.2} volatility={:.2}",
        snapshot.phase.phase_state, snapshot.phase.coherence, snapshot.phase.volatility
    );
    for note in snapshot.health.notes.iter().chain(&snapshot.phase.notes) {
        println!("note: {note}");
    }
    Ok(())
}

fn run_interactive(config: SystemConfig) -> Result<(), String> {
    let mut system =
        SystemBootstrap::open(config).map_err(|err| format!("failed to boot: {err}"))?;
    println!("gridmind ready; type `help` for commands");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().map_err(|err| err.to_string())?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.map_err(|err| err.to_string())?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };

        let outcome = match command {
            "quit" | "exit" => break,
            "help" => {
                print_help();
                Ok(())
            }
            "state" => print_state(&system),
            "wait" => system
                .step(None)
                .map(|result| print_step(&result))
                .map_err(|err| err.to_string()),
            "say" => {
                let text = words.collect::<Vec<_>>().join(" ");
                system
                    .step(Some(&text))
                    .map(|result| print_step(&result))
                    .map_err(|err| err.to_string())
            }
            "auto" => match parse_toggle(words.next()) {
                Some(enabled) => {
                    system.set_autonomy(enabled);
                    println!("autonomy={enabled}");
                    Ok(())
                }
                None => Err("usage: auto on|off".to_string()),
            },
            "cognition" => match parse_toggle(words.next()) {
                Some(enabled) => {
                    system.set_cognition(enabled);
                    println!("cognition={enabled}");
                    Ok(())
                }
                None => Err("usage: cognition on|off".to_string()),
            },
            key => match parse_direction(key) {
                Some((dx, dy)) => system
                    .apply_move(dx, dy)
                    .map(|result| print_step(&result))
                    .map_err(|err| err.to_string()),
                None => Err(format!("unknown command: {key}")),
            },
        };

        if let Err(err) = outcome {
            eprintln!("error: {err}");
        }
    }

    system.close().map_err(|err| err.to_string())
}

fn run_simulation(mut config: SystemConfig, steps: u64) -> Result<(), String> {
    config.enable_autonomy = true;
    config.enable_cognition = true;
    let mut system =
        SystemBootstrap::open(config).map_err(|err| format!("failed to boot: {err}"))?;

    let mut actions = 0usize;
    let mut emitted = 0usize;
    for _ in 0..steps {
        let result = system.step(None).map_err(|err| err.to_string())?;
        actions += count_kind(&result.emitted, EventKind::Action);
        emitted += result.emitted.len();
    }

    info!(steps, actions, emitted, "simulation finished");
    print_state(&system)?;
    println!("simulated steps={steps} emitted={emitted} actions={actions}");
    system.close().map_err(|err| err.to_string())
}

fn count_kind(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|event| event.kind == kind).count()
}

fn run_stats(config: &SystemConfig) -> Result<(), String> {
    let log = SqliteEventLog::open(&config.memory_path)
        .map_err(|err| format!("failed to open event log: {err}"))?;
    let stats = log.stats().map_err(|err| err.to_string())?;
    println!(
        "total={} observation={} action={} outcome={} internal={} system={} last_seq={}",
        stats.total,
        stats.observation,
        stats.action,
        stats.outcome,
        stats.internal,
        stats.system,
        stats.last_seq
    );

    let report = log
        .verify_parent_links(PARENT_LINK_SCAN)
        .map_err(|err| err.to_string())?;
    println!(
        "parent links checked={} missing={}",
        report.checked,
        report.missing.len()
    );
    for (event_id, parent_id) in &report.missing {
        println!("  {event_id} -> {parent_id}");
    }
    log.close().map_err(|err| err.to_string())
}

fn run_identity(config: &SystemConfig, args: &[String]) -> Result<(), String> {
    match args.get(2).map(String::as_str) {
        Some("rebuild") => {
            let note = (args.len() > 3).then(|| args[3..].join(" "));
            let mut store = IdentityStore::open(
                &config.identity_path,
                config.continuity_version,
                &config.creation_tag,
            )
            .map_err(|err| err.to_string())?;
            let record = store
                .rebuild_incarnation(note)
                .map_err(|err| err.to_string())?;
            println!(
                "identity={} incarnation={}",
                record.identity_id, record.incarnation
            );
            Ok(())
        }
        Some(other) => Err(format!("unknown identity command: {other}")),
        None => Err("missing identity command".to_string()),
    }
}

fn exit_with(result: Result<(), String>) {
    if let Err(err) = result {
        eprintln!("error: {err}");
        print_usage();
        std::process::exit(2);
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let config = SystemConfig::from_env();

    match args.get(1).map(String::as_str) {
        None => {
            if let Err(err) = run_interactive(config) {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        }
        Some("serve") => match parse_socket_addr(args.get(2)) {
            Ok(addr) => {
                println!("serving api on http://{addr}");
                if let Err(err) = serve(addr, config).await {
                    eprintln!("server error: {err}");
                    std::process::exit(1);
                }
            }
            Err(err) => exit_with(Err(err)),
        },
        Some("simulate") => {
            exit_with(parse_steps(args.get(2)).and_then(|steps| run_simulation(config, steps)))
        }
        Some("stats") => exit_with(run_stats(&config)),
        Some("identity") => exit_with(run_identity(&config, &args)),
        Some("help") | Some("--help") | Some("-h") => print_usage(),
        Some(other) => exit_with(Err(format!("unknown command: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_map_to_unit_moves() {
        assert_eq!(parse_direction("w"), Some((0, -1)));
        assert_eq!(parse_direction("d"), Some((1, 0)));
        assert_eq!(parse_direction("x"), None);
    }

    #[test]
    fn toggles_and_steps_parse() {
        assert_eq!(parse_toggle(Some("on")), Some(true));
        assert_eq!(parse_toggle(Some("off")), Some(false));
        assert_eq!(parse_toggle(None), None);
        assert_eq!(parse_steps(None), Ok(100));
        assert!(parse_steps(Some(&"ten".to_string())).is_err());
    }

    #[test]
    fn default_addr_is_local() {
        let addr = parse_socket_addr(None).unwrap();
        assert_eq!(addr.port(), 8080);
    }
}

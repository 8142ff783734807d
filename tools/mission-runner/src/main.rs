//! mission-runner: headless driver for colony mission scenarios.
//!
//! Usage:
//!   mission-runner run --scenario scenarios/two_outposts.json --ticks 2000
//!   mission-runner run --config tuning.json --seed 7 --output report.json
//!   mission-runner demo-scenario > my_scenario.json
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::fs;
use std::path::PathBuf;
use std::process;

use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mission_core::config::MissionConfig;
use mission_core::events::MissionEvent;
use mission_core::state::MissionSnapshot;
use mission_sim::scenario::Scenario;
use mission_sim::SimConfig;

const DEFAULT_TICKS: u64 = 2000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "run" => cmd_run(&args[2..]),
        "demo-scenario" => cmd_demo_scenario(),
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!(
        "mission-runner: colony mission engine driver\n\
         \n\
         Commands:\n\
         \n\
         run            Run a scenario and print the event log and final snapshot as JSON\n\
         \n\
           --scenario <path>  Scenario JSON (default: built-in two-outpost demo)\n\
           --config <path>    Mission config JSON, replacing the scenario's own\n\
           --ticks <N>        Ticks to run (default: 2000)\n\
           --seed <N>         RNG seed, unless the scenario fixes one (default: 42)\n\
           --output <path>    Write the report to a file instead of stdout\n\
         \n\
         demo-scenario  Print the built-in demo scenario as JSON\n"
    );
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_number<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    match flag_value(args, flag) {
        Some(raw) => match raw.parse() {
            Ok(n) => n,
            Err(_) => fail(&format!("{flag} expects a number, got {raw:?}")),
        },
        None => default,
    }
}

fn read_file(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => fail(&format!("cannot read {path}: {err}")),
    }
}

fn fail(message: &str) -> ! {
    error!("{message}");
    eprintln!("Error: {message}");
    process::exit(1);
}

#[derive(Serialize)]
struct Report<'a> {
    ticks: u64,
    events: &'a [MissionEvent],
    snapshot: &'a MissionSnapshot,
}

// --- Run command ---

fn cmd_run(args: &[String]) {
    let mut scenario = match flag_value(args, "--scenario") {
        Some(path) => Scenario::from_json_str(&read_file(path)).unwrap_or_else(|err| fail(&err.to_string())),
        None => Scenario::demo(),
    };
    if let Some(path) = flag_value(args, "--config") {
        scenario.config = MissionConfig::from_json_str(&read_file(path)).unwrap_or_else(|err| fail(&err.to_string()));
    }
    let ticks = parse_number(args, "--ticks", DEFAULT_TICKS);
    let sim = SimConfig {
        seed: parse_number(args, "--seed", SimConfig::default().seed),
        ..SimConfig::default()
    };

    let mut loaded = scenario.build(sim).unwrap_or_else(|err| fail(&err.to_string()));
    info!(ticks, "running scenario");
    let snapshots = loaded.run(ticks);
    let Some(last) = snapshots.last() else {
        fail("nothing to report: --ticks must be at least 1");
    };

    let report = Report {
        ticks,
        events: loaded.engine.event_log(),
        snapshot: last,
    };
    let json = serde_json::to_string_pretty(&report).unwrap_or_else(|err| fail(&err.to_string()));
    match flag_value(args, "--output").map(PathBuf::from) {
        Some(path) => {
            if let Err(err) = fs::write(&path, json) {
                fail(&format!("cannot write {}: {err}", path.display()));
            }
            info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }
}

// --- Demo scenario command ---

fn cmd_demo_scenario() {
    match serde_json::to_string_pretty(&Scenario::demo()) {
        Ok(json) => println!("{json}"),
        Err(err) => fail(&err.to_string()),
    }
}

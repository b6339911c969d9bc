//! # Skirmish Demo Host
//!
//! Loads a scenario (or the built-in demo), lets the autopilot play the
//! player's side against the enemy controller and prints the combat log.

use clap::Parser;
use log::{info, warn};
use skirmish::{
    Autopilot, CombatEvent, CombatSession, LogCategory, PlayerIntent, Scenario, SkirmishResult,
    TurnPhase,
};
use std::path::PathBuf;

/// Command line arguments for the skirmish demo.
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Savage Worlds tactical combat, played out on the terminal")]
#[command(version)]
struct Args {
    /// Random seed for every die roll
    #[arg(short, long)]
    seed: Option<u64>,

    /// Scenario file (JSON); the built-in demo when absent
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Stop after this many rounds
    #[arg(long, default_value_t = 20)]
    max_rounds: u32,

    /// Print every queued event as JSON instead of only log lines
    #[arg(long)]
    events: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> SkirmishResult<()> {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    info!("Starting skirmish v{}", skirmish::VERSION);

    let seed = args.seed.unwrap_or(12345);
    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::demo(seed),
    };
    println!("== {} ==", scenario.name);

    let mut session = scenario.into_session(Some(seed))?;
    run_battle(&mut session, &args)?;

    let phase = session.phase();
    let verdict = match phase {
        TurnPhase::Victory => "Victory",
        TurnPhase::Defeat => "Defeat",
        _ => "Stalemate",
    };
    println!("== {verdict} after {} round(s) ==", session.round());
    Ok(())
}

/// Initializes `env_logger`, letting `RUST_LOG` override the flag.
fn initialize_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Warn,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .parse_default_env()
        .init();
}

/// Alternates autopilot and enemy turns until the fight ends or runs long.
fn run_battle(session: &mut CombatSession, args: &Args) -> SkirmishResult<()> {
    let mut pilot = Autopilot::new();

    while !session.phase().is_terminal() && session.round() <= args.max_rounds {
        match session.phase() {
            TurnPhase::Player => {
                let intent = pilot.next_intent(session).unwrap_or(PlayerIntent::EndTurn);
                if let Err(e) = session.submit(intent.clone()) {
                    warn!("Autopilot intent {intent:?} rejected: {e}");
                    session.end_turn()?;
                }
                session.check_victory();
            }
            TurnPhase::Enemy => {
                session.run_enemy_phase()?;
            }
            TurnPhase::Victory | TurnPhase::Defeat => break,
        }
        print_events(session, args.events)?;
    }

    print_events(session, args.events)
}

fn print_events(session: &mut CombatSession, as_json: bool) -> SkirmishResult<()> {
    for event in session.drain_events() {
        if as_json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        if let CombatEvent::Log(entry) = event {
            let marker = match entry.category {
                LogCategory::Info => " ",
                LogCategory::Success => "+",
                LogCategory::Damage => "!",
                LogCategory::Miss => "-",
            };
            println!("{marker} {}", entry.message);
        }
    }
    Ok(())
}

//! chess_coach: play an engine from the terminal
//!
//! - Human plays white against a UCI engine
//! - Evaluation bar and top moves after every turn
//! - Knight-path and attack-pattern overlays
//! - Falls back to two-player mode when no engine can be started

mod app;
mod board;

use anyhow::{Context, Result};
use app::{CoachApp, Command, Flow};
use clap::Parser;
use coach_core::{AnalysisClient, CoachConfig, GameController};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chess_coach", version, about = "Engine-assisted chess in the terminal")]
struct Args {
    /// TOML config file; missing files fall back to defaults
    #[arg(long, default_value = "chess_coach.toml")]
    config: PathBuf,

    /// UCI engine executable, overriding the config
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Engine skill level (0-20), overriding the config
    #[arg(long)]
    skill: Option<i32>,

    /// Compute overlays before each prompt instead of in the background
    #[arg(long)]
    blocking_overlay: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout is the board
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = CoachConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(path) = args.engine {
        config.engine.path = path;
    }
    if let Some(skill) = args.skill {
        config.engine.skill_level = skill;
    }

    let engine = match AnalysisClient::start(&config.engine) {
        Ok(client) => {
            info!(engine = client.engine_name().unwrap_or("unknown"), "engine ready");
            Some(client)
        }
        Err(e) => {
            warn!(error = %e, "no engine; playing both sides");
            println!("Engine unavailable ({e}); you play both sides.");
            None
        }
    };

    let game = GameController::new(config, engine).context("starting game")?;
    let mut app = CoachApp::new(game, !args.blocking_overlay);
    run(&mut app)
}

fn run(app: &mut CoachApp) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    writeln!(stdout, "{}", app::HELP)?;
    write!(stdout, "{}", app.view())?;

    let mut lines = stdin.lock().lines();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let Some(line) = lines.next() else {
            // EOF counts as quit
            if let Flow::Quit(output) = app.update(Command::Quit) {
                write!(stdout, "\n{output}")?;
            }
            break;
        };
        let line = line?;
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(stdout, "{e}")?;
                continue;
            }
        };
        match app.update(command) {
            Flow::Continue(output) => write!(stdout, "{output}")?,
            Flow::Quit(output) => {
                write!(stdout, "{output}")?;
                break;
            }
        }
    }
    Ok(())
}

//! Shell state and command handling

use crate::board::{self, full_view};
use anyhow::{anyhow, bail, Result};
use coach_core::{CoachConfig, GameController, MoveOutcome, Square};
use std::fmt::Write;
use std::time::Duration;

pub const HELP: &str = "\
Commands:
  <square> | select <square>  pick a piece, then its destination (e.g. e2, e4)
  knight                      toggle knight-path mode
  attack                      toggle attack-pattern mode
  all                         turn every overlay mode on
  tree                        show the engine's top moves as a tree
  skill <0-20>                set the engine's skill level
  undo                        take back your last move and the engine's reply
  board                       redraw the board
  json                        print the game state as JSON
  help                        show this help
  quit                        leave";

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select(Square),
    Knight,
    Attack,
    All,
    Tree,
    Skill(i32),
    Undo,
    Board,
    Json,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(input: &str) -> Result<Option<Command>> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let Some(&head) = parts.first() else {
            return Ok(None);
        };
        let command = match (head.to_ascii_lowercase().as_str(), parts.get(1)) {
            ("select", Some(sq)) => Command::Select(parse_square(sq)?),
            ("select", None) => bail!("select needs a square, e.g. select e2"),
            ("knight", _) => Command::Knight,
            ("attack", _) => Command::Attack,
            ("all", _) => Command::All,
            ("tree", _) => Command::Tree,
            ("skill", Some(level)) => Command::Skill(
                level
                    .parse()
                    .map_err(|_| anyhow!("skill level must be a number, got {level:?}"))?,
            ),
            ("skill", None) => bail!("skill needs a level between 0 and 20"),
            ("undo", _) => Command::Undo,
            ("board", _) => Command::Board,
            ("json", _) => Command::Json,
            ("help" | "?", _) => Command::Help,
            ("quit" | "exit", _) => Command::Quit,
            _ => Command::Select(parse_square(head)?),
        };
        Ok(Some(command))
    }
}

fn parse_square(text: &str) -> Result<Square> {
    text.parse()
        .map_err(|_| anyhow!("unknown command or square {text:?} (try help)"))
}

/// Whether the loop keeps going after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue(String),
    Quit(String),
}

/// Main application state
pub struct CoachApp {
    game: GameController,
    /// Overlays come from the background worker instead of blocking queries
    background: bool,
}

impl CoachApp {
    pub fn new(mut game: GameController, background: bool) -> Self {
        if background {
            game.enable_background_overlays();
        }
        let mut app = Self { game, background };
        app.start_overlay();
        app
    }

    pub fn game(&self) -> &GameController {
        &self.game
    }

    /// Board and overlays as they stand now.
    pub fn view(&mut self) -> String {
        self.game.poll_overlay();
        full_view(self.game.position(), &self.game.snapshot())
    }

    pub fn update(&mut self, command: Command) -> Flow {
        let output = match command {
            Command::Select(sq) => self.select(sq),
            Command::Knight => {
                let on = self.game.toggle_knight_mode();
                format!("Knight mode {}\n{}", on_off(on), self.view())
            }
            Command::Attack => {
                let on = self.game.toggle_attack_mode();
                format!("Attack mode {}\n{}", on_off(on), self.view())
            }
            Command::All => {
                self.game.show_all();
                format!("All overlays on\n{}", self.view())
            }
            Command::Tree => match self.game.move_tree() {
                Ok(tree) => board::tree_view(&tree),
                Err(e) => format!("Move tree unavailable: {e}\n"),
            },
            Command::Skill(level) => match self.game.set_skill_level(level) {
                Some(skill) => format!("Skill level set to {skill}\n"),
                None => "No engine connected\n".to_string(),
            },
            Command::Undo => {
                let popped = self.game.undo();
                self.start_overlay();
                let plural = if popped == 1 { "" } else { "s" };
                format!("Took back {popped} ply{plural}\n{}", self.view())
            }
            Command::Board => self.view(),
            Command::Json => match serde_json::to_string_pretty(&self.game.snapshot()) {
                Ok(json) => json + "\n",
                Err(e) => format!("Could not encode state: {e}\n"),
            },
            Command::Help => format!("{HELP}\n"),
            Command::Quit => {
                self.game.quit();
                return Flow::Quit("Bye\n".to_string());
            }
        };
        Flow::Continue(output)
    }

    fn select(&mut self, sq: Square) -> String {
        let mut out = String::new();
        match self.game.select(sq) {
            MoveOutcome::Ignored => match self.game.status().message() {
                Some(message) => {
                    let _ = writeln!(out, "{message}");
                }
                None => {
                    let _ = writeln!(out, "Nothing to select on {sq}");
                }
            },
            MoveOutcome::Selected(sq) => {
                let targets: Vec<String> =
                    self.game.legal_targets().iter().map(Square::to_string).collect();
                let _ = writeln!(out, "Selected {sq}: {}", targets.join(" "));
                out.push_str(&self.view());
            }
            MoveOutcome::Rejected(mv) => {
                let _ = writeln!(out, "Illegal move {mv}");
            }
            MoveOutcome::Played(report) => {
                let _ = writeln!(out, "You: {}", report.human);
                if let Some(reply) = &report.reply {
                    let _ = writeln!(out, "Engine: {reply}");
                }
                self.start_overlay();
                out.push_str(&self.view());
            }
            MoveOutcome::KnightStart(sq) => {
                let _ = writeln!(out, "Knight on {sq}; pick a target square");
            }
            MoveOutcome::KnightPath(path) => {
                let hops = path.len().saturating_sub(1);
                let squares: Vec<String> = path.iter().map(Square::to_string).collect();
                let _ = writeln!(out, "Path: {} ({hops} hops)", squares.join(" "));
                out.push_str(&self.view());
            }
        }
        out
    }

    /// Kick off an overlay for the current position.
    fn start_overlay(&mut self) {
        if !self.game.engine_available() || self.game.status().is_terminal() {
            return;
        }
        if self.background {
            // Show the overlay with this turn's board when it lands in time
            if self.game.request_overlay().is_some() {
                let budget = overlay_budget(self.game.config());
                self.game.wait_overlay(budget);
            }
        } else {
            self.game.refresh_overlay();
        }
    }
}

/// Longest an overlay refresh can take: evaluation, top moves and the reply grace.
fn overlay_budget(config: &CoachConfig) -> Duration {
    let timing = &config.timing;
    Duration::from_millis(timing.eval_ms + timing.top_moves_ms) + config.engine.reply_grace()
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod app_tests;

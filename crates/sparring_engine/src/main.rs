mod search;

use coach_core::uci::{parse_position_command, GameLine};
use coach_core::{Position, MAX_SKILL};
use rand::thread_rng;
use search::{rank_moves, LineScore};
use std::io::{self, BufRead, Write};

const MAX_MULTIPV: usize = 10;

fn main() {
    // UCI engines communicate via stdin/stdout.
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let mut line = GameLine::new(Position::startpos());
    let mut skill = MAX_SKILL as u8;
    let mut multipv: usize = 1;

    for input in stdin.lock().lines() {
        let input = match input {
            Ok(l) => l,
            Err(_) => break,
        };
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "uci" => {
                writeln!(stdout, "id name Sparring 0.1").ok();
                writeln!(stdout, "id author chess-coach").ok();
                writeln!(stdout, "option name Skill Level type spin default {MAX_SKILL} min 0 max {MAX_SKILL}").ok();
                writeln!(stdout, "option name MultiPV type spin default 1 min 1 max {MAX_MULTIPV}").ok();
                writeln!(stdout, "uciok").ok();
                stdout.flush().ok();
            }
            "isready" => {
                writeln!(stdout, "readyok").ok();
                stdout.flush().ok();
            }
            "setoption" => match option_value(&parts).as_ref().map(|(n, v)| (n.as_str(), *v)) {
                Some(("Skill Level", v)) => {
                    if let Ok(v) = v.parse::<i32>() {
                        skill = v.clamp(0, MAX_SKILL) as u8;
                    }
                }
                Some(("MultiPV", v)) => {
                    if let Ok(v) = v.parse::<usize>() {
                        multipv = v.clamp(1, MAX_MULTIPV);
                    }
                }
                _ => {}
            },
            "ucinewgame" => {
                line = GameLine::new(Position::startpos());
            }
            "position" => {
                // Unreadable positions fall back to the start position
                line = parse_position_command(&parts[1..])
                    .unwrap_or_else(|_| GameLine::new(Position::startpos()));
            }
            "go" => {
                // Time controls are ignored; the search is shallow enough to answer at once
                let ranked = rank_moves(line.current(), skill, &mut thread_rng());
                for (i, s) in ranked.iter().take(multipv).enumerate() {
                    let score = match s.score {
                        LineScore::Centipawns(cp) => format!("cp {cp}"),
                        LineScore::Mate => "mate 1".to_string(),
                    };
                    writeln!(stdout, "info depth 2 multipv {} score {score} pv {}", i + 1, s.mv).ok();
                }
                match ranked.first() {
                    Some(best) => writeln!(stdout, "bestmove {}", best.mv).ok(),
                    None => writeln!(stdout, "bestmove 0000").ok(), // no moves
                };
                stdout.flush().ok();
            }
            "quit" => break,
            _ => {
                // ignore unknown commands, including "stop"
            }
        }
    }
}

/// Split `setoption name <name...> value <value>` into its name and value.
fn option_value<'a>(parts: &[&'a str]) -> Option<(String, &'a str)> {
    let name_at = parts.iter().position(|&x| x == "name")?;
    let value_at = parts.iter().position(|&x| x == "value")?;
    let name = parts.get(name_at + 1..value_at)?.join(" ");
    let value = parts.get(value_at + 1)?;
    Some((name, value))
}

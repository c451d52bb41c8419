//! UCI protocol text: requests the client sends and the engine output it
//! understands. Anything else the engine prints parses as
//! [`EngineMessage::Other`] and is ignored by the client.

use serde::{Deserialize, Serialize};

use crate::error::RulesError;
use crate::rules::{Position, STARTPOS_FEN};
use crate::types::{Color, Move};

/// Score reported for a forced mate, minus the distance to mate.
pub const MATE_SCORE: i32 = 10_000;

/// Engine score from the side to move's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    Centipawns(i32),
    /// Mate in N moves; negative when the side to move gets mated.
    Mate(i32),
}

impl Score {
    /// Collapse into centipawns, mapping mates to `±(MATE_SCORE - distance)`
    /// so that nearer mates rank higher and nothing overflows.
    pub fn centipawns(self) -> i32 {
        match self {
            Score::Centipawns(cp) => cp.clamp(-(MATE_SCORE - 1), MATE_SCORE - 1),
            Score::Mate(m) if m > 0 => MATE_SCORE - m.min(MATE_SCORE / 2),
            Score::Mate(m) => -MATE_SCORE - m.max(-(MATE_SCORE / 2)),
        }
    }

    /// Centipawns from white's point of view, given who was to move.
    pub fn for_white(self, side_to_move: Color) -> i32 {
        let cp = self.centipawns();
        match side_to_move {
            Color::White => cp,
            Color::Black => -cp,
        }
    }
}

/// One `info` line. Only the fields the client uses are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    /// Principal variation in UCI move text
    pub pv: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineMessage {
    IdName(String),
    UciOk,
    ReadyOk,
    /// `bestmove` with its move text; `None` for `(none)`/`0000`.
    BestMove(Option<String>),
    Info(InfoLine),
    Other(String),
}

/// Parse one line of engine output.
pub fn parse_line(line: &str) -> EngineMessage {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.first().copied() {
        Some("uciok") => EngineMessage::UciOk,
        Some("readyok") => EngineMessage::ReadyOk,
        Some("id") if parts.get(1) == Some(&"name") => EngineMessage::IdName(parts[2..].join(" ")),
        Some("bestmove") => match parts.get(1).copied() {
            None | Some("(none)") | Some("0000") => EngineMessage::BestMove(None),
            Some(mv) => EngineMessage::BestMove(Some(mv.to_string())),
        },
        Some("info") => EngineMessage::Info(parse_info(&parts[1..])),
        _ => EngineMessage::Other(line.trim().to_string()),
    }
}

fn parse_info(tokens: &[&str]) -> InfoLine {
    let mut info = InfoLine::default();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                info.depth = tokens.get(i + 1).and_then(|t| t.parse().ok());
                i += 2;
            }
            "multipv" => {
                info.multipv = tokens.get(i + 1).and_then(|t| t.parse().ok());
                i += 2;
            }
            "score" => {
                let kind = tokens.get(i + 1).copied();
                let value = tokens.get(i + 2).and_then(|t| t.parse::<i32>().ok());
                info.score = match (kind, value) {
                    (Some("cp"), Some(v)) => Some(Score::Centipawns(v)),
                    (Some("mate"), Some(v)) => Some(Score::Mate(v)),
                    _ => None,
                };
                i += 3;
            }
            "pv" => {
                info.pv = tokens[i + 1..].iter().map(|t| t.to_string()).collect();
                break;
            }
            // Free text until end of line
            "string" | "refutation" | "currline" => break,
            "lowerbound" | "upperbound" => i += 1,
            _ => i += 2,
        }
    }
    info
}

pub fn set_option(name: &str, value: impl std::fmt::Display) -> String {
    format!("setoption name {name} value {value}")
}

pub fn go_movetime(ms: u64) -> String {
    format!("go movetime {ms}")
}

/// A position as the engine is told about it: the root the game started from
/// plus the moves played since, so the engine sees repetitions too.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameLine {
    root: Position,
    moves: Vec<Move>,
    current: Position,
}

impl GameLine {
    pub fn new(root: Position) -> Self {
        Self {
            current: root.clone(),
            root,
            moves: Vec::new(),
        }
    }

    /// Replay `moves` from `root`, failing on the first illegal one.
    pub fn from_moves(root: Position, moves: &[Move]) -> Result<Self, RulesError> {
        let mut line = Self::new(root);
        for &mv in moves {
            line.push(mv)?;
        }
        Ok(line)
    }

    /// Assemble a line whose moves are already known to lead from `root` to
    /// `current`.
    pub(crate) fn from_parts(root: Position, moves: Vec<Move>, current: Position) -> Self {
        Self {
            root,
            moves,
            current,
        }
    }

    pub fn push(&mut self, mv: Move) -> Result<(), RulesError> {
        self.current = self.current.apply(mv)?;
        self.moves.push(mv);
        Ok(())
    }

    pub fn root(&self) -> &Position {
        &self.root
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn current(&self) -> &Position {
        &self.current
    }

    /// The `position` command describing this line.
    pub fn to_command(&self) -> String {
        let root_fen = self.root.fen();
        let mut cmd = if root_fen == STARTPOS_FEN {
            "position startpos".to_string()
        } else {
            format!("position fen {root_fen}")
        };
        if !self.moves.is_empty() {
            cmd.push_str(" moves");
            for mv in &self.moves {
                cmd.push(' ');
                cmd.push_str(&mv.to_string());
            }
        }
        cmd
    }
}

/// Parse the arguments of a `position` command (everything after the word
/// `position`): `startpos [moves ...]` or `fen <fields> [moves ...]`.
pub fn parse_position_command(args: &[&str]) -> Result<GameLine, RulesError> {
    let moves_at = args.iter().position(|&a| a == "moves").unwrap_or(args.len());
    let root = match args.first().copied() {
        Some("fen") => Position::from_fen(&args[1..moves_at].join(" "))?,
        _ => Position::startpos(),
    };
    let mut line = GameLine::new(root);
    for txt in args.iter().skip(moves_at + 1) {
        let mv = Move::from_uci(txt).ok_or_else(|| RulesError::InvalidFen {
            fen: line.current().fen(),
            reason: format!("unreadable move {txt:?}"),
        })?;
        line.push(mv)?;
    }
    Ok(line)
}

#[cfg(test)]
#[path = "uci_tests.rs"]
mod uci_tests;

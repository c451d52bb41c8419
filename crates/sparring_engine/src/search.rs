//! Two-ply material search.
//!
//! Each root move is scored by the material balance after the opponent's
//! best material reply. Lower skill levels add more random noise, so weak
//! settings blunder the way a human beginner would.

use coach_core::{Color, Move, PieceKind, Position, Square};
use rand::Rng;

/// Score of delivering mate on the next ply, in the same units as material.
pub const MATE_VALUE: i32 = 100_000;

pub fn piece_value(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Pawn => 100,
        PieceKind::Knight => 320,
        PieceKind::Bishop => 330,
        PieceKind::Rook => 500,
        PieceKind::Queen => 900,
        PieceKind::King => 0,
    }
}

/// Material balance from `us`'s point of view.
pub fn material(pos: &Position, us: Color) -> i32 {
    Square::all()
        .filter_map(|sq| pos.piece_at(sq))
        .map(|p| {
            let v = piece_value(p.kind);
            if p.color == us {
                v
            } else {
                -v
            }
        })
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineScore {
    Centipawns(i32),
    /// Mate in one
    Mate,
}

impl LineScore {
    fn key(self) -> i32 {
        match self {
            LineScore::Centipawns(cp) => cp,
            LineScore::Mate => MATE_VALUE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredMove {
    pub mv: Move,
    pub score: LineScore,
}

/// Score every legal move, best first. Empty when there is no legal move.
pub fn rank_moves(pos: &Position, skill: u8, rng: &mut impl Rng) -> Vec<ScoredMove> {
    let us = pos.side_to_move();
    let noise = 10 * i32::from(20u8.saturating_sub(skill.min(20)));

    let mut scored: Vec<ScoredMove> = pos
        .legal_moves()
        .into_iter()
        .filter_map(|mv| {
            let next = pos.apply(mv).ok()?;
            let score = match reply_floor(&next, us) {
                None if next.is_check() => LineScore::Mate,
                None => LineScore::Centipawns(0),
                Some(cp) => {
                    let jitter = if noise > 0 { rng.gen_range(-noise..=noise) } else { 0 };
                    LineScore::Centipawns(cp + jitter)
                }
            };
            Some(ScoredMove { mv, score })
        })
        .collect();

    // Stable, so ties keep generation order
    scored.sort_by_key(|s| std::cmp::Reverse(s.score.key()));
    scored
}

/// Worst material balance for `us` over the opponent's replies, or `None`
/// if the opponent has no legal move.
fn reply_floor(pos: &Position, us: Color) -> Option<i32> {
    pos.legal_moves()
        .into_iter()
        .filter_map(|reply| pos.apply(reply).ok())
        .map(|after| material(&after, us))
        .min()
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod search_tests;

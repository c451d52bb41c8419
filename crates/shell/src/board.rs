//! Text rendering of the board and its overlays

use coach_core::{MoveTree, OverlayData, Position, Snapshot, Square};
use std::fmt::Write;

/// Width of the evaluation bar in characters
pub const BAR_WIDTH: usize = 40;

/// Renders the board with the snapshot's highlights
pub struct BoardView<'a> {
    position: &'a Position,
    snapshot: &'a Snapshot,
}

impl<'a> BoardView<'a> {
    pub fn new(position: &'a Position, snapshot: &'a Snapshot) -> Self {
        Self { position, snapshot }
    }

    /// Board diagram, white at the bottom.
    ///
    /// `[x]` marks the selection, `*` a legal target, `o` a knight path hop
    /// and `x` an attacked square.
    pub fn view(&self) -> String {
        let mut out = String::new();
        for rank in (0..8).rev() {
            let _ = write!(out, "{} ", rank + 1);
            for file in 0..8 {
                let Ok(sq) = Square::new(file, rank) else {
                    continue;
                };
                out.push_str(&self.render_square(sq));
            }
            out.push('\n');
        }
        out.push_str("   a  b  c  d  e  f  g  h\n");
        out
    }

    fn render_square(&self, sq: Square) -> String {
        let snap = self.snapshot;
        let piece = self.position.piece_at(sq).map(|p| p.symbol());
        let body = match piece {
            Some(ch) => ch,
            None if snap.legal_targets.contains(&sq) => '*',
            None if snap.knight_path.contains(&sq) => 'o',
            None if snap.attacked.contains(&sq) => 'x',
            None if sq.is_light() => '.',
            None => ':',
        };

        // Highlight selected square
        if snap.selection == Some(sq) || snap.knight_start == Some(sq) {
            format!("[{body}]")
        } else if piece.is_some() && snap.legal_targets.contains(&sq) {
            format!("*{body} ")
        } else {
            format!(" {body} ")
        }
    }
}

/// Evaluation bar, white's share filled from the left.
pub fn eval_bar(overlay: &OverlayData) -> String {
    match (overlay.evaluation, overlay.bar_fraction) {
        (Some(eval), Some(fraction)) => {
            let filled = (fraction * BAR_WIDTH as f64).round() as usize;
            let filled = filled.min(BAR_WIDTH);
            format!(
                "[{}{}] {}",
                "#".repeat(filled),
                "-".repeat(BAR_WIDTH - filled),
                format_eval(eval)
            )
        }
        _ => format!("[{}] n/a", " ".repeat(BAR_WIDTH)),
    }
}

/// Centipawns as pawns with a sign.
pub fn format_eval(cp: i32) -> String {
    format!("{:+.2}", f64::from(cp) / 100.0)
}

pub fn top_moves(overlay: &OverlayData) -> String {
    if overlay.top_moves.is_empty() {
        return "Top moves: none\n".to_string();
    }
    let mut out = String::from("Top moves:\n");
    for (i, m) in overlay.top_moves.iter().enumerate() {
        let _ = writeln!(out, "  {}. {:<8} {}", i + 1, m.notation, format_eval(m.score));
    }
    out
}

/// One-level tree under a "Root" node.
pub fn tree_view(tree: &MoveTree) -> String {
    let mut out = String::from("Root\n");
    let count = tree.children.len();
    for (i, node) in tree.children.iter().enumerate() {
        let branch = if i + 1 == count { "└─" } else { "├─" };
        let _ = writeln!(out, "{branch} {}  Eval: {}", node.notation, node.score);
    }
    out
}

/// Everything shown after a command: board, status lines and overlays.
pub fn full_view(position: &Position, snapshot: &Snapshot) -> String {
    let mut out = BoardView::new(position, snapshot).view();
    let _ = writeln!(out, "{} to move", snapshot.side_to_move);
    if !snapshot.moves.is_empty() {
        let _ = writeln!(out, "Moves: {}", numbered_moves(&snapshot.moves));
    }
    if let Some(message) = &snapshot.message {
        let _ = writeln!(out, "{message}");
    }
    if snapshot.knight_mode {
        out.push_str("Knight mode on\n");
    }
    if snapshot.attack_mode {
        out.push_str("Attack mode on\n");
    }
    if let Some(overlay) = &snapshot.overlay {
        let _ = writeln!(out, "{}", eval_bar(overlay));
        out.push_str(&top_moves(overlay));
    }
    if let Some(notice) = &snapshot.notice {
        let _ = writeln!(out, "! {notice}");
    }
    out
}

/// "1. e4 e5 2. Nf3"
fn numbered_moves(moves: &[String]) -> String {
    moves
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| format!("{}. {}", i + 1, pair.join(" ")))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "board_tests.rs"]
mod board_tests;

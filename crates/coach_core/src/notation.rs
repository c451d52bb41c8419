//! Standard algebraic notation for display.

use crate::rules::Position;
use crate::types::{Move, PieceKind};

/// SAN for `mv` in `pos`, with `+`/`#` suffix. Falls back to coordinate text
/// for moves that are not legal in `pos`.
pub fn san(pos: &Position, mv: Move) -> String {
    let piece = match pos.piece_at(mv.from) {
        Some(p) => p,
        None => return mv.to_string(),
    };
    let legal = pos.legal_moves();
    if !legal.contains(&mv) {
        return mv.to_string();
    }

    let mut san = String::new();
    let file_delta = i32::from(mv.to.file()) - i32::from(mv.from.file());
    if piece.kind == PieceKind::King && file_delta.abs() == 2 {
        san.push_str(if file_delta > 0 { "O-O" } else { "O-O-O" });
    } else {
        let is_capture = pos.piece_at(mv.to).is_some()
            || (piece.kind == PieceKind::Pawn && mv.from.file() != mv.to.file());

        match piece.kind.san_letter() {
            Some(letter) => {
                san.push(letter);
                san.push_str(&disambiguation(pos, &legal, mv, piece.kind));
            }
            None => {
                if is_capture {
                    san.push((b'a' + mv.from.file()) as char);
                }
            }
        }
        if is_capture {
            san.push('x');
        }
        san.push_str(&mv.to.to_string());
        if let Some(promo) = mv.promotion.and_then(PieceKind::san_letter) {
            san.push('=');
            san.push(promo);
        }
    }

    if let Ok(next) = pos.apply(mv) {
        if next.is_checkmate() {
            san.push('#');
        } else if next.is_check() {
            san.push('+');
        }
    }
    san
}

/// File, rank or full square needed to tell `mv` apart from other moves of
/// the same piece kind to the same square.
fn disambiguation(pos: &Position, legal: &[Move], mv: Move, kind: PieceKind) -> String {
    let rivals: Vec<Move> = legal
        .iter()
        .copied()
        .filter(|m| m.to == mv.to && m.from != mv.from)
        .filter(|m| pos.piece_at(m.from).map(|p| p.kind) == Some(kind))
        .collect();
    if rivals.is_empty() {
        return String::new();
    }
    let from = mv.from.to_string();
    if rivals.iter().all(|m| m.from.file() != mv.from.file()) {
        from[0..1].to_string()
    } else if rivals.iter().all(|m| m.from.rank() != mv.from.rank()) {
        from[1..2].to_string()
    } else {
        from
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn san_of(fen: &str, uci: &str) -> String {
        let pos = Position::from_fen(fen).unwrap();
        san(&pos, Move::from_uci(uci).unwrap())
    }

    #[test]
    fn test_basic_moves() {
        let start = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        assert_eq!(san_of(start, "e2e4"), "e4");
        assert_eq!(san_of(start, "g1f3"), "Nf3");
        assert_eq!(san_of(start, "e2e5"), "e2e5");
    }

    #[test]
    fn test_captures_and_promotion() {
        let fen = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2";
        assert_eq!(san_of(fen, "e4d5"), "exd5");
        assert_eq!(san_of("7k/4P3/8/8/8/8/8/4K3 w - - 0 1", "e7e8q"), "e8=Q+");
    }

    #[test]
    fn test_castling_and_mate_suffix() {
        assert_eq!(san_of("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", "e1g1"), "O-O");
        assert_eq!(san_of("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", "e1c1"), "O-O-O");
        // Back-rank mate
        assert_eq!(san_of("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", "a1a8"), "Ra8#");
    }

    #[test]
    fn test_disambiguation() {
        // Knights on b1 and f1 can both reach d2.
        assert_eq!(san_of("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1", "b1d2"), "Nbd2");
        // Rooks on a1 and a5 can both reach a3.
        assert_eq!(san_of("4k3/8/8/R7/8/8/8/R3K3 w - - 0 1", "a1a3"), "R1a3");
    }
}

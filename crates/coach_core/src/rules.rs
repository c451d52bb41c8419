//! Adapter over the `cozy-chess` rules engine.
//!
//! Legal move generation, move application and attack tables all come from
//! `cozy-chess`. This module only translates between its types and the
//! coach's value types, and answers the draw queries the board alone cannot
//! (75-move rule, fivefold repetition) from state the adapter keeps alongside.

use std::fmt;

use cozy_chess::{BitBoard, Board};
use serde::{Deserialize, Serialize};

use crate::error::RulesError;
use crate::notation;
use crate::types::{Color, Move, Piece, PieceKind, Square};

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Plies without capture or pawn move after which the game is drawn.
pub const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;

/// Occurrences of the same position after which the game is drawn.
pub const FIVEFOLD: usize = 5;

/// Derived game status, recomputed after every applied or undone move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Ongoing,
    Checkmate,
    Stalemate,
    DrawInsufficientMaterial,
    Draw75Move,
    DrawFivefoldRepetition,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        self != GameStatus::Ongoing
    }

    /// Message shown to the player once the game has ended.
    pub fn message(self) -> Option<&'static str> {
        match self {
            GameStatus::Ongoing => None,
            GameStatus::Checkmate => Some("Checkmate! Game Over."),
            GameStatus::Stalemate => Some("It's a stalemate!"),
            GameStatus::DrawInsufficientMaterial => Some("Draw due to insufficient material."),
            GameStatus::Draw75Move => Some("Draw due to 75-move rule."),
            GameStatus::DrawFivefoldRepetition => Some("Draw due to fivefold repetition."),
        }
    }
}

/// An immutable chess position. Applying a move yields a new value.
#[derive(Clone, Debug)]
pub struct Position {
    board: Board,
    /// Plies since the last capture or pawn move. Unlike the board's own
    /// halfmove clock this is not capped at the fifty-move limit.
    reversible_plies: u32,
}

impl Position {
    pub fn startpos() -> Self {
        Self {
            board: Board::default(),
            reversible_plies: 0,
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let board = Board::from_fen(fen, false).map_err(|e| RulesError::InvalidFen {
            fen: fen.to_string(),
            reason: format!("{e:?}"),
        })?;
        let reversible_plies = u32::from(board.halfmove_clock());
        Ok(Self {
            board,
            reversible_plies,
        })
    }

    pub fn fen(&self) -> String {
        self.board.to_string()
    }

    pub fn side_to_move(&self) -> Color {
        from_cozy_color(self.board.side_to_move())
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        let csq = to_cozy_square(sq);
        let kind = self.board.piece_on(csq)?;
        let color = self.board.color_on(csq)?;
        Some(Piece {
            color: from_cozy_color(color),
            kind: from_cozy_piece(kind),
        })
    }

    /// All legal moves for the side to move, castling as a two-file king move.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut out = Vec::with_capacity(64);
        self.board.generate_moves(|moves| {
            for mv in moves {
                out.push(self.from_cozy_move(mv));
            }
            false
        });
        out
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.legal_moves().contains(&mv)
    }

    /// Apply a legal move, returning the successor position.
    pub fn apply(&self, mv: Move) -> Result<Position, RulesError> {
        if !self.is_legal(mv) {
            return Err(RulesError::IllegalMove(mv));
        }
        let cmv = self.to_cozy_move(mv);
        let us = self.board.side_to_move();
        let is_pawn = self.board.piece_on(cmv.from) == Some(cozy_chess::Piece::Pawn);
        let is_capture = self.board.color_on(cmv.to) == Some(!us);

        let mut board = self.board.clone();
        board.play_unchecked(cmv);
        let reversible_plies = if is_pawn || is_capture {
            0
        } else {
            self.reversible_plies + 1
        };
        Ok(Position {
            board,
            reversible_plies,
        })
    }

    pub fn is_check(&self) -> bool {
        !self.board.checkers().is_empty()
    }

    pub fn is_checkmate(&self) -> bool {
        self.is_check() && self.legal_moves().is_empty()
    }

    pub fn is_stalemate(&self) -> bool {
        !self.is_check() && self.legal_moves().is_empty()
    }

    /// Neither side can possibly deliver mate: bare kings, a single minor
    /// piece, or only bishops that all stand on one square color.
    pub fn is_insufficient_material(&self) -> bool {
        use cozy_chess::Piece as P;
        let heavy = self.board.pieces(P::Pawn) | self.board.pieces(P::Rook) | self.board.pieces(P::Queen);
        if !heavy.is_empty() {
            return false;
        }
        let knights = self.board.pieces(P::Knight);
        let bishops = self.board.pieces(P::Bishop);
        let minors = knights.len() + bishops.len();
        if minors <= 1 {
            return true;
        }
        if !knights.is_empty() {
            return false;
        }
        let light = bishops
            .into_iter()
            .filter(|&sq| from_cozy_square(sq).is_light())
            .count();
        light == 0 || light == bishops.len() as usize
    }

    pub fn is_75_move(&self) -> bool {
        self.reversible_plies >= SEVENTY_FIVE_MOVE_PLIES
    }

    /// Zobrist key of the position, equal for repeated positions.
    pub fn key(&self) -> u64 {
        self.board.hash()
    }

    /// Whether this position occurred at least five times, counting the
    /// earlier positions of the game plus this one.
    pub fn is_fivefold_repetition<'a>(&self, earlier: impl IntoIterator<Item = &'a Position>) -> bool {
        let key = self.key();
        let repeats = earlier.into_iter().filter(|p| p.key() == key).count() + 1;
        repeats >= FIVEFOLD
    }

    /// Status after the game reached this position via `earlier`.
    pub fn status<'a>(&self, earlier: impl IntoIterator<Item = &'a Position>) -> GameStatus {
        let no_moves = self.legal_moves().is_empty();
        if no_moves && self.is_check() {
            GameStatus::Checkmate
        } else if no_moves {
            GameStatus::Stalemate
        } else if self.is_insufficient_material() {
            GameStatus::DrawInsufficientMaterial
        } else if self.is_75_move() {
            GameStatus::Draw75Move
        } else if self.is_fivefold_repetition(earlier) {
            GameStatus::DrawFivefoldRepetition
        } else {
            GameStatus::Ongoing
        }
    }

    /// Squares attacked by the piece on `sq`, own pieces included.
    pub fn attacks_from(&self, sq: Square) -> Vec<Square> {
        use cozy_chess::Piece as P;
        let csq = to_cozy_square(sq);
        let (kind, color) = match (self.board.piece_on(csq), self.board.color_on(csq)) {
            (Some(k), Some(c)) => (k, c),
            _ => return Vec::new(),
        };
        let occupied = self.board.occupied();
        let attacks: BitBoard = match kind {
            P::Pawn => cozy_chess::get_pawn_attacks(csq, color),
            P::Knight => cozy_chess::get_knight_moves(csq),
            P::Bishop => cozy_chess::get_bishop_moves(csq, occupied),
            P::Rook => cozy_chess::get_rook_moves(csq, occupied),
            P::Queen => {
                cozy_chess::get_bishop_moves(csq, occupied) | cozy_chess::get_rook_moves(csq, occupied)
            }
            P::King => cozy_chess::get_king_moves(csq),
        };
        attacks.into_iter().map(from_cozy_square).collect()
    }

    /// Standard algebraic notation of a legal move in this position.
    pub fn to_notation(&self, mv: Move) -> String {
        notation::san(self, mv)
    }

    /// Find the legal move `from -> to`, preferring `promotion` if given.
    pub fn find_move(&self, from: Square, to: Square, promotion: Option<PieceKind>) -> Option<Move> {
        let candidate = Move {
            from,
            to,
            promotion,
        };
        self.legal_moves().into_iter().find(|&m| m == candidate)
    }

    fn to_cozy_move(&self, mv: Move) -> cozy_chess::Move {
        let from = to_cozy_square(mv.from);
        let mut to = to_cozy_square(mv.to);
        let is_king = self.board.piece_on(from) == Some(cozy_chess::Piece::King);
        let file_delta = i32::from(mv.to.file()) - i32::from(mv.from.file());
        if is_king && file_delta.abs() == 2 && mv.from.rank() == mv.to.rank() {
            let rook_file = if file_delta > 0 { 7 } else { 0 };
            to = to_cozy_square(Square::from_board_index(mv.from.rank() * 8 + rook_file));
        }
        cozy_chess::Move {
            from,
            to,
            promotion: mv.promotion.map(to_cozy_piece),
        }
    }

    fn from_cozy_move(&self, mv: cozy_chess::Move) -> Move {
        let from = from_cozy_square(mv.from);
        let mut to = from_cozy_square(mv.to);
        let us = self.board.side_to_move();
        let castles = self.board.piece_on(mv.from) == Some(cozy_chess::Piece::King)
            && self.board.color_on(mv.to) == Some(us);
        if castles {
            let king_file = if to.file() > from.file() { 6 } else { 2 };
            to = Square::from_board_index(from.rank() * 8 + king_file);
        }
        Move {
            from,
            to,
            promotion: mv.promotion.map(from_cozy_piece),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.reversible_plies == other.reversible_plies && self.fen() == other.fen()
    }
}

impl Eq for Position {}

impl fmt::Display for Position {
    /// Board diagram, rank 8 at the top.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8u8 {
                let sq = Square::from_board_index(rank * 8 + file);
                let ch = self.piece_at(sq).map(Piece::symbol).unwrap_or('.');
                write!(f, " {ch}")?;
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}

fn to_cozy_square(sq: Square) -> cozy_chess::Square {
    cozy_chess::Square::index(usize::from(sq.index()))
}

fn from_cozy_square(sq: cozy_chess::Square) -> Square {
    Square::from_board_index(sq as u8)
}

fn from_cozy_color(c: cozy_chess::Color) -> Color {
    match c {
        cozy_chess::Color::White => Color::White,
        cozy_chess::Color::Black => Color::Black,
    }
}

fn to_cozy_piece(kind: PieceKind) -> cozy_chess::Piece {
    match kind {
        PieceKind::Pawn => cozy_chess::Piece::Pawn,
        PieceKind::Knight => cozy_chess::Piece::Knight,
        PieceKind::Bishop => cozy_chess::Piece::Bishop,
        PieceKind::Rook => cozy_chess::Piece::Rook,
        PieceKind::Queen => cozy_chess::Piece::Queen,
        PieceKind::King => cozy_chess::Piece::King,
    }
}

fn from_cozy_piece(p: cozy_chess::Piece) -> PieceKind {
    match p {
        cozy_chess::Piece::Pawn => PieceKind::Pawn,
        cozy_chess::Piece::Knight => PieceKind::Knight,
        cozy_chess::Piece::Bishop => PieceKind::Bishop,
        cozy_chess::Piece::Rook => PieceKind::Rook,
        cozy_chess::Piece::Queen => PieceKind::Queen,
        cozy_chess::Piece::King => PieceKind::King,
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod rules_tests;

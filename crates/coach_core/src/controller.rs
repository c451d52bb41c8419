//! Game controller: selection state machine, move history and overlays.
//!
//! The human plays the side to move by selecting squares. After every human
//! move the engine replies at once; if it cannot, the human move stays on the
//! board and the game simply waits for the next selection. Once the engine
//! process is lost the controller carries on as a two-player board.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisClient, SharedClient};
use crate::config::CoachConfig;
use crate::error::{CoachError, EngineError};
use crate::knight_path::shortest_path;
use crate::overlay::{self, MoveTree, OverlayData, OverlayQuery};
use crate::rules::{GameStatus, Position};
use crate::types::{Color, Move, PieceKind, Square};
use crate::uci::GameLine;
use crate::worker::{OverlayResult, OverlayWorker};

/// Where the controller is in the move-input cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    AwaitingSelection,
    PieceSelected(Square),
    EngineTurn,
    GameOver(GameStatus),
}

/// One applied ply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub mv: Move,
    /// SAN in the position before the move
    pub san: String,
    /// Position before the move, restored on undo
    pub before: Position,
}

/// What a square selection did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nothing happened (empty or enemy square, or the game is over)
    Ignored,
    /// A piece of the side to move is now selected
    Selected(Square),
    /// The selected piece cannot go there; the selection was dropped
    Rejected(Move),
    /// The move was played, possibly followed by the engine's reply
    Played(TurnReport),
    /// Knight mode: start square picked
    KnightStart(Square),
    /// Knight mode: shortest path from the start to the picked square
    KnightPath(Vec<Square>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub human: String,
    pub reply: Option<String>,
    pub status: GameStatus,
}

/// Engine state as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineHealth {
    pub name: Option<String>,
    pub available: bool,
    pub skill: Option<u8>,
}

/// Read-only view of everything a front end draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub fen: String,
    pub side_to_move: Color,
    pub state: ControllerState,
    pub status: GameStatus,
    pub message: Option<String>,
    pub history_depth: usize,
    pub moves: Vec<String>,
    pub selection: Option<Square>,
    pub legal_targets: Vec<Square>,
    pub knight_mode: bool,
    pub knight_start: Option<Square>,
    pub knight_path: Vec<Square>,
    pub attack_mode: bool,
    pub attack_origin: Option<Square>,
    pub attacked: Vec<Square>,
    pub overlay: Option<OverlayData>,
    pub engine: EngineHealth,
    pub notice: Option<String>,
}

pub struct GameController {
    config: CoachConfig,
    /// Position the game started from
    root: Position,
    /// Current position
    position: Position,
    history: Vec<HistoryEntry>,
    status: GameStatus,
    state: ControllerState,
    /// Square of the piece picked for a human move
    selection: Option<Square>,
    knight_mode: bool,
    knight_start: Option<Square>,
    knight_path: Vec<Square>,
    attack_mode: bool,
    attack_origin: Option<Square>,
    /// Overlay for the current position, if one has been computed
    overlay: Option<OverlayData>,
    engine: Option<SharedClient>,
    engine_name: Option<String>,
    skill: Option<u8>,
    /// Set once the engine process is gone for good
    engine_lost: bool,
    worker: Option<OverlayWorker>,
    /// Latest engine problem worth telling the player about
    notice: Option<String>,
}

impl GameController {
    /// New game from the configured start position. Without an engine the
    /// controller is a plain two-player board.
    pub fn new(config: CoachConfig, engine: Option<AnalysisClient>) -> Result<Self, CoachError> {
        let root = Position::from_fen(&config.start_fen)?;
        let engine_name = engine
            .as_ref()
            .and_then(|c| c.engine_name().map(str::to_string));
        let skill = engine.as_ref().map(AnalysisClient::skill_level);
        let mut controller = Self {
            config,
            position: root.clone(),
            root,
            history: Vec::new(),
            status: GameStatus::Ongoing,
            state: ControllerState::AwaitingSelection,
            selection: None,
            knight_mode: false,
            knight_start: None,
            knight_path: Vec::new(),
            attack_mode: false,
            attack_origin: None,
            overlay: None,
            engine_lost: engine.is_none(),
            engine: engine.map(AnalysisClient::into_shared),
            engine_name,
            skill,
            worker: None,
            notice: None,
        };
        controller.recompute_status();
        controller.settle_state();
        Ok(controller)
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn overlay(&self) -> Option<&OverlayData> {
        self.overlay.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    /// Whether engine features are still in use.
    pub fn engine_available(&self) -> bool {
        self.engine.is_some() && !self.engine_lost
    }

    /// The game so far as the engine is told about it.
    pub fn game_line(&self) -> GameLine {
        let moves: Vec<Move> = self.history.iter().map(|h| h.mv).collect();
        GameLine::from_parts(self.root.clone(), moves, self.position.clone())
    }

    /// Select by raw coordinates, rejecting anything off the board.
    pub fn select_coords(&mut self, file: i32, rank: i32) -> Result<MoveOutcome, CoachError> {
        let sq = Square::new(file, rank)?;
        Ok(self.select(sq))
    }

    /// Handle a click on `sq`.
    pub fn select(&mut self, sq: Square) -> MoveOutcome {
        if let ControllerState::GameOver(_) = self.state {
            return MoveOutcome::Ignored;
        }
        if self.knight_mode {
            return self.select_for_knight(sq);
        }

        let Some(origin) = self.selection.take() else {
            return self.select_origin(sq);
        };
        self.state = ControllerState::AwaitingSelection;

        let mv = self.candidate_move(origin, sq);
        if !self.position.is_legal(mv) {
            debug!(%mv, "rejected move");
            return MoveOutcome::Rejected(mv);
        }
        let human = match self.push_move(mv) {
            Ok(san) => san,
            Err(e) => {
                warn!(error = %e, "legal move failed to apply");
                return MoveOutcome::Rejected(mv);
            }
        };

        let reply = if self.status.is_terminal() {
            self.settle_state();
            None
        } else {
            self.state = ControllerState::EngineTurn;
            self.engine_turn()
        };
        MoveOutcome::Played(TurnReport {
            human,
            reply,
            status: self.status,
        })
    }

    fn select_origin(&mut self, sq: Square) -> MoveOutcome {
        match self.position.piece_at(sq) {
            Some(piece) if piece.color == self.position.side_to_move() => {
                self.selection = Some(sq);
                self.state = ControllerState::PieceSelected(sq);
                if self.attack_mode {
                    self.attack_origin = Some(sq);
                }
                MoveOutcome::Selected(sq)
            }
            _ => MoveOutcome::Ignored,
        }
    }

    fn select_for_knight(&mut self, sq: Square) -> MoveOutcome {
        match self.knight_start.take() {
            None => match self.position.piece_at(sq) {
                Some(piece)
                    if piece.kind == PieceKind::Knight
                        && piece.color == self.position.side_to_move() =>
                {
                    self.knight_start = Some(sq);
                    self.knight_path.clear();
                    MoveOutcome::KnightStart(sq)
                }
                _ => MoveOutcome::Ignored,
            },
            Some(start) => {
                self.knight_path = shortest_path(start, sq);
                MoveOutcome::KnightPath(self.knight_path.clone())
            }
        }
    }

    /// The move a click from `origin` to `to` means. Pawns reaching the last
    /// rank promote to a queen.
    fn candidate_move(&self, origin: Square, to: Square) -> Move {
        match self.position.piece_at(origin) {
            Some(piece) if piece.kind == PieceKind::Pawn && to.rank() == piece.color.promotion_rank() => {
                Move::with_promotion(origin, to, PieceKind::Queen)
            }
            _ => Move::new(origin, to),
        }
    }

    /// Apply a legal move and record it. Returns its SAN.
    fn push_move(&mut self, mv: Move) -> Result<String, CoachError> {
        let san = self.position.to_notation(mv);
        let next = self.position.apply(mv)?;
        let before = std::mem::replace(&mut self.position, next);
        self.history.push(HistoryEntry { mv, san: san.clone(), before });
        self.clear_overlay();
        self.recompute_status();
        Ok(san)
    }

    fn engine_turn(&mut self) -> Option<String> {
        if !self.engine_available() {
            self.settle_state();
            return None;
        }
        let line = self.game_line();
        let limit = self.config.timing.reply_limit();
        let reply = match self.with_engine(|engine| engine.best_move(&line, &limit)) {
            Ok(mv) => match self.push_move(mv) {
                Ok(san) => Some(san),
                Err(e) => {
                    warn!(error = %e, "engine move could not be applied");
                    self.notice = Some(format!("Engine move rejected: {e}"));
                    None
                }
            },
            Err(_) => None,
        };
        self.settle_state();
        reply
    }

    /// Take back the last two plies (or what there is).
    pub fn undo(&mut self) -> usize {
        let mut popped = 0;
        while popped < 2 {
            let Some(entry) = self.history.pop() else { break };
            self.position = entry.before;
            popped += 1;
        }
        self.selection = None;
        self.attack_origin = None;
        self.knight_start = None;
        self.knight_path.clear();
        self.clear_overlay();
        self.recompute_status();
        self.settle_state();
        popped
    }

    pub fn toggle_knight_mode(&mut self) -> bool {
        self.knight_mode = !self.knight_mode;
        self.knight_start = None;
        self.knight_path.clear();
        self.clear_selection();
        self.knight_mode
    }

    pub fn toggle_attack_mode(&mut self) -> bool {
        self.attack_mode = !self.attack_mode;
        self.attack_origin = None;
        self.clear_selection();
        self.attack_mode
    }

    /// Turn every overlay mode on.
    pub fn show_all(&mut self) {
        self.knight_mode = true;
        self.attack_mode = true;
        self.clear_selection();
    }

    /// Forward a skill level to the engine. Returns the level actually used.
    pub fn set_skill_level(&mut self, level: i32) -> Option<u8> {
        if let Some(worker) = self.worker.as_mut() {
            worker.cancel();
        }
        let skill = self.with_engine(|engine| Ok(engine.configure_skill(level))).ok()?;
        self.skill = Some(skill);
        Some(skill)
    }

    /// Recompute the overlay for the current position, blocking.
    pub fn refresh_overlay(&mut self) -> Option<&OverlayData> {
        if !self.engine_available() {
            return None;
        }
        if let Some(worker) = self.worker.as_mut() {
            worker.cancel();
        }
        let line = self.game_line();
        let query = OverlayQuery::from_config(&self.config);
        let aggregated = self.with_engine(|engine| Ok(overlay::aggregate(engine, &line, &query)));
        if let Ok(result) = aggregated {
            if let Some(e) = &result.failure {
                self.note_engine_failure(e);
            }
            if self.engine_available() {
                self.overlay = Some(result.overlay);
            }
        }
        self.overlay.as_ref()
    }

    /// Start refreshing overlays on a background thread.
    pub fn enable_background_overlays(&mut self) {
        if self.worker.is_some() || !self.engine_available() {
            return;
        }
        if let Some(engine) = &self.engine {
            self.worker = Some(OverlayWorker::spawn(Arc::clone(engine)));
        }
    }

    /// Ask the background worker for a fresh overlay. The current one stays
    /// visible until the result arrives.
    pub fn request_overlay(&mut self) -> Option<u64> {
        if !self.engine_available() {
            return None;
        }
        let line = self.game_line();
        let query = OverlayQuery::from_config(&self.config);
        self.worker.as_mut().map(|w| w.submit(line, query))
    }

    /// Install a finished background overlay, if one for the current
    /// position has arrived. Returns whether the overlay changed.
    pub fn poll_overlay(&mut self) -> bool {
        let result = self.worker.as_mut().and_then(OverlayWorker::poll);
        self.install_overlay(result)
    }

    /// Like [`poll_overlay`](Self::poll_overlay) but waits up to `timeout`
    /// for the pending result.
    pub fn wait_overlay(&mut self, timeout: Duration) -> bool {
        let result = self.worker.as_mut().and_then(|w| w.wait(timeout));
        self.install_overlay(result)
    }

    fn install_overlay(&mut self, result: Option<OverlayResult>) -> bool {
        let Some(result) = result else {
            return false;
        };
        if let Some(e) = &result.failure {
            self.note_engine_failure(e);
        }
        if !self.engine_available() || result.overlay.position_key != self.position.key() {
            return false;
        }
        self.overlay = Some(result.overlay);
        true
    }

    /// One-level tree of the engine's favourite moves.
    pub fn move_tree(&mut self) -> Result<MoveTree, EngineError> {
        if let Some(worker) = self.worker.as_mut() {
            worker.cancel();
        }
        let line = self.game_line();
        let width = self.config.overlay.tree_width;
        let limit = self.config.timing.top_moves_limit();
        self.with_engine(|engine| overlay::move_tree(engine, &line, width, &limit))
    }

    /// Squares the selected piece can move to.
    pub fn legal_targets(&self) -> Vec<Square> {
        let Some(from) = self.selection else {
            return Vec::new();
        };
        let mut targets: Vec<Square> = self
            .position
            .legal_moves()
            .into_iter()
            .filter(|m| m.from == from)
            .map(|m| m.to)
            .collect();
        targets.sort();
        targets.dedup();
        targets
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            fen: self.position.fen(),
            side_to_move: self.position.side_to_move(),
            state: self.state,
            status: self.status,
            message: self.status.message().map(str::to_string),
            history_depth: self.history.len(),
            moves: self.history.iter().map(|h| h.san.clone()).collect(),
            selection: self.selection,
            legal_targets: self.legal_targets(),
            knight_mode: self.knight_mode,
            knight_start: self.knight_start,
            knight_path: self.knight_path.clone(),
            attack_mode: self.attack_mode,
            attack_origin: self.attack_origin,
            attacked: self
                .attack_origin
                .map(|sq| self.position.attacks_from(sq))
                .unwrap_or_default(),
            overlay: self.overlay.clone(),
            engine: EngineHealth {
                name: self.engine_name.clone(),
                available: self.engine_available(),
                skill: self.skill,
            },
            notice: self.notice.clone(),
        }
    }

    /// Shut the engine down. Safe to call more than once.
    pub fn quit(&mut self) {
        self.worker.take();
        if let Some(engine) = self.engine.take() {
            match engine.lock() {
                Ok(mut engine) => engine.shutdown(),
                Err(poisoned) => poisoned.into_inner().shutdown(),
            }
            info!("engine released");
        }
    }

    /// Run `f` against the engine, recording any failure.
    fn with_engine<T>(
        &mut self,
        f: impl FnOnce(&mut AnalysisClient) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let engine = match &self.engine {
            Some(engine) if !self.engine_lost => Arc::clone(engine),
            _ => return Err(EngineError::Unavailable),
        };
        let result = match engine.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(_) => Err(EngineError::Unavailable),
        };
        if let Err(e) = &result {
            self.note_engine_failure(e);
        }
        result
    }

    fn note_engine_failure(&mut self, e: &EngineError) {
        match e {
            EngineError::Cancelled => debug!("engine query cancelled"),
            e if e.is_fatal() => {
                warn!(error = %e, "engine lost, continuing without it");
                self.engine_lost = true;
                self.overlay = None;
                self.worker.take();
                self.notice = Some(format!("Engine lost ({e}); both sides are now yours."));
            }
            e => {
                warn!(error = %e, "engine query failed");
                self.notice = Some(format!("Engine: {e}"));
            }
        }
    }

    fn clear_overlay(&mut self) {
        self.overlay = None;
        if let Some(worker) = self.worker.as_mut() {
            worker.cancel();
        }
    }

    fn clear_selection(&mut self) {
        self.selection = None;
        if let ControllerState::PieceSelected(_) = self.state {
            self.state = ControllerState::AwaitingSelection;
        }
    }

    fn recompute_status(&mut self) {
        self.status = self.position.status(self.history.iter().map(|h| &h.before));
        if let Some(msg) = self.status.message() {
            info!(status = ?self.status, "{msg}");
        }
    }

    fn settle_state(&mut self) {
        self.state = if self.status.is_terminal() {
            ControllerState::GameOver(self.status)
        } else {
            ControllerState::AwaitingSelection
        };
    }
}

impl Drop for GameController {
    fn drop(&mut self) {
        self.quit();
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;

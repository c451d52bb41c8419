pub mod analysis;
pub mod config;
pub mod controller;
pub mod error;
pub mod knight_path;
pub mod notation;
pub mod overlay;
pub mod rules;
pub mod time_control;
pub mod transport;
pub mod types;
pub mod uci;
pub mod worker;

// Value types and rules, used everywhere
pub use error::*;
pub use knight_path::{knight_distance, shortest_path};
pub use rules::*;
pub use time_control::*;
pub use types::*;

// Engine plumbing
pub use analysis::{AnalysisClient, RankedMove, SharedClient, MAX_SKILL};
pub use transport::{EngineTransport, ProcessTransport, ScriptHandle, ScriptedTransport};
pub use uci::{GameLine, Score, MATE_SCORE};

// Game layer
pub use config::{CoachConfig, EngineSettings, OverlaySettings, TimingSettings};
pub use controller::{
    ControllerState, EngineHealth, GameController, HistoryEntry, MoveOutcome, Snapshot, TurnReport,
};
pub use overlay::{MoveTree, OverlayData, TreeNode};
pub use worker::OverlayWorker;

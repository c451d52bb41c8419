//! Error taxonomy for the coach core.
//!
//! Engine failures are translated into [`EngineError`] at the analysis client
//! boundary; nothing above it sees raw I/O or protocol text.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Move;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SquareError {
    #[error("square out of range: file {file}, rank {rank}")]
    OutOfRange { file: i32, rank: i32 },
    #[error("not a square: {0:?}")]
    Unparsable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("illegal move {0}")]
    IllegalMove(Move),
    #[error("invalid FEN {fen:?}: {reason}")]
    InvalidFen { fen: String, reason: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine did not answer within the time limit")]
    Timeout,
    #[error("engine is not running")]
    Unavailable,
    #[error("engine protocol error: {0}")]
    Protocol(String),
    #[error("engine process failed: {0}")]
    ProcessFailure(String),
    #[error("engine query cancelled")]
    Cancelled,
    #[error("failed to start engine {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    /// Whether the engine can no longer be used at all.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Unavailable | EngineError::ProcessFailure(_) | EngineError::Spawn { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum CoachError {
    #[error("invalid square: {0}")]
    InvalidSquare(#[from] SquareError),
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

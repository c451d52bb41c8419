//! Coach configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) gives a
//! working setup that looks for `stockfish` on the `PATH`.
//!
//! ```toml
//! start_fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
//!
//! [engine]
//! path = "/usr/games/stockfish"
//! skill_level = 5
//!
//! [timing]
//! reply_ms = 250
//!
//! [overlay]
//! top_moves = 3
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::rules::STARTPOS_FEN;
use crate::time_control::TimeLimit;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    pub engine: EngineSettings,
    pub timing: TimingSettings,
    pub overlay: OverlaySettings,
    /// Position the game starts from
    pub start_fen: String,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            timing: TimingSettings::default(),
            overlay: OverlaySettings::default(),
            start_fen: STARTPOS_FEN.to_string(),
        }
    }
}

impl CoachConfig {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => {
                info!(path = %path.display(), "loaded config");
                Self::from_toml_str(&text, path)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// How to run and talk to the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Engine executable
    pub path: PathBuf,
    /// Extra command line arguments
    pub args: Vec<String>,
    /// Initial skill level (0-20), clamped when sent
    pub skill_level: i32,
    /// Time allowed for the `uci`/`isready` handshake
    pub handshake_timeout_ms: u64,
    /// Extra time, on top of a query's budget, before it counts as timed out
    pub reply_grace_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stockfish"),
            args: Vec::new(),
            skill_level: 10,
            handshake_timeout_ms: 5000,
            reply_grace_ms: 500,
        }
    }
}

impl EngineSettings {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn reply_grace(&self) -> Duration {
        Duration::from_millis(self.reply_grace_ms)
    }
}

/// Thinking time per kind of query, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub reply_ms: u64,
    pub eval_ms: u64,
    pub top_moves_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            reply_ms: 100,
            eval_ms: 100,
            top_moves_ms: 1000,
        }
    }
}

impl TimingSettings {
    pub fn reply_limit(&self) -> TimeLimit {
        TimeLimit::from_millis(self.reply_ms)
    }

    pub fn eval_limit(&self) -> TimeLimit {
        TimeLimit::from_millis(self.eval_ms)
    }

    pub fn top_moves_limit(&self) -> TimeLimit {
        TimeLimit::from_millis(self.top_moves_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// Number of ranked moves shown
    pub top_moves: usize,
    /// Evaluations are clamped to +/- this many centipawns for display
    pub eval_clamp: i32,
    /// Children in the move tree view
    pub tree_width: usize,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            top_moves: 5,
            eval_clamp: 1000,
            tree_width: 3,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

//! Evaluation bar and candidate-move overlays.
//!
//! [`aggregate`] asks the engine for an evaluation and the top lines of one
//! position and packages them for display. A failure in either query blanks
//! that half only; nothing is cached between refreshes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{AnalysisClient, RankedMove};
use crate::config::CoachConfig;
use crate::error::EngineError;
use crate::time_control::TimeLimit;
use crate::uci::GameLine;

/// Display data for one position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayData {
    /// Clamped evaluation in centipawns, white's point of view
    pub evaluation: Option<i32>,
    /// White's share of the evaluation bar, in `[0, 1]`
    pub bar_fraction: Option<f64>,
    pub top_moves: Vec<RankedMove>,
    /// Key of the position this was computed for
    pub position_key: u64,
}

/// Result of one refresh, with the first engine failure if there was one.
#[derive(Debug)]
pub struct Aggregated {
    pub overlay: OverlayData,
    pub failure: Option<EngineError>,
}

/// Budgets and sizes for one overlay refresh. Both limits share a stop flag.
#[derive(Clone, Debug)]
pub struct OverlayQuery {
    pub eval_limit: TimeLimit,
    pub top_limit: TimeLimit,
    pub top_moves: usize,
    pub eval_clamp: i32,
}

impl OverlayQuery {
    pub fn from_config(config: &CoachConfig) -> Self {
        let eval_limit = config.timing.eval_limit();
        let top_limit = eval_limit.with_budget(config.timing.top_moves_limit().budget());
        Self {
            eval_limit,
            top_limit,
            top_moves: config.overlay.top_moves,
            eval_clamp: config.overlay.eval_clamp,
        }
    }

    /// Cancel the refresh this query drives.
    pub fn stop(&self) {
        self.eval_limit.stop();
    }
}

/// Clamp a score into `[-clamp, clamp]`.
pub fn clamp_eval(score: i32, clamp: i32) -> i32 {
    let clamp = clamp.max(1);
    score.clamp(-clamp, clamp)
}

/// White's share of the bar for a clamped score: 0.5 is equal.
pub fn bar_fraction(clamped: i32, clamp: i32) -> f64 {
    let clamp = clamp.max(1);
    ((f64::from(clamped) / f64::from(clamp)) + 1.0) / 2.0
}

/// Evaluate `line` and collect its top moves.
pub fn aggregate(client: &mut AnalysisClient, line: &GameLine, query: &OverlayQuery) -> Aggregated {
    let mut overlay = OverlayData {
        position_key: line.current().key(),
        ..OverlayData::default()
    };
    let mut failure = None;

    match client.evaluation_of(line, &query.eval_limit) {
        Ok(score) => {
            let clamped = clamp_eval(score, query.eval_clamp);
            overlay.evaluation = Some(clamped);
            overlay.bar_fraction = Some(bar_fraction(clamped, query.eval_clamp));
        }
        Err(e) => {
            debug!(error = %e, "evaluation unavailable");
            failure = Some(e);
        }
    }

    match client.top_lines(line, query.top_moves, &query.top_limit) {
        Ok(moves) => overlay.top_moves = moves,
        Err(e) => {
            debug!(error = %e, "top moves unavailable");
            failure.get_or_insert(e);
        }
    }

    Aggregated { overlay, failure }
}

/// One level of the game tree: the engine's favourite replies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveTree {
    pub root_fen: String,
    pub children: Vec<TreeNode>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub notation: String,
    pub score: i32,
}

pub fn move_tree(
    client: &mut AnalysisClient,
    line: &GameLine,
    width: usize,
    limit: &TimeLimit,
) -> Result<MoveTree, EngineError> {
    let children = client
        .top_lines(line, width, limit)?
        .into_iter()
        .map(|m| TreeNode {
            notation: m.notation,
            score: m.score,
        })
        .collect();
    Ok(MoveTree {
        root_fen: line.current().fen(),
        children,
    })
}

#[cfg(test)]
#[path = "overlay_tests.rs"]
mod overlay_tests;

//! Typed client for a UCI analysis engine.
//!
//! The client owns the engine for its whole life: [`AnalysisClient::start`]
//! spawns and handshakes it, [`AnalysisClient::shutdown`] (or dropping the
//! client) makes it quit. Every query takes `&mut self`, so at most one
//! request is ever in flight; share the client behind a mutex
//! ([`SharedClient`]) when several threads need it.
//!
//! Queries start with an `isready` barrier. Anything the engine prints before
//! `readyok` belongs to an earlier, abandoned search and is thrown away.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::config::EngineSettings;
use crate::error::EngineError;
use crate::rules::Position;
use crate::time_control::{Deadline, TimeLimit};
use crate::transport::{EngineTransport, ProcessTransport};
use crate::types::Move;
use crate::uci::{self, EngineMessage, GameLine, InfoLine};

/// Highest `Skill Level` the engine accepts.
pub const MAX_SKILL: i32 = 20;

/// How often a waiting query wakes up to look at its stop flag.
const POLL_SLICE: Duration = Duration::from_millis(20);

/// Client shared between the controller and the overlay worker.
pub type SharedClient = Arc<Mutex<AnalysisClient>>;

/// One candidate move from a multi-PV search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedMove {
    /// SAN in the position it was suggested for
    pub notation: String,
    pub mv: Move,
    /// Centipawns from white's point of view, mates as sentinels
    pub score: i32,
}

pub struct AnalysisClient {
    transport: Option<Box<dyn EngineTransport>>,
    name: Option<String>,
    /// MultiPV value the engine currently has
    multipv: usize,
    skill: u8,
    handshake_timeout: Duration,
    reply_grace: Duration,
    /// A `go` was sent and its `bestmove` has not been read yet
    searching: bool,
}

impl AnalysisClient {
    /// Spawn the configured engine and bring it up.
    pub fn start(settings: &EngineSettings) -> Result<Self, EngineError> {
        let transport = ProcessTransport::spawn(&settings.path, &settings.args)?;
        Self::with_transport(Box::new(transport), settings)
    }

    /// Handshake over an existing transport and apply the skill level.
    pub fn with_transport(
        transport: Box<dyn EngineTransport>,
        settings: &EngineSettings,
    ) -> Result<Self, EngineError> {
        let mut client = Self {
            transport: Some(transport),
            name: None,
            multipv: 1,
            skill: 0,
            handshake_timeout: settings.handshake_timeout(),
            reply_grace: settings.reply_grace(),
            searching: false,
        };
        // On failure the client is dropped here, which terminates the engine
        client.handshake()?;
        client.configure_skill(settings.skill_level);
        info!(
            engine = client.engine_name().unwrap_or("unknown"),
            skill = client.skill,
            "engine ready"
        );
        Ok(client)
    }

    pub fn into_shared(self) -> SharedClient {
        Arc::new(Mutex::new(self))
    }

    pub fn is_available(&self) -> bool {
        self.transport.is_some()
    }

    /// Name from the engine's `id name` line.
    pub fn engine_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn skill_level(&self) -> u8 {
        self.skill
    }

    /// Clamp `level` into `0..=20` and send it. Never fails; a send failure
    /// is logged and leaves the client in whatever state the failure implies.
    pub fn configure_skill(&mut self, level: i32) -> u8 {
        let clamped = level.clamp(0, MAX_SKILL) as u8;
        if self.searching {
            self.drain_search();
        }
        let sent = self.send(&uci::set_option("Skill Level", clamped));
        if let Err(e) = self.settle(sent) {
            warn!(error = %e, level = clamped, "could not set skill level");
        }
        self.skill = clamped;
        clamped
    }

    /// The engine's move for the current position of `line`.
    pub fn best_move(&mut self, line: &GameLine, limit: &TimeLimit) -> Result<Move, EngineError> {
        let result = self.run_best_move(line, limit);
        self.settle(result)
    }

    /// Up to `n` distinct candidate moves, best first.
    ///
    /// Running out of time is not an error: whatever was collected by then is
    /// returned, possibly nothing.
    pub fn top_lines(
        &mut self,
        line: &GameLine,
        n: usize,
        limit: &TimeLimit,
    ) -> Result<Vec<RankedMove>, EngineError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let result = self.run_top_lines(line, n, limit);
        self.settle(result)
    }

    /// Score of the current position from white's point of view.
    pub fn evaluation_of(&mut self, line: &GameLine, limit: &TimeLimit) -> Result<i32, EngineError> {
        let result = self.run_evaluation(line, limit);
        self.settle(result)
    }

    /// Make the engine quit. Only the first call does anything.
    pub fn shutdown(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            info!(engine = self.engine_name().unwrap_or("unknown"), "shutting down engine");
            transport.terminate();
        }
        self.searching = false;
    }

    fn run_best_move(&mut self, line: &GameLine, limit: &TimeLimit) -> Result<Move, EngineError> {
        self.begin(line, 1, limit)?;
        let deadline = limit.start(self.reply_grace);
        loop {
            match self.read(&deadline, Some(limit))? {
                None => {
                    self.stop_search();
                    return Err(EngineError::Timeout);
                }
                Some(EngineMessage::BestMove(Some(text))) => {
                    return Move::from_uci(&text)
                        .filter(|&mv| line.current().is_legal(mv))
                        .ok_or_else(|| EngineError::Protocol(format!("illegal best move {text:?}")));
                }
                Some(EngineMessage::BestMove(None)) => {
                    return Err(EngineError::Protocol("engine returned no move".to_string()));
                }
                Some(_) => {}
            }
        }
    }

    fn run_top_lines(
        &mut self,
        line: &GameLine,
        n: usize,
        limit: &TimeLimit,
    ) -> Result<Vec<RankedMove>, EngineError> {
        self.begin(line, n, limit)?;
        let deadline = limit.start(Duration::ZERO);
        let position = line.current();

        // (first-seen rank, move) in arrival order
        let mut collected: Vec<(u32, RankedMove)> = Vec::with_capacity(n);
        let mut seen = HashSet::new();
        while collected.len() < n {
            match self.read(&deadline, Some(limit))? {
                None | Some(EngineMessage::BestMove(_)) => break,
                Some(EngineMessage::Info(info)) => {
                    let Some(ranked) = ranked_move(position, &info) else {
                        continue;
                    };
                    if seen.insert(ranked.notation.clone()) {
                        collected.push((info.multipv.unwrap_or(1), ranked));
                    }
                }
                Some(_) => {}
            }
        }
        if self.searching {
            self.stop_search();
        }

        // Stable, so equal ranks keep arrival order
        collected.sort_by_key(|(rank, _)| *rank);
        Ok(collected.into_iter().take(n).map(|(_, m)| m).collect())
    }

    fn run_evaluation(&mut self, line: &GameLine, limit: &TimeLimit) -> Result<i32, EngineError> {
        self.begin(line, 1, limit)?;
        let deadline = limit.start(self.reply_grace);
        let mut last = None;
        loop {
            match self.read(&deadline, Some(limit))? {
                None => {
                    self.stop_search();
                    break;
                }
                Some(EngineMessage::BestMove(_)) => break,
                Some(EngineMessage::Info(InfoLine {
                    score: Some(score),
                    multipv,
                    ..
                })) if multipv.unwrap_or(1) == 1 => last = Some(score),
                Some(_) => {}
            }
        }
        let side = line.current().side_to_move();
        last.map(|score| score.for_white(side)).ok_or(EngineError::Timeout)
    }

    fn handshake(&mut self) -> Result<(), EngineError> {
        let deadline = Deadline::after(self.handshake_timeout);
        self.send("uci")?;
        loop {
            match self.read(&deadline, None)? {
                None => return Err(EngineError::Timeout),
                Some(EngineMessage::IdName(name)) => self.name = Some(name),
                Some(EngineMessage::UciOk) => break,
                Some(_) => {}
            }
        }
        self.sync()
    }

    /// `isready` barrier: everything before `readyok` is discarded.
    fn sync(&mut self) -> Result<(), EngineError> {
        let deadline = Deadline::after(self.handshake_timeout);
        self.send("isready")?;
        loop {
            match self.read(&deadline, None)? {
                None => return Err(EngineError::Timeout),
                Some(EngineMessage::ReadyOk) => return Ok(()),
                Some(stale) => trace!(?stale, "discarding engine output"),
            }
        }
    }

    /// Prepare the engine and start a search on `line`.
    fn begin(&mut self, line: &GameLine, multipv: usize, limit: &TimeLimit) -> Result<(), EngineError> {
        if limit.is_stopped() {
            return Err(EngineError::Cancelled);
        }
        if self.searching {
            self.drain_search();
        }
        self.sync()?;
        if multipv != self.multipv {
            self.send(&uci::set_option("MultiPV", multipv))?;
            self.multipv = multipv;
        }
        self.send(&line.to_command())?;
        self.send(&uci::go_movetime(limit.budget_ms()))?;
        self.searching = true;
        Ok(())
    }

    /// Ask a running search to finish early. Its `bestmove` is read later.
    fn stop_search(&mut self) {
        if let Err(e) = self.send("stop") {
            debug!(error = %e, "failed to send stop");
        }
    }

    /// Wait for the `bestmove` of a stopped search so it cannot be mistaken
    /// for the answer to the next one.
    fn drain_search(&mut self) {
        let deadline = Deadline::after(self.reply_grace);
        while self.searching {
            match self.read(&deadline, None) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    warn!("engine did not finish its stopped search");
                    self.searching = false;
                }
                Err(_) => self.searching = false,
            }
        }
    }

    fn send(&mut self, line: &str) -> Result<(), EngineError> {
        let transport = self.transport.as_mut().ok_or(EngineError::Unavailable)?;
        debug!(command = line, "to engine");
        transport.send(line)
    }

    /// Next message before `deadline`, or `None` once it has passed.
    ///
    /// With a `limit`, waits in short slices and fails with `Cancelled` as
    /// soon as its stop flag is raised.
    fn read(
        &mut self,
        deadline: &Deadline,
        limit: Option<&TimeLimit>,
    ) -> Result<Option<EngineMessage>, EngineError> {
        loop {
            if limit.is_some_and(TimeLimit::is_stopped) {
                if self.searching {
                    self.stop_search();
                }
                return Err(EngineError::Cancelled);
            }
            if deadline.expired() {
                return Ok(None);
            }
            let until = match limit {
                Some(_) => deadline.capped(POLL_SLICE),
                None => deadline.instant(),
            };
            let transport = self.transport.as_mut().ok_or(EngineError::Unavailable)?;
            if let Some(line) = transport.recv_until(until)? {
                trace!(line = %line, "from engine");
                let msg = uci::parse_line(&line);
                if matches!(msg, EngineMessage::BestMove(_)) {
                    self.searching = false;
                }
                return Ok(Some(msg));
            }
        }
    }

    /// Drop the engine if `result` says its process is gone.
    fn settle<T>(&mut self, result: Result<T, EngineError>) -> Result<T, EngineError> {
        if let Err(EngineError::ProcessFailure(reason)) = &result {
            warn!(%reason, "engine process lost");
            self.shutdown();
        }
        result
    }
}

impl Drop for AnalysisClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Candidate move described by an `info` line, if it carries a score and a
/// legal first move.
fn ranked_move(position: &Position, info: &InfoLine) -> Option<RankedMove> {
    let score = info.score?;
    let mv = Move::from_uci(info.pv.first()?)?;
    if !position.is_legal(mv) {
        debug!(%mv, "ignoring illegal pv move");
        return None;
    }
    Some(RankedMove {
        notation: position.to_notation(mv),
        mv,
        score: score.for_white(position.side_to_move()),
    })
}

#[cfg(test)]
#[path = "analysis_tests.rs"]
mod analysis_tests;

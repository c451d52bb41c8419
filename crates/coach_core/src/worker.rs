//! Background overlay refreshes.
//!
//! The worker owns a thread that runs [`aggregate`] against the shared
//! client. Each request is tagged with a generation number; submitting a new
//! request (or cancelling) bumps the generation and raises the previous
//! request's stop flag, and results for anything but the newest generation
//! are thrown away on arrival.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::analysis::SharedClient;
use crate::error::EngineError;
use crate::overlay::{aggregate, Aggregated, OverlayData, OverlayQuery};
use crate::uci::GameLine;

struct OverlayRequest {
    generation: u64,
    line: GameLine,
    query: OverlayQuery,
}

/// A finished refresh.
#[derive(Debug)]
pub struct OverlayResult {
    pub generation: u64,
    pub overlay: OverlayData,
    pub failure: Option<EngineError>,
}

pub struct OverlayWorker {
    requests: Option<Sender<OverlayRequest>>,
    results: Receiver<OverlayResult>,
    generation: u64,
    /// Query of the newest request, kept so it can be stopped
    in_flight: Option<OverlayQuery>,
    thread: Option<JoinHandle<()>>,
}

impl OverlayWorker {
    pub fn spawn(client: SharedClient) -> Self {
        let (req_tx, req_rx) = crossbeam_channel::unbounded::<OverlayRequest>();
        let (res_tx, res_rx) = crossbeam_channel::unbounded();

        let thread = thread::Builder::new()
            .name("overlay-worker".to_string())
            .spawn(move || run(client, req_rx, res_tx))
            .map_err(|e| warn!(error = %e, "could not start overlay worker"))
            .ok();

        Self {
            requests: Some(req_tx),
            results: res_rx,
            generation: 0,
            in_flight: None,
            thread,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue a refresh for `line`, cancelling whatever ran before.
    /// Returns the new generation.
    pub fn submit(&mut self, line: GameLine, query: OverlayQuery) -> u64 {
        self.cancel();
        self.in_flight = Some(query.clone());
        let request = OverlayRequest {
            generation: self.generation,
            line,
            query,
        };
        if let Some(tx) = &self.requests {
            if tx.send(request).is_err() {
                warn!("overlay worker has stopped");
            }
        }
        self.generation
    }

    /// Stop the in-flight refresh and make any pending result stale.
    pub fn cancel(&mut self) {
        if let Some(query) = self.in_flight.take() {
            query.stop();
        }
        self.generation += 1;
    }

    /// The newest result for the current generation, if one has arrived.
    pub fn poll(&mut self) -> Option<OverlayResult> {
        let mut latest = None;
        while let Ok(result) = self.results.try_recv() {
            if let Some(current) = self.accept(result) {
                latest = Some(current);
            }
        }
        latest
    }

    /// Like [`poll`](Self::poll) but waits up to `timeout` for the result.
    pub fn wait(&mut self, timeout: Duration) -> Option<OverlayResult> {
        let deadline = Instant::now() + timeout;
        while let Ok(result) = self.results.recv_deadline(deadline) {
            if let Some(current) = self.accept(result) {
                return Some(current);
            }
        }
        None
    }

    fn accept(&mut self, result: OverlayResult) -> Option<OverlayResult> {
        if result.generation != self.generation {
            debug!(
                generation = result.generation,
                current = self.generation,
                "dropping stale overlay"
            );
            return None;
        }
        self.in_flight = None;
        Some(result)
    }
}

impl Drop for OverlayWorker {
    fn drop(&mut self) {
        self.cancel();
        // Closing the request channel ends the thread's loop
        self.requests.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run(client: SharedClient, requests: Receiver<OverlayRequest>, results: Sender<OverlayResult>) {
    while let Ok(mut request) = requests.recv() {
        // Only the newest queued request matters
        while let Ok(newer) = requests.try_recv() {
            request = newer;
        }
        if request.query.eval_limit.is_stopped() {
            continue;
        }

        let Aggregated { overlay, failure } = match client.lock() {
            Ok(mut engine) => aggregate(&mut engine, &request.line, &request.query),
            Err(_) => Aggregated {
                overlay: OverlayData::default(),
                failure: Some(EngineError::Unavailable),
            },
        };
        let result = OverlayResult {
            generation: request.generation,
            overlay,
            failure,
        };
        if results.send(result).is_err() {
            break;
        }
    }
    debug!("overlay worker finished");
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod worker_tests;

//! Line transports to a UCI engine.
//!
//! [`ProcessTransport`] drives a child process over its stdin/stdout; a
//! reader thread forwards stdout lines into a channel so reads can wait with
//! a deadline. [`ScriptedTransport`] answers from a closure instead and is
//! what the tests run against.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, trace, warn};

use crate::error::EngineError;

/// How long a child gets to exit after `quit` before it is killed.
const EXIT_GRACE: Duration = Duration::from_millis(500);

/// A bidirectional line channel to an engine.
pub trait EngineTransport: Send {
    /// Send one command line (without the trailing newline).
    fn send(&mut self, line: &str) -> Result<(), EngineError>;

    /// Wait for the next output line until `until`.
    ///
    /// `Ok(None)` means nothing arrived in time. An error means the engine
    /// is gone and no more lines will come.
    fn recv_until(&mut self, until: Instant) -> Result<Option<String>, EngineError>;

    /// Ask the engine to quit and release it. Calling this again is a no-op.
    fn terminate(&mut self);
}

/// An engine running as a child process.
pub struct ProcessTransport {
    path: PathBuf,
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
    reader: Option<JoinHandle<()>>,
}

impl ProcessTransport {
    pub fn spawn(path: &Path, args: &[String]) -> Result<Self, EngineError> {
        let mut child = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::ProcessFailure("engine stdout not captured".to_string()))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let reader = thread::Builder::new()
            .name("engine-stdout".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| EngineError::ProcessFailure(format!("reader thread: {e}")))?;

        debug!(path = %path.display(), pid = child.id(), "engine process started");
        Ok(Self {
            path: path.to_path_buf(),
            child,
            stdin,
            lines: rx,
            reader: Some(reader),
        })
    }
}

impl EngineTransport for ProcessTransport {
    fn send(&mut self, line: &str) -> Result<(), EngineError> {
        let stdin = self.stdin.as_mut().ok_or(EngineError::Unavailable)?;
        trace!(">> {line}");
        writeln!(stdin, "{line}")
            .and_then(|_| stdin.flush())
            .map_err(|e| EngineError::ProcessFailure(format!("write to engine: {e}")))
    }

    fn recv_until(&mut self, until: Instant) -> Result<Option<String>, EngineError> {
        match self.lines.recv_deadline(until) {
            Ok(line) => {
                trace!("<< {line}");
                Ok(Some(line))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(EngineError::ProcessFailure("engine closed its output".to_string()))
            }
        }
    }

    fn terminate(&mut self) {
        let Some(mut stdin) = self.stdin.take() else {
            return;
        };
        let _ = writeln!(stdin, "quit").and_then(|_| stdin.flush());
        drop(stdin);

        let give_up = Instant::now() + EXIT_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(path = %self.path.display(), %status, "engine exited");
                    break;
                }
                Ok(None) if Instant::now() < give_up => thread::sleep(Duration::from_millis(10)),
                _ => {
                    warn!(path = %self.path.display(), "engine did not exit, killing it");
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break;
                }
            }
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Handle for inspecting and breaking a [`ScriptedTransport`] from outside.
#[derive(Clone, Debug, Default)]
pub struct ScriptHandle {
    sent: Arc<Mutex<Vec<String>>>,
    dead: Arc<AtomicBool>,
}

impl ScriptHandle {
    /// Every line sent to the engine so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Simulate the engine process dying.
    pub fn kill(&self) {
        self.dead.store(true, Ordering::SeqCst);
    }

    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }
}

type Responder = Box<dyn FnMut(&str) -> Vec<String> + Send>;

/// An in-process stand-in for an engine.
///
/// `uci`, `isready` and `quit` are answered by the transport itself; every
/// other command is handed to the responder, whose returned lines become the
/// engine's output. When there is nothing queued, reads wait out their
/// deadline like a silent engine would.
pub struct ScriptedTransport {
    name: String,
    responder: Responder,
    pending: VecDeque<String>,
    handle: ScriptHandle,
}

impl ScriptedTransport {
    pub fn new(responder: impl FnMut(&str) -> Vec<String> + Send + 'static) -> Self {
        Self {
            name: "Scripted".to_string(),
            responder: Box::new(responder),
            pending: VecDeque::new(),
            handle: ScriptHandle::default(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn handle(&self) -> ScriptHandle {
        self.handle.clone()
    }
}

impl EngineTransport for ScriptedTransport {
    fn send(&mut self, line: &str) -> Result<(), EngineError> {
        if self.handle.is_dead() {
            return Err(EngineError::ProcessFailure("broken pipe".to_string()));
        }
        if let Ok(mut sent) = self.handle.sent.lock() {
            sent.push(line.to_string());
        }
        match line {
            "uci" => {
                self.pending.push_back(format!("id name {}", self.name));
                self.pending.push_back("uciok".to_string());
            }
            "isready" => self.pending.push_back("readyok".to_string()),
            "quit" => self.handle.kill(),
            _ => self.pending.extend((self.responder)(line)),
        }
        Ok(())
    }

    fn recv_until(&mut self, until: Instant) -> Result<Option<String>, EngineError> {
        if self.handle.is_dead() {
            return Err(EngineError::ProcessFailure("engine closed its output".to_string()));
        }
        if let Some(line) = self.pending.pop_front() {
            return Ok(Some(line));
        }
        thread::sleep(until.saturating_duration_since(Instant::now()));
        Ok(None)
    }

    fn terminate(&mut self) {
        if !self.handle.is_dead() {
            if let Ok(mut sent) = self.handle.sent.lock() {
                sent.push("quit".to_string());
            }
        }
        self.handle.kill();
        self.pending.clear();
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod transport_tests;

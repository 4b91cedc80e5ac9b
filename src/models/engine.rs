//! Engine process model - manages the UCI engine lifecycle and best-move
//! requests.
//!
//! Architecture:
//! - Engine I/O runs on OS threads (reader/writer)
//! - The game session polls the event channel from its own loop
//! - Each request carries the session generation; the reply is tagged with
//!   it so a reply that outlives its session can be recognised and dropped

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::{debug, info, warn};

use crate::domain::uci::{BestMove, UciCommand, UciOutputKind};
use crate::error::EngineError;

/// A best-move search for one position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    /// Session generation the request belongs to
    pub generation: u64,
    pub fen: String,
    pub depth: u32,
}

/// The single reply to an [`EngineRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReply {
    pub generation: u64,
    pub best: BestMove,
}

/// An external engine answering depth-limited best-move requests.
///
/// Requests are fire-and-forget; at most one reply arrives per request, and
/// possibly none at all if the engine dies.
pub trait EngineProcess {
    /// Launch the engine; a no-op if it is already running
    fn start(&mut self) -> Result<(), EngineError>;
    /// Tear the engine down. Replies to outstanding requests are lost.
    fn stop(&mut self);
    fn is_running(&self) -> bool;
    fn request(&mut self, request: EngineRequest);
    /// Next reply, if one has arrived
    fn poll_reply(&mut self) -> Option<EngineReply>;
}

/// Messages sent from the engine reader thread to the model
#[derive(Debug)]
enum EngineEvent {
    /// A line of output from the engine
    Output(String),
    /// Engine process exited
    Exited,
    /// Error occurred
    Error(String),
}

/// A UCI engine running as a child process
pub struct UciEngine {
    path: PathBuf,
    args: Vec<String>,
    /// Whether the engine is currently running
    running: bool,
    /// Generation of the request awaiting `bestmove`
    in_flight: Option<u64>,
    /// Channel receiver for engine events
    event_receiver: Option<Receiver<EngineEvent>>,
    /// Channel sender for commands to engine writer thread
    command_sender: Option<Sender<String>>,
    /// Handle to the engine process
    process: Option<Child>,
}

impl UciEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            running: false,
            in_flight: None,
            event_receiver: None,
            command_sender: None,
            process: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Send a UCI command to the engine
    fn send_command(&self, cmd: UciCommand) {
        if let Some(tx) = &self.command_sender {
            let _ = tx.send(cmd.to_string());
        }
    }
}

impl EngineProcess for UciEngine {
    fn start(&mut self) -> Result<(), EngineError> {
        if self.running {
            return Ok(());
        }

        let mut child = Command::new(&self.path)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: self.path.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(EngineError::Pipe { pipe: "stdin" })?;
        let stdout = child.stdout.take().ok_or(EngineError::Pipe { pipe: "stdout" })?;

        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>();
        let (cmd_tx, cmd_rx) = mpsc::channel::<String>();

        // Reader thread (OS thread for blocking I/O)
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                match line {
                    Ok(text) => {
                        if event_tx.send(EngineEvent::Output(text)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = event_tx.send(EngineEvent::Error(e.to_string()));
                        break;
                    }
                }
            }
            let _ = event_tx.send(EngineEvent::Exited);
        });

        // Writer thread
        thread::spawn(move || {
            let mut writer = stdin;
            while let Ok(cmd) = cmd_rx.recv() {
                if writeln!(writer, "{}", cmd).is_err() {
                    break;
                }
                if writer.flush().is_err() {
                    break;
                }
            }
        });

        self.process = Some(child);
        self.event_receiver = Some(event_rx);
        self.command_sender = Some(cmd_tx);
        self.running = true;
        self.in_flight = None;

        self.send_command(UciCommand::Uci);
        self.send_command(UciCommand::IsReady);
        self.send_command(UciCommand::UciNewGame);

        info!(path = %self.path.display(), "engine started");
        Ok(())
    }

    fn stop(&mut self) {
        if !self.running {
            return;
        }

        if self.in_flight.take().is_some() {
            self.send_command(UciCommand::Stop);
        }
        self.send_command(UciCommand::Quit);

        // Dropping the channels ends both I/O threads
        self.command_sender = None;
        self.event_receiver = None;

        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }

        self.running = false;
        info!("engine stopped");
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn request(&mut self, request: EngineRequest) {
        if !self.running {
            warn!(generation = request.generation, "engine not running, request dropped");
            return;
        }
        if self.in_flight.is_some() {
            // Superseded search; its bestmove would be misattributed
            self.send_command(UciCommand::Stop);
        }
        debug!(fen = %request.fen, depth = request.depth, "engine request");
        self.send_command(UciCommand::Position { fen: request.fen });
        self.send_command(UciCommand::GoDepth(request.depth));
        self.in_flight = Some(request.generation);
    }

    fn poll_reply(&mut self) -> Option<EngineReply> {
        loop {
            let event = self.event_receiver.as_ref()?.try_recv().ok()?;
            match event {
                EngineEvent::Output(line) => {
                    if let UciOutputKind::BestMove(best) = UciOutputKind::parse(&line) {
                        match self.in_flight.take() {
                            Some(generation) => return Some(EngineReply { generation, best }),
                            None => debug!(line = %line, "unsolicited bestmove ignored"),
                        }
                    }
                }
                EngineEvent::Exited => {
                    warn!("engine exited");
                    self.running = false;
                    self.in_flight = None;
                    self.event_receiver = None;
                    self.command_sender = None;
                    if let Some(mut child) = self.process.take() {
                        let _ = child.wait();
                    }
                    return None;
                }
                EngineEvent::Error(e) => {
                    warn!(error = %e, "engine output error");
                }
            }
        }
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

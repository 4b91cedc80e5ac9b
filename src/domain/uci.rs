//! UCI (Universal Chess Interface) protocol types and utilities.
//!
//! This module handles the text side of talking to a chess engine: the
//! commands we send for a depth-limited search and the `bestmove` reply we
//! wait for. Process spawning lives in the models layer.

use std::fmt;

/// Commands the engine driver sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    /// Search root given as a full FEN
    Position { fen: String },
    /// Depth-limited search
    GoDepth(u32),
    Stop,
    Quit,
}

impl fmt::Display for UciCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciCommand::Uci => f.write_str("uci"),
            UciCommand::IsReady => f.write_str("isready"),
            UciCommand::UciNewGame => f.write_str("ucinewgame"),
            UciCommand::Position { fen } => write!(f, "position fen {fen}"),
            UciCommand::GoDepth(depth) => write!(f, "go depth {depth}"),
            UciCommand::Stop => f.write_str("stop"),
            UciCommand::Quit => f.write_str("quit"),
        }
    }
}

/// Raw UCI output line, categorized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciOutputKind {
    /// "uciok" - engine is ready for UCI
    UciOk,
    /// "readyok" - engine is ready
    ReadyOk,
    /// "info ..." - analysis information
    Info(String),
    /// "bestmove ..." - result of a search
    BestMove(BestMove),
    /// Engine identification
    Id(String),
    /// Unknown/other output
    Other(String),
}

impl UciOutputKind {
    /// Parse a raw UCI output line into a categorized type
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if line == "uciok" {
            UciOutputKind::UciOk
        } else if line == "readyok" {
            UciOutputKind::ReadyOk
        } else if let Some(rest) = line.strip_prefix("info ") {
            UciOutputKind::Info(rest.to_string())
        } else if let Some(rest) = line.strip_prefix("bestmove") {
            UciOutputKind::BestMove(BestMove::parse(rest))
        } else if let Some(rest) = line.strip_prefix("id ") {
            UciOutputKind::Id(rest.to_string())
        } else {
            UciOutputKind::Other(line.to_string())
        }
    }
}

/// The move named in a `bestmove` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestMove {
    /// Coordinate move such as `e2e4` or `e7e8q`
    Move(String),
    /// `(none)` or an empty reply: the engine has no legal move
    NoMove,
}

impl BestMove {
    /// Parse the text after `bestmove`, ignoring any `ponder` suffix
    pub fn parse(rest: &str) -> Self {
        match rest.split_whitespace().next() {
            None | Some("(none)") | Some("0000") => BestMove::NoMove,
            Some(mv) => BestMove::Move(mv.to_string()),
        }
    }
}

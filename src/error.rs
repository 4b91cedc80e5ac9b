//! Error types for the game core
//!
//! Every boundary either degrades (content, engine, store) or reports a
//! typed failure (replay). None of these ever aborts a running session.

use std::path::PathBuf;

/// Opening books and game records that could not be read
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// File missing, unreadable, or not in the expected format
    #[error("Content unavailable at {path}: {reason}")]
    Unavailable { path: PathBuf, reason: String },
}

/// Errors raised while stepping through a recorded game
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// The record contains a move that is illegal in the replayed position
    #[error("Corrupt record: move {san:?} at ply {ply} is illegal")]
    CorruptRecord { ply: usize, san: String },

    /// No record is open
    #[error("No game record is open")]
    NotOpen,
}

/// Errors from the external engine process
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine binary could not be started
    #[error("Failed to start engine {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// stdin/stdout of the child could not be attached
    #[error("Failed to open engine {pipe}")]
    Pipe { pipe: &'static str },
}

/// Errors from the persisted achievement set
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Achievement store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Achievement store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors while loading settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Why a move was refused; never surfaced past a `bool`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    NoSession,
    GameOver,
    NotYourTurn,
    EmptySquare,
    NotYourPiece,
    Illegal,
}

impl std::fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            MoveRejection::NoSession => "no game in progress",
            MoveRejection::GameOver => "game is over",
            MoveRejection::NotYourTurn => "not your turn",
            MoveRejection::EmptySquare => "no piece on origin square",
            MoveRejection::NotYourPiece => "piece belongs to the opponent",
            MoveRejection::Illegal => "illegal move",
        };
        f.write_str(text)
    }
}

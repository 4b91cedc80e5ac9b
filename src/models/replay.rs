//! Replay of a stored game record, one ply at a time.

use shakmaty::san::SanPlus;
use shakmaty::{Chess, Position};
use tracing::{debug, warn};

use crate::domain::chess::position_fen;
use crate::domain::pgn::GameRecord;
use crate::error::ReplayError;

#[derive(Debug, Clone)]
struct ReplayState {
    record: GameRecord,
    /// Plies applied so far, in `0..=record.moves.len()`
    cursor: usize,
    position: Chess,
}

/// Read-only stepper over a recorded move list
#[derive(Debug, Default)]
pub struct ReplayController {
    state: Option<ReplayState>,
}

impl ReplayController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a PGN record at the initial position. Move legality is checked
    /// only while stepping.
    pub fn open(&mut self, record_text: &str) {
        let record = GameRecord::parse(record_text);
        debug!(title = %record.title(), plies = record.moves.len(), "replay opened");
        self.state = Some(ReplayState {
            record,
            cursor: 0,
            position: Chess::default(),
        });
    }

    pub fn close(&mut self) {
        self.state = None;
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Apply the next recorded move. `Ok(false)` at the end of the record.
    /// A move that does not apply leaves the cursor where it is.
    pub fn step_forward(&mut self) -> Result<bool, ReplayError> {
        let state = self.state.as_mut().ok_or(ReplayError::NotOpen)?;
        let Some(san) = state.record.moves.get(state.cursor) else {
            return Ok(false);
        };

        match apply_san(&state.position, state.cursor, san) {
            Ok(position) => {
                state.position = position;
                state.cursor += 1;
                Ok(true)
            }
            Err(err) => {
                warn!(error = %err, "replay halted");
                Err(err)
            }
        }
    }

    /// Go back one ply, rebuilding the position from the start.
    /// `Ok(false)` at the initial position.
    pub fn step_backward(&mut self) -> Result<bool, ReplayError> {
        let state = self.state.as_mut().ok_or(ReplayError::NotOpen)?;
        if state.cursor == 0 {
            return Ok(false);
        }
        let cursor = state.cursor - 1;
        let mut position = Chess::default();
        for (ply, san) in state.record.moves[..cursor].iter().enumerate() {
            position = apply_san(&position, ply, san)?;
        }
        state.position = position;
        state.cursor = cursor;
        Ok(true)
    }

    pub fn title(&self) -> Option<String> {
        self.state.as_ref().map(|s| s.record.title())
    }

    pub fn record(&self) -> Option<&GameRecord> {
        self.state.as_ref().map(|s| &s.record)
    }

    pub fn position(&self) -> Option<&Chess> {
        self.state.as_ref().map(|s| &s.position)
    }

    pub fn fen(&self) -> Option<String> {
        self.position().map(position_fen)
    }

    pub fn cursor(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.cursor)
    }

    /// Number of recorded plies
    pub fn len(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.record.moves.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn apply_san(position: &Chess, ply: usize, san: &str) -> Result<Chess, ReplayError> {
    let corrupt = || ReplayError::CorruptRecord {
        ply,
        san: san.to_string(),
    };
    let parsed: SanPlus = san.parse().map_err(|_| corrupt())?;
    let m = parsed.san.to_move(position).map_err(|_| corrupt())?;
    position.clone().play(m).map_err(|_| corrupt())
}

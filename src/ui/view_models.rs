//! View models for the terminal pages.
//!
//! These types are DTOs that prepare game and content state for display.
//! They live in the UI layer, not the domain layer.

/// A full move: white's ply and, if played, black's reply
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveRow {
    pub move_num: usize,
    pub white: String,
    pub black: Option<String>,
}

/// A line of the opening browser
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpeningRow {
    pub key: String,
    pub name: String,
    pub description: String,
    /// Numbered SAN moves on one line
    pub moves: String,
    pub unlocked: bool,
}

/// A player's line in the standings table
#[derive(Clone, Debug, PartialEq)]
pub struct StandingRow {
    pub player: String,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub points: f32,
}

//! Chooses where the AI's next move comes from: the selected opening line,
//! the trivial heuristic, or the external engine.

use shakmaty::san::SanPlus;
use shakmaty::{Chess, Move, Position};
use tracing::{debug, warn};

use crate::domain::chess::{find_legal_move, move_endpoints, position_fen};
use crate::domain::opening_book::OpeningLine;
use crate::domain::{Difficulty, PieceColor};
use crate::models::engine::EngineRequest;

/// Progress through the opening line selected for a session.
///
/// Lines hold both colors' moves from the standard start, so the index of
/// the next book ply is the history length.
#[derive(Debug, Clone, Default)]
pub struct BookCursor {
    line: Option<OpeningLine>,
    /// Line plies behind the position after the last book move
    consumed: usize,
    book_moves: usize,
    abandoned: bool,
}

impl BookCursor {
    pub fn new(line: Option<OpeningLine>) -> Self {
        Self {
            line,
            consumed: 0,
            book_moves: 0,
            abandoned: false,
        }
    }

    /// Line index just past the last book move; equals the history length
    /// right after the AI plays from the book
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// AI moves taken from the line so far
    pub fn book_moves(&self) -> usize {
        self.book_moves
    }

    /// Set once a stored move failed validation; the book is then done for
    /// the rest of the game
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// Whether the line still has a move for the ply after `ply_count` plies
    pub fn in_play(&self, ply_count: usize) -> bool {
        match &self.line {
            Some(line) => !self.abandoned && ply_count < line.len(),
            None => false,
        }
    }
}

/// Where the AI's move for this ply comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiDecision {
    /// Next move of the opening line, already validated
    Book(Move),
    /// Last legal move in enumeration order
    Heuristic(Move),
    /// Ask the engine; the move arrives later
    Engine(EngineRequest),
    /// No legal move in the position
    NoMove,
}

/// Search depths per engine tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arbiter {
    pub weak_depth: u32,
    pub strong_depth: u32,
}

impl Default for Arbiter {
    fn default() -> Self {
        Self {
            weak_depth: 5,
            strong_depth: 20,
        }
    }
}

impl Arbiter {
    pub fn new(weak_depth: u32, strong_depth: u32) -> Self {
        Self {
            weak_depth,
            strong_depth,
        }
    }

    /// Engine depth for a tier; the trivial tier never uses the engine
    pub fn depth_for(&self, difficulty: Difficulty) -> Option<u32> {
        match difficulty {
            Difficulty::Trivial => None,
            Difficulty::Weak => Some(self.weak_depth),
            Difficulty::Strong => Some(self.strong_depth),
        }
    }

    /// Decide the AI's move for the current ply.
    ///
    /// `ply_count` is the number of plies played from the standard start;
    /// its parity, not the position's turn flag, decides whether the book
    /// may be used.
    pub fn next_ai_move(
        &self,
        cursor: &mut BookCursor,
        position: &Chess,
        ply_count: usize,
        ai_color: PieceColor,
        difficulty: Difficulty,
        generation: u64,
    ) -> AiDecision {
        if let Some(m) = self.book_move(cursor, position, ply_count, ai_color) {
            return AiDecision::Book(m);
        }

        match self.depth_for(difficulty) {
            None => match Self::worst_move(position) {
                Some(m) => AiDecision::Heuristic(m),
                None => AiDecision::NoMove,
            },
            Some(_) if position.legal_moves().is_empty() => AiDecision::NoMove,
            Some(depth) => AiDecision::Engine(EngineRequest {
                generation,
                fen: position_fen(position),
                depth,
            }),
        }
    }

    fn book_move(
        &self,
        cursor: &mut BookCursor,
        position: &Chess,
        ply_count: usize,
        ai_color: PieceColor,
    ) -> Option<Move> {
        if !cursor.in_play(ply_count) || PieceColor::to_move_after(ply_count) != ai_color {
            return None;
        }
        let line = cursor.line.as_ref()?;
        let san = line.moves.get(ply_count)?;

        match parse_san(position, san) {
            Some(m) => {
                debug!(san = %san, ply = ply_count, opening = %line.name, "book move");
                cursor.consumed = ply_count + 1;
                cursor.book_moves += 1;
                Some(m)
            }
            None => {
                warn!(san = %san, ply = ply_count, opening = %line.name, "book move illegal here, leaving the book");
                cursor.abandoned = true;
                None
            }
        }
    }

    /// The deliberately bad move: the last entry of the legal move list,
    /// promoting to a queen if it is a promotion
    pub fn worst_move(position: &Chess) -> Option<Move> {
        let legal = position.legal_moves();
        let last = legal.last()?;
        let (from, to) = move_endpoints(last)?;
        find_legal_move(position, from, to)
    }
}

/// Resolve a SAN string (check marks allowed) against `position`
fn parse_san(position: &Chess, san: &str) -> Option<Move> {
    let parsed: SanPlus = san.trim().parse().ok()?;
    parsed.san.to_move(position).ok()
}

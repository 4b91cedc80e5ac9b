//! Pure chess domain types and utilities.
//! No I/O here - this is the domain layer on top of shakmaty.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color as SColor, EnPassantMode, File, Move, Position, Role, Square};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

impl PieceKind {
    /// Lowercase letter as used in FEN/UCI
    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Rook => 'r',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }
}

impl From<Role> for PieceKind {
    fn from(role: Role) -> Self {
        match role {
            Role::Pawn => PieceKind::Pawn,
            Role::Knight => PieceKind::Knight,
            Role::Bishop => PieceKind::Bishop,
            Role::Rook => PieceKind::Rook,
            Role::Queen => PieceKind::Queen,
            Role::King => PieceKind::King,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceColor {
    White,
    Black,
}

impl PieceColor {
    pub fn opponent(self) -> PieceColor {
        match self {
            PieceColor::White => PieceColor::Black,
            PieceColor::Black => PieceColor::White,
        }
    }

    /// Color to move after `ply_count` plies from the standard start
    pub fn to_move_after(ply_count: usize) -> PieceColor {
        if ply_count % 2 == 0 {
            PieceColor::White
        } else {
            PieceColor::Black
        }
    }
}

impl From<SColor> for PieceColor {
    fn from(color: SColor) -> Self {
        match color {
            SColor::White => PieceColor::White,
            SColor::Black => PieceColor::Black,
        }
    }
}

impl fmt::Display for PieceColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PieceColor::White => f.write_str("white"),
            PieceColor::Black => f.write_str("black"),
        }
    }
}

impl FromStr for PieceColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "white" | "w" => Ok(PieceColor::White),
            "black" | "b" => Ok(PieceColor::Black),
            other => Err(format!("unknown color: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: PieceColor,
}

/// Convert shakmaty piece to our domain Piece
pub fn shakmaty_to_piece(piece: shakmaty::Piece) -> Piece {
    Piece {
        kind: piece.role.into(),
        color: piece.color.into(),
    }
}

/// Opponent strength selected at session start.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Plays the last legal move in enumeration order, never the engine
    Trivial,
    /// Shallow engine search
    #[default]
    Weak,
    /// Deep engine search
    Strong,
}

impl Difficulty {
    /// Tiers played by the named bot; only these earn achievements
    pub fn earns_achievements(self) -> bool {
        matches!(self, Difficulty::Weak | Difficulty::Strong)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Trivial => f.write_str("trivial"),
            Difficulty::Weak => f.write_str("weak"),
            Difficulty::Strong => f.write_str("strong"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trivial" => Ok(Difficulty::Trivial),
            "weak" => Ok(Difficulty::Weak),
            "strong" => Ok(Difficulty::Strong),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A move given as origin and destination squares, e.g. `e2e4` or `e7e8q`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CoordinateMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
}

impl CoordinateMove {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    /// Describe a legal move the way a user would enter it.
    ///
    /// Castling is reported as the king's two-square step rather than
    /// shakmaty's king-takes-rook encoding.
    pub fn from_move(m: &Move) -> Option<Self> {
        let (from, to) = move_endpoints(m)?;
        Some(Self {
            from,
            to,
            promotion: m.promotion().map(PieceKind::from),
        })
    }
}

impl fmt::Display for CoordinateMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.letter())?;
        }
        Ok(())
    }
}

impl FromStr for CoordinateMove {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() < 4 || !s.is_ascii() {
            return Err(format!("not a coordinate move: {s}"));
        }
        let from = Square::from_str(&s[0..2]).map_err(|_| format!("bad square in {s}"))?;
        let to = Square::from_str(&s[2..4]).map_err(|_| format!("bad square in {s}"))?;
        let promotion = match s.as_bytes().get(4) {
            None => None,
            Some(b'q' | b'Q') => Some(PieceKind::Queen),
            Some(b'r' | b'R') => Some(PieceKind::Rook),
            Some(b'b' | b'B') => Some(PieceKind::Bishop),
            Some(b'n' | b'N') => Some(PieceKind::Knight),
            Some(_) => return Err(format!("bad promotion in {s}")),
        };
        Ok(Self { from, to, promotion })
    }
}

/// Origin and destination of a move as a user sees them
pub fn move_endpoints(m: &Move) -> Option<(Square, Square)> {
    match m {
        Move::Normal { from, to, .. } => Some((*from, *to)),
        Move::EnPassant { from, to, .. } => Some((*from, *to)),
        Move::Castle { king, rook, .. } => {
            // The king lands on g1/g8 or c1/c8
            let king_dest = if rook.file() == File::H {
                Square::from_coords(File::G, rook.rank())
            } else {
                Square::from_coords(File::C, rook.rank())
            };
            Some((*king, king_dest))
        }
        Move::Put { .. } => None,
    }
}

/// Find the legal move going from `from` to `to`.
///
/// Pawn moves to the last rank always resolve to the queen promotion.
pub fn find_legal_move(position: &Chess, from: Square, to: Square) -> Option<Move> {
    position.legal_moves().into_iter().find(|m| {
        let Some((move_from, move_to)) = move_endpoints(m) else {
            return false;
        };
        if move_from != from || move_to != to {
            return false;
        }
        match m.promotion() {
            None => true,
            Some(role) => role == Role::Queen,
        }
    })
}

/// Canonical FEN for handing a position to the board view or an engine
pub fn position_fen(position: &Chess) -> String {
    Fen::from_position(position, EnPassantMode::Legal).to_string()
}

/// FEN without the move counters; equal keys mean a repeated position
pub fn repetition_key(position: &Chess) -> String {
    let fen = position_fen(position);
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// UCI text for a legal move in standard castling notation
pub fn move_to_uci(m: &Move) -> String {
    m.to_uci(CastlingMode::Standard).to_string()
}

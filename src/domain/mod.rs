//! Domain layer: chess types, codecs and pure game rules around shakmaty.

pub mod achievements;
pub mod chess;
pub mod opening_book;
pub mod pgn;
pub mod uci;

pub use chess::{CoordinateMove, Difficulty, Piece, PieceColor, PieceKind, shakmaty_to_piece};

//! Plain-text board for the terminal front end.

use std::io::{self, Write};

use shakmaty::{Board, File, Rank, Square};
use tracing::warn;

use crate::domain::{CoordinateMove, PieceColor, shakmaty_to_piece};
use crate::models::BoardView;

/// Board square for a screen cell; row 0 is the top of the screen
pub fn square_at(row: usize, col: usize, orientation: PieceColor) -> Square {
    let (file, rank) = match orientation {
        PieceColor::White => (col as u32, 7 - row as u32),
        PieceColor::Black => (7 - col as u32, row as u32),
    };
    Square::from_coords(File::new(file), Rank::new(rank))
}

/// Render the placement field of `fen` with `orientation` at the bottom.
/// Squares of the last move are bracketed.
pub fn render(fen: &str, orientation: PieceColor, last_move: Option<CoordinateMove>) -> Option<String> {
    let board: Board = fen.split_whitespace().next()?.parse().ok()?;
    let mut out = String::new();

    for row in 0..8 {
        let rank = match orientation {
            PieceColor::White => 8 - row,
            PieceColor::Black => row + 1,
        };
        out.push_str(&format!("{rank} "));
        for col in 0..8 {
            let sq = square_at(row, col, orientation);
            let glyph = match board.piece_at(sq).map(shakmaty_to_piece) {
                Some(piece) if piece.color == PieceColor::White => piece.kind.letter().to_ascii_uppercase(),
                Some(piece) => piece.kind.letter(),
                None => '.',
            };
            let marked = last_move.is_some_and(|m| m.from == sq || m.to == sq);
            if marked {
                out.push_str(&format!("[{glyph}]"));
            } else {
                out.push_str(&format!(" {glyph} "));
            }
        }
        out.push('\n');
    }

    let files: Vec<String> = (0..8)
        .map(|col| format!(" {} ", square_at(0, col, orientation).file().char()))
        .collect();
    out.push_str(&format!("  {}\n", files.concat()));
    Some(out)
}

/// Draws the board to stdout after every move
pub struct TextBoard {
    orientation: PieceColor,
}

impl TextBoard {
    pub fn new(orientation: PieceColor) -> Self {
        Self { orientation }
    }
}

impl BoardView for TextBoard {
    fn show(&mut self, fen: &str, last_move: Option<CoordinateMove>) {
        let Some(text) = render(fen, self.orientation, last_move) else {
            warn!(fen, "unrenderable position");
            return;
        };
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "\n{text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_square_mapping() {
        assert_eq!(square_at(0, 0, PieceColor::White), Square::A8);
        assert_eq!(square_at(7, 7, PieceColor::White), Square::H1);
        assert_eq!(square_at(0, 0, PieceColor::Black), Square::H1);
        assert_eq!(square_at(7, 0, PieceColor::Black), Square::H8);
    }

    #[test]
    fn test_render_white_orientation() {
        let text = render(START, PieceColor::White, None).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "8  r  n  b  q  k  b  n  r ");
        assert_eq!(lines[7], "1  R  N  B  Q  K  B  N  R ");
        assert_eq!(lines[8], "   a  b  c  d  e  f  g  h ");
    }

    #[test]
    fn test_render_black_orientation_and_highlight() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        let last = CoordinateMove::new(Square::E2, Square::E4);
        let text = render(fen, PieceColor::Black, Some(last)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "1  R  N  B  K  Q  B  N  R ");
        assert!(lines[1].contains("[.]"));
        assert!(lines[3].contains("[P]"));
        assert_eq!(lines[8], "   h  g  f  e  d  c  b  a ");
    }

    #[test]
    fn test_render_rejects_garbage() {
        assert!(render("not a fen", PieceColor::White, None).is_none());
    }
}

//! Named opening lines the AI can be told to follow.
//!
//! A book file maps an opaque key to an [`OpeningLine`]. There is one file
//! per color, holding the lines that color plays. Each line is the full move
//! sequence for both sides, in SAN, starting from the standard position.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::content::ContentStore;
use crate::domain::PieceColor;
use crate::error::ContentError;

/// Name shown when a session has no resolvable opening
pub const UNKNOWN_OPENING: &str = "Unknown Opening";

/// A scripted sequence of moves with display metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningLine {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Plies of both sides in SAN, e.g. `["e4", "e5", "Nf3"]`
    pub moves: Vec<String>,
}

impl OpeningLine {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Which color's book file to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookSide(pub PieceColor);

impl BookSide {
    /// The book for the side opposing the human, i.e. the side the AI plays
    pub fn for_human(human_color: PieceColor) -> Self {
        BookSide(human_color.opponent())
    }

    pub fn color(self) -> PieceColor {
        self.0
    }

    pub fn file_name(self) -> &'static str {
        match self.0 {
            PieceColor::White => "whiteOpenings.json",
            PieceColor::Black => "blackOpenings.json",
        }
    }
}

/// Lines loaded for one side, ordered by key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningBook {
    side: BookSide,
    lines: BTreeMap<String, OpeningLine>,
}

impl OpeningBook {
    pub fn empty(side: BookSide) -> Self {
        Self {
            side,
            lines: BTreeMap::new(),
        }
    }

    /// Parse a book document
    pub fn from_json(side: BookSide, text: &str) -> Result<Self, serde_json::Error> {
        let lines: BTreeMap<String, OpeningLine> = serde_json::from_str(text)?;
        Ok(Self { side, lines })
    }

    /// Load the book file for `side`
    pub fn load(store: &dyn ContentStore, side: BookSide) -> Result<Self, ContentError> {
        let name = side.file_name();
        let text = store.read(name)?;
        let book = Self::from_json(side, &text).map_err(|e| ContentError::Unavailable {
            path: name.into(),
            reason: e.to_string(),
        })?;
        debug!(file = name, lines = book.len(), "loaded opening book");
        Ok(book)
    }

    /// Load the book, or an empty one if it cannot be read.
    ///
    /// An empty book means opening selection is unavailable, not an error.
    pub fn load_or_empty(store: &dyn ContentStore, side: BookSide) -> Self {
        match Self::load(store, side) {
            Ok(book) => book,
            Err(e) => {
                warn!(error = %e, "no openings found");
                Self::empty(side)
            }
        }
    }

    pub fn side(&self) -> BookSide {
        self.side
    }

    pub fn lookup(&self, key: &str) -> Option<&OpeningLine> {
        self.lines.get(key)
    }

    /// Iterate `(key, line)` pairs in key order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &OpeningLine)> {
        self.lines.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Display name for a selected key: the line's name, else the key
    /// itself, else [`UNKNOWN_OPENING`]
    pub fn display_name(&self, key: Option<&str>) -> String {
        match key {
            Some(k) if !k.is_empty() => self
                .lookup(k)
                .map(|line| line.name.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| k.to_string()),
            _ => UNKNOWN_OPENING.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::testing::MemoryContent;

    const BLACK_BOOK: &str = r#"{
        "sicilian": {
            "name": "Sicilian Defense",
            "description": "Fight for d4 from the flank.",
            "moves": ["e4", "c5", "Nf3", "d6", "d4", "cxd4"]
        },
        "french": {
            "name": "French Defense",
            "moves": ["e4", "e6", "d4", "d5"]
        },
        "caro-kann": {
            "moves": ["e4", "c6"]
        }
    }"#;

    #[test]
    fn test_side_is_inverted_from_human() {
        assert_eq!(BookSide::for_human(PieceColor::White).file_name(), "blackOpenings.json");
        assert_eq!(BookSide::for_human(PieceColor::Black).file_name(), "whiteOpenings.json");
        assert_eq!(BookSide::for_human(PieceColor::White).color(), PieceColor::Black);
    }

    #[test]
    fn test_load_and_lookup() {
        let store = MemoryContent::default().with("blackOpenings.json", BLACK_BOOK);
        let book = OpeningBook::load(&store, BookSide(PieceColor::Black)).unwrap();
        assert_eq!(book.len(), 3);
        let line = book.lookup("sicilian").unwrap();
        assert_eq!(line.name, "Sicilian Defense");
        assert_eq!(line.len(), 6);
        assert_eq!(line.moves[..2], ["e4", "c5"]);
        // Missing description defaults to empty
        assert_eq!(book.lookup("french").unwrap().description, "");
        assert!(book.lookup("ruy-lopez").is_none());
        let keys: Vec<_> = book.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["caro-kann", "french", "sicilian"]);
    }

    #[test]
    fn test_missing_book_is_unavailable() {
        let store = MemoryContent::default();
        let err = OpeningBook::load(&store, BookSide(PieceColor::White)).unwrap_err();
        assert!(matches!(err, ContentError::Unavailable { .. }));
        let book = OpeningBook::load_or_empty(&store, BookSide(PieceColor::White));
        assert!(book.is_empty());
    }

    #[test]
    fn test_malformed_book_degrades_to_empty() {
        let store = MemoryContent::default().with("whiteOpenings.json", "{ not json");
        assert!(OpeningBook::load(&store, BookSide(PieceColor::White)).is_err());
        assert!(OpeningBook::load_or_empty(&store, BookSide(PieceColor::White)).is_empty());
    }

    #[test]
    fn test_display_name_fallbacks() {
        let book = OpeningBook::from_json(BookSide(PieceColor::Black), BLACK_BOOK).unwrap();
        assert_eq!(book.display_name(Some("sicilian")), "Sicilian Defense");
        assert_eq!(book.display_name(Some("mystery")), "mystery");
        // An entry without a name still loads and shows its key
        assert_eq!(book.lookup("caro-kann").unwrap().name, "");
        assert_eq!(book.display_name(Some("caro-kann")), "caro-kann");
        assert_eq!(book.display_name(Some("")), UNKNOWN_OPENING);
        assert_eq!(book.display_name(None), UNKNOWN_OPENING);
    }
}

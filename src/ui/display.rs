//! Display generation for the terminal front end.
//!
//! Turns session, book and record state into printable rows. It lives in the
//! UI layer and depends on domain + models, not vice versa.

use std::collections::BTreeMap;

use crate::domain::PieceKind;
use crate::domain::opening_book::OpeningBook;
use crate::domain::pgn::Standing;
use crate::ui::view_models::{MoveRow, OpeningRow, StandingRow};

/// Pair up a SAN history into numbered rows
pub fn move_rows(history: &[String]) -> Vec<MoveRow> {
    history
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| MoveRow {
            move_num: i + 1,
            white: pair[0].clone(),
            black: pair.get(1).cloned(),
        })
        .collect()
}

/// Render rows as `1. e4 e5` lines
pub fn move_list(history: &[String]) -> String {
    move_rows(history)
        .iter()
        .map(|row| match &row.black {
            Some(black) => format!("{}. {} {}", row.move_num, row.white, black),
            None => format!("{}. {}", row.move_num, row.white),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Captured pieces as letters, e.g. `p p n`
pub fn captured(pieces: &[PieceKind]) -> String {
    if pieces.is_empty() {
        return "-".to_string();
    }
    pieces
        .iter()
        .map(|p| p.letter().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One row per line of the book, with its unlock state
pub fn opening_rows(book: &OpeningBook, is_unlocked: impl Fn(&str) -> bool) -> Vec<OpeningRow> {
    book.entries()
        .map(|(key, line)| OpeningRow {
            key: key.to_string(),
            name: line.name.clone(),
            description: line.description.clone(),
            moves: move_list(&line.moves).replace('\n', " "),
            unlocked: is_unlocked(&line.name),
        })
        .collect()
}

/// Standings ordered by points, then wins, then name
pub fn standing_rows(table: &BTreeMap<String, Standing>) -> Vec<StandingRow> {
    let mut rows: Vec<StandingRow> = table
        .iter()
        .map(|(player, s)| StandingRow {
            player: player.clone(),
            wins: s.wins,
            losses: s.losses,
            draws: s.draws,
            points: s.points,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.points
            .total_cmp(&a.points)
            .then(b.wins.cmp(&a.wins))
            .then_with(|| a.player.cmp(&b.player))
    });
    rows
}

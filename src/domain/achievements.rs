//! Opening-named achievements earned by beating the bot.

use tracing::{info, warn};

use crate::domain::opening_book::OpeningBook;
use crate::domain::{Difficulty, PieceColor};
use crate::store::{AchievementStore, UnlockSet};

/// A newly recorded achievement, to be announced once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unlock {
    pub opening_name: String,
}

/// How many of the known openings have been unlocked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub unlocked: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.unlocked as f32 * 100.0 / self.total as f32
        }
    }
}

/// Decides whether a finished game earns an achievement and records it
pub struct AchievementGate {
    store: Box<dyn AchievementStore>,
    unlocked: UnlockSet,
}

impl AchievementGate {
    /// Load the persisted set; an unreadable store starts empty
    pub fn new(store: Box<dyn AchievementStore>) -> Self {
        let unlocked = store.load().unwrap_or_else(|e| {
            warn!(error = %e, "could not load achievements, starting empty");
            UnlockSet::new()
        });
        Self { store, unlocked }
    }

    /// Record an unlock when the human won against an achievement tier.
    ///
    /// Returns `None` for draws, losses, the trivial tier, and openings
    /// already unlocked.
    pub fn evaluate(
        &mut self,
        winner: Option<PieceColor>,
        human_color: PieceColor,
        difficulty: Difficulty,
        opening_name: &str,
    ) -> Option<Unlock> {
        if winner != Some(human_color) || !difficulty.earns_achievements() {
            return None;
        }
        if opening_name.is_empty() || self.is_unlocked(opening_name) {
            return None;
        }

        self.unlocked.insert(opening_name.to_string(), true);
        if let Err(e) = self.store.save(&self.unlocked) {
            warn!(error = %e, "failed to persist achievements");
        }
        info!(opening = opening_name, "achievement unlocked");
        Some(Unlock {
            opening_name: opening_name.to_string(),
        })
    }

    pub fn is_unlocked(&self, opening_name: &str) -> bool {
        self.unlocked.get(opening_name).copied().unwrap_or(false)
    }

    /// Unlocked names in alphabetical order
    pub fn unlocked(&self) -> impl Iterator<Item = &str> {
        self.unlocked
            .iter()
            .filter(|(_, v)| **v)
            .map(|(k, _)| k.as_str())
    }

    /// Count unlocked lines across the given books, by display name
    pub fn progress(&self, books: &[&OpeningBook]) -> Progress {
        let mut total = 0;
        let mut unlocked = 0;
        for book in books {
            for (_, line) in book.entries() {
                total += 1;
                if self.is_unlocked(&line.name) {
                    unlocked += 1;
                }
            }
        }
        Progress { unlocked, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::opening_book::BookSide;
    use crate::store::testing::MemoryStore;

    fn gate() -> (AchievementGate, MemoryStore) {
        let store = MemoryStore::default();
        (AchievementGate::new(Box::new(store.clone())), store)
    }

    #[test]
    fn test_unlocks_once() {
        let (mut gate, store) = gate();
        let first = gate.evaluate(
            Some(PieceColor::White),
            PieceColor::White,
            Difficulty::Weak,
            "Sicilian Defense",
        );
        assert_eq!(
            first,
            Some(Unlock {
                opening_name: "Sicilian Defense".to_string()
            })
        );

        let second = gate.evaluate(
            Some(PieceColor::White),
            PieceColor::White,
            Difficulty::Weak,
            "Sicilian Defense",
        );
        assert_eq!(second, None);

        let saved = store.saved.borrow();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved.get("Sicilian Defense"), Some(&true));
        assert_eq!(*store.saves.borrow(), 1);
    }

    #[test]
    fn test_requires_human_win() {
        let (mut gate, _) = gate();
        assert!(gate
            .evaluate(Some(PieceColor::Black), PieceColor::White, Difficulty::Strong, "French")
            .is_none());
        assert!(gate
            .evaluate(None, PieceColor::White, Difficulty::Strong, "French")
            .is_none());
        assert!(!gate.is_unlocked("French"));
    }

    #[test]
    fn test_trivial_tier_never_unlocks() {
        let (mut gate, _) = gate();
        assert!(gate
            .evaluate(Some(PieceColor::Black), PieceColor::Black, Difficulty::Trivial, "French")
            .is_none());
        assert!(gate
            .evaluate(Some(PieceColor::Black), PieceColor::Black, Difficulty::Strong, "French")
            .is_some());
    }

    #[test]
    fn test_loads_persisted_set() {
        let store = MemoryStore::default();
        store.saved.borrow_mut().insert("Italian Game".to_string(), true);
        let mut gate = AchievementGate::new(Box::new(store.clone()));
        assert!(gate.is_unlocked("Italian Game"));
        assert!(gate
            .evaluate(Some(PieceColor::White), PieceColor::White, Difficulty::Weak, "Italian Game")
            .is_none());
        assert_eq!(gate.unlocked().collect::<Vec<_>>(), vec!["Italian Game"]);
    }

    #[test]
    fn test_progress_counts_both_books() {
        let white = OpeningBook::from_json(
            BookSide(PieceColor::White),
            r#"{"italian": {"name": "Italian Game", "moves": ["e4"]}}"#,
        )
        .unwrap();
        let black = OpeningBook::from_json(
            BookSide(PieceColor::Black),
            r#"{"french": {"name": "French Defense", "moves": ["e4", "e6"]},
                "sicilian": {"name": "Sicilian Defense", "moves": ["e4", "c5"]}}"#,
        )
        .unwrap();
        let (mut gate, _) = gate();
        gate.evaluate(Some(PieceColor::White), PieceColor::White, Difficulty::Weak, "French Defense");

        let progress = gate.progress(&[&white, &black]);
        assert_eq!(progress, Progress { unlocked: 1, total: 3 });
        assert!((progress.percent() - 33.333).abs() < 0.01);
    }
}

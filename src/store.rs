//! Persistence for the unlocked-achievement set.
//!
//! The set is a JSON object mapping opening display name to `true`.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::StoreError;

pub type UnlockSet = BTreeMap<String, bool>;

/// Key/value storage for unlocked achievements
pub trait AchievementStore {
    fn load(&self) -> Result<UnlockSet, StoreError>;
    fn save(&mut self, unlocked: &UnlockSet) -> Result<(), StoreError>;
}

/// Achievements kept in a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AchievementStore for JsonFileStore {
    fn load(&self) -> Result<UnlockSet, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(UnlockSet::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            // Nothing unlocked yet
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(UnlockSet::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, unlocked: &UnlockSet) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(unlocked)?)?;
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// In-memory store; clones share the same set so tests can inspect it
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        pub saved: Rc<RefCell<UnlockSet>>,
        pub saves: Rc<RefCell<usize>>,
    }

    impl AchievementStore for MemoryStore {
        fn load(&self) -> Result<UnlockSet, StoreError> {
            Ok(self.saved.borrow().clone())
        }

        fn save(&mut self, unlocked: &UnlockSet) -> Result<(), StoreError> {
            *self.saved.borrow_mut() = unlocked.clone();
            *self.saves.borrow_mut() += 1;
            Ok(())
        }
    }
}

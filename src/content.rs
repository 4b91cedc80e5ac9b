//! Read-only access to static content: opening books and game records.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ContentError;

/// Source of named text documents
pub trait ContentStore {
    /// Read the document stored under `name`
    fn read(&self, name: &str) -> Result<String, ContentError>;
}

/// Documents stored as files below a base directory
#[derive(Debug, Clone)]
pub struct DirContentStore {
    base_path: PathBuf,
}

impl DirContentStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl ContentStore for DirContentStore {
    fn read(&self, name: &str) -> Result<String, ContentError> {
        let path = self.base_path.join(name);
        fs::read_to_string(&path).map_err(|e| ContentError::Unavailable {
            path,
            reason: e.to_string(),
        })
    }
}

//! Persisted tailing cursors.
//!
//! One JSON object maps absolute file paths to their `{inode, offset}`
//! cursor. The store is loaded once at construction and rewritten in full
//! after every tailing pass. Entries for files that no longer exist are
//! retained.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum CursorError {
    #[error("State file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("State serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub inode: u64,
    pub offset: u64,
}

#[derive(Debug)]
pub struct CursorStore {
    path: PathBuf,
    state: HashMap<String, Cursor>,
}

impl CursorStore {
    /// Open the store, reading any previously persisted state. A missing or
    /// unreadable state file is a cold start, not an error.
    pub fn open(path: PathBuf) -> Self {
        let state = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Corrupt cursor state {}: {e}; starting cold", path.display());
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Cannot read cursor state {}: {e}; starting cold", path.display());
                HashMap::new()
            }
        };

        Self { path, state }
    }

    pub fn get(&self, path: &Path) -> Option<Cursor> {
        self.state.get(path.to_string_lossy().as_ref()).copied()
    }

    pub fn update(&mut self, path: &Path, cursor: Cursor) {
        self.state
            .insert(path.to_string_lossy().into_owned(), cursor);
    }

    /// Rewrite the full cursor map, creating parent directories on demand.
    pub fn save(&self) -> Result<(), CursorError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_vec_pretty(&self.state)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

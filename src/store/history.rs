//! Pair history - previously entered pair strings, deduplicated

use std::path::PathBuf;

use super::{read_json, write_json, ReadOutcome, StoreError};

#[derive(Debug, Clone)]
pub struct PairHistory {
    path: PathBuf,
    entries: Vec<String>,
}

impl PairHistory {
    /// Load the history; anything but a JSON string array starts empty
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_json::<Vec<String>>(&path) {
            ReadOutcome::Ok(entries) => entries,
            ReadOutcome::NotFound => Vec::new(),
            other => {
                tracing::debug!("Pair history unusable ({:?}), starting empty", other);
                Vec::new()
            }
        };
        Self { path, entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn contains(&self, pair: &str) -> bool {
        self.entries.iter().any(|e| e == pair.trim())
    }

    /// Remember a pair string. Returns true when it was new.
    pub fn record(&mut self, pair: &str) -> bool {
        let pair = pair.trim();
        if pair.is_empty() || self.contains(pair) {
            return false;
        }

        self.entries.push(pair.to_string());
        if let Err(e) = self.persist() {
            tracing::warn!("Could not save pair history to {}: {}", self.path.display(), e);
        }
        true
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_json(&self.path, &self.entries)
    }
}

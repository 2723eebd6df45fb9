//! On-disk state: the bot configuration, pair history and file catalog
//!
//! Reads never fail loudly. Every read returns a [`ReadOutcome`] so callers
//! can keep the quiet user experience (`.ok()`) while tests and logs still see
//! which kind of degradation happened.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub mod catalog;
pub mod config;
pub mod history;

pub use catalog::Catalog;
pub use config::{ConfigStore, ProxySave};
pub use history::PairHistory;

/// Errors raised while persisting state
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document unavailable: {0}")]
    Unavailable(String),
}

/// Result of reading a JSON document in degraded mode
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    Ok(T),
    /// The file does not exist
    NotFound,
    /// The file exists but is not the expected JSON
    Malformed(String),
    /// The file exists but could not be read (permissions, encoding, ...)
    Unreadable(String),
}

impl<T> ReadOutcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            ReadOutcome::Ok(value) => Some(value),
            _ => None,
        }
    }

    /// Convert into a hard error for write paths that need the document
    pub fn into_result(self) -> Result<T, StoreError> {
        match self {
            ReadOutcome::Ok(value) => Ok(value),
            ReadOutcome::NotFound => Err(StoreError::Unavailable("file not found".to_string())),
            ReadOutcome::Malformed(msg) => Err(StoreError::Unavailable(format!("malformed: {}", msg))),
            ReadOutcome::Unreadable(msg) => Err(StoreError::Unavailable(msg)),
        }
    }
}

/// Read and parse a JSON document, classifying failures
pub fn read_json<T: DeserializeOwned>(path: &Path) -> ReadOutcome<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("{} does not exist", path.display());
            return ReadOutcome::NotFound;
        }
        Err(e) => {
            tracing::warn!("Could not read {}: {}", path.display(), e);
            return ReadOutcome::Unreadable(e.to_string());
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => ReadOutcome::Ok(value),
        Err(e) => {
            tracing::warn!("Treating {} as empty, malformed JSON: {}", path.display(), e);
            ReadOutcome::Malformed(e.to_string())
        }
    }
}

/// Write a JSON document with 4-space indentation and raw UTF-8
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    std::fs::write(path, buf)?;
    Ok(())
}

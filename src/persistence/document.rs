//! Store document read/write

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::types::State;
use crate::utils::atomic_write_json;

/// On-disk form of a store: raw state plus version label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub state: State,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl StateDocument {
    /// Capture the given state and version, stamped now
    pub fn new(state: State, version: impl Into<String>) -> Self {
        Self {
            state,
            version: version.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Write the document to `path` atomically, creating parent directories
pub fn save_document<P: AsRef<Path>>(path: P, document: &StateDocument) -> StoreResult<()> {
    atomic_write_json(path, document)
}

/// Read a document from `path`
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load_document<P: AsRef<Path>>(path: P) -> StoreResult<Option<StateDocument>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let document: StateDocument = serde_json::from_str(&content)?;
    Ok(Some(document))
}

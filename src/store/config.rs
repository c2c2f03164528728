//! Store configuration

use std::env;
use std::path::{Path, PathBuf};

/// Version label a store starts at when nothing was loaded from disk
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Default per-subscriber buffer of the broadcast feed
pub const DEFAULT_BROADCAST_CAPACITY: usize = 1024;

/// Configuration for a `StateStore`
#[derive(Debug, Clone, PartialEq)]
pub struct StateStoreConfig {
    /// File the store is mirrored to; `None` keeps the store in memory only
    pub storage_path: Option<PathBuf>,
    /// Version label used when no stored document is loaded
    pub initial_version: String,
    /// Maximum number of change records kept; `None` is unbounded
    pub history_limit: Option<usize>,
    /// Buffer size of the change broadcast channel
    pub broadcast_capacity: usize,
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            initial_version: DEFAULT_VERSION.to_string(),
            history_limit: None,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

impl StateStoreConfig {
    /// In-memory store with default settings
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Store mirrored to `path`
    pub fn with_storage_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            storage_path: Some(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Build from environment variables
    ///
    /// - `STATE_STORE_PATH`: storage file; relative paths resolve against the
    ///   current directory
    /// - `STATE_STORE_VERSION`: initial version label
    /// - `STATE_STORE_HISTORY_LIMIT`: change-log bound (ignored if not a number)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = env::var("STATE_STORE_PATH") {
            if !path.trim().is_empty() {
                config.storage_path = Some(resolve_path(&path));
            }
        }

        if let Ok(version) = env::var("STATE_STORE_VERSION") {
            if !version.trim().is_empty() {
                config.initial_version = version.trim().to_string();
            }
        }

        if let Ok(limit) = env::var("STATE_STORE_HISTORY_LIMIT") {
            match limit.trim().parse::<usize>() {
                Ok(limit) => config.history_limit = Some(limit),
                Err(_) => tracing::warn!(value = %limit, "ignoring invalid STATE_STORE_HISTORY_LIMIT"),
            }
        }

        config
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.initial_version = version.into();
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Get the storage path, if persistence is enabled
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }
}

fn resolve_path(path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let current_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    current_dir.join(path)
}

//! Error types for the state store

use thiserror::Error;

/// Error produced by a migration transform
pub type TransformError = Box<dyn std::error::Error + Send + Sync>;

/// Error produced by a change listener
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations
///
/// Only the migration variants ever reach callers of the mutation API.
/// `Io` and `Json` come from the persistence layer, whose failures the
/// store logs and suppresses.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no migration path from {from} to {to}")]
    NoMigrationPath { from: String, to: String },

    #[error("migration {migration_id} ({from_version} -> {to_version}) failed: {cause}")]
    MigrationFailed {
        from_version: String,
        to_version: String,
        migration_id: String,
        #[source]
        cause: TransformError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

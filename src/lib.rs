//! State Store
//!
//! A versioned, in-memory state store used as the coordination substrate for
//! workflow and orchestration services.
//!
//! # Features
//!
//! - **Merge-on-update**: nested objects are merged, everything else replaced
//! - **Change log**: every mutation records full before/after snapshots
//! - **Listeners**: synchronous callbacks keyed by entity type, plus an async
//!   broadcast feed
//! - **Migrations**: shortest-path upgrades through a graph of version edges
//! - **Persistence**: optional best-effort mirror to a JSON file
//!
//! # Modules
//!
//! - `types`: State, change records, migration edges, history filters
//! - `store`: the store core, its config and migration graph
//! - `notify`: listener registry and broadcast feed
//! - `persistence`: on-disk document format
//! - `service`: async facade for shared access
//! - `utils`: atomic file writes
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use state_store::{ChangeContext, StateStore};
//!
//! let mut store = StateStore::in_memory();
//! let updates = json!({"cart": {"items": 1}}).as_object().cloned().unwrap();
//! store.update_state(updates, ChangeContext::new().entity("cart", "cart"));
//!
//! assert_eq!(store.get_entity_state("cart"), json!({"items": 1}));
//! ```

pub mod error;
pub mod notify;
pub mod persistence;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use error::{ListenerError, StoreError, StoreResult, TransformError};
pub use notify::{ChangeMessage, ListenerId};
pub use persistence::StateDocument;
pub use service::SharedStateStore;
pub use store::{StateStore, StateStoreConfig};
pub use types::{
    state_from_value, transform_fn, ChangeContext, ChangeKind, HistoryFilter, State, StateChange,
    StateMigration,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

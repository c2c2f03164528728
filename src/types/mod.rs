//! Data types for the state store
//!
//! This module contains the value types shared across the store: the state
//! map itself, change records and migration edges.

mod change;
mod history;
mod migration;

pub use change::{ChangeContext, ChangeKind, StateChange};
pub use history::HistoryFilter;
pub use migration::{transform_fn, StateMigration, TransformFn};

/// The current world: string keys to arbitrary JSON values
pub type State = serde_json::Map<String, serde_json::Value>;

/// Build a `State` from a JSON value, yielding an empty map for non-objects
pub fn state_from_value(value: serde_json::Value) -> State {
    match value {
        serde_json::Value::Object(map) => map,
        _ => State::new(),
    }
}

//! Change records for the state change log
//!
//! A `StateChange` is an immutable record of one mutation. It carries full
//! before/after copies of the store, so later mutations of the live state
//! never alter a recorded change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::State;

/// Kinds of mutation recorded in the change log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The whole state was replaced (`reset_state`)
    Create,
    /// Keys were merged or replaced (`update_state`)
    Update,
    /// Top-level keys were removed (`delete_state`)
    Delete,
    /// One migration edge was applied (`migrate_state`)
    Migrate,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Create => write!(f, "create"),
            ChangeKind::Update => write!(f, "update"),
            ChangeKind::Delete => write!(f, "delete"),
            ChangeKind::Migrate => write!(f, "migrate"),
        }
    }
}

/// Caller-supplied context for a mutation
///
/// Every field is optional; an empty context describes a whole-store change
/// with no actor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeContext {
    pub entity_id: Option<String>,
    pub entity_type: Option<String>,
    pub actor: Option<String>,
    pub metadata: State,
}

impl ChangeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target a single entity
    pub fn entity(mut self, entity_id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Attach one metadata entry
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// An immutable record of one mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    /// Generated identifier (UUID v4)
    pub id: String,

    pub kind: ChangeKind,

    /// Targeted entity; empty for whole-store changes
    #[serde(default)]
    pub entity_id: String,

    /// Entity type used to route listeners; empty for whole-store changes
    #[serde(default)]
    pub entity_type: String,

    /// Whole-store snapshot before the mutation
    pub previous_state: State,

    /// Whole-store snapshot after the mutation
    pub new_state: State,

    /// Store version in effect after the mutation
    pub version: String,

    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: State,
}

impl StateChange {
    /// Create a change record from a context and before/after snapshots
    pub fn new(
        kind: ChangeKind,
        ctx: ChangeContext,
        previous_state: State,
        new_state: State,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            entity_id: ctx.entity_id.unwrap_or_default(),
            entity_type: ctx.entity_type.unwrap_or_default(),
            previous_state,
            new_state,
            version: version.into(),
            timestamp: Utc::now(),
            actor: ctx.actor,
            metadata: ctx.metadata,
        }
    }

    /// Read a metadata value as a string
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Top-level keys whose value differs between the two snapshots
    pub fn changed_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .new_state
            .iter()
            .filter(|(k, v)| self.previous_state.get(*k) != Some(*v))
            .map(|(k, _)| k.clone())
            .collect();

        keys.extend(
            self.previous_state
                .keys()
                .filter(|k| !self.new_state.contains_key(*k))
                .cloned(),
        );
        keys.sort();
        keys
    }
}

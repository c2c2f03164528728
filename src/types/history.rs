//! Filters for change-log queries

use super::{ChangeKind, StateChange};

/// Filter applied by `get_history`
///
/// Unset fields match everything. Results are returned newest first and
/// truncated to `limit` when set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub version: Option<String>,
    pub entity_id: Option<String>,
    pub entity_type: Option<String>,
    pub actor: Option<String>,
    pub kind: Option<ChangeKind>,
    pub limit: Option<usize>,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
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

    pub fn kind(mut self, kind: ChangeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check a single change against every set field
    pub fn matches(&self, change: &StateChange) -> bool {
        if let Some(version) = &self.version {
            if &change.version != version {
                return false;
            }
        }
        if let Some(entity_id) = &self.entity_id {
            if &change.entity_id != entity_id {
                return false;
            }
        }
        if let Some(entity_type) = &self.entity_type {
            if &change.entity_type != entity_type {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            if change.actor.as_ref() != Some(actor) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if change.kind != kind {
                return false;
            }
        }
        true
    }
}

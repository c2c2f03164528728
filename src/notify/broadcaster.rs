//! Broadcast feed of state changes
//!
//! Each store owns one broadcaster. Async consumers subscribe to receive
//! every change as it is committed, tagged with a sequence id. Slow receivers
//! lag and miss messages rather than applying backpressure to mutators.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::types::StateChange;

/// A change as delivered to subscribers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangeMessage {
    #[serde(flatten)]
    pub change: StateChange,
    pub sequence_id: u64,
}

/// Per-store broadcast channel for committed changes
pub struct ChangeBroadcaster {
    tx: broadcast::Sender<ChangeMessage>,
    sequence_counter: AtomicU64,
}

impl ChangeBroadcaster {
    /// Create a broadcaster buffering up to `capacity` messages per receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            sequence_counter: AtomicU64::new(0),
        }
    }

    /// Publish a change to all current subscribers
    pub fn broadcast(&self, change: &StateChange) {
        let seq = self.sequence_counter.fetch_add(1, Ordering::SeqCst);
        let msg = ChangeMessage {
            change: change.clone(),
            sequence_id: seq,
        };
        // No receivers is not an error
        let _ = self.tx.send(msg);
    }

    /// Sequence id the next broadcast will carry
    pub fn current_sequence_id(&self) -> u64 {
        self.sequence_counter.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeMessage> {
        self.tx.subscribe()
    }

    /// Subscribe as a `Stream`; lagged gaps surface as `Err` items
    pub fn stream(&self) -> BroadcastStream<ChangeMessage> {
        BroadcastStream::new(self.tx.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl std::fmt::Debug for ChangeBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBroadcaster")
            .field("sequence_id", &self.current_sequence_id())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

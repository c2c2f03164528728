//! Notification bus
//!
//! - `ListenerRegistry`: synchronous callbacks run on the mutator's thread
//! - `ChangeBroadcaster`: async feed of committed changes for subscribers

mod broadcaster;
mod listeners;

pub use broadcaster::{ChangeBroadcaster, ChangeMessage};
pub use listeners::{ListenerFn, ListenerId, ListenerRegistry};

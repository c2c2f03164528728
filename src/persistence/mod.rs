//! Persistence adapter
//!
//! Mirrors the whole store to a single JSON document:
//!
//! ```text
//! {
//!   "state":     { ...arbitrary nested mapping... },
//!   "version":   "1.2.0",
//!   "timestamp": "2024-01-01T00:00:00Z"
//! }
//! ```
//!
//! The in-memory store stays authoritative. The store calls these functions
//! after each mutation and logs any error they return.

mod document;

pub use document::{load_document, save_document, StateDocument};

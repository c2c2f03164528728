//! Utility functions and helpers

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_json, cleanup_temp_file, temp_path_for};

//! Atomic file writes for the store document
//!
//! Writes go to a sibling temp file (the full file name plus `.tmp`), are synced, then renamed over the
//! destination. A reader therefore sees either the previous document or the
//! new one, never a partial write.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::StoreResult;

/// Temp path used while writing `path`
///
/// The suffix is appended to the whole file name, so `store.json` writes
/// through `store.json.tmp` and never collides with `store.tmp`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Atomically write raw bytes to `path`, creating parent directories
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> StoreResult<()> {
    let path = path.as_ref();
    let temp_path = temp_path_for(path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically
pub fn atomic_write_json<P, T>(path: P, value: &T) -> StoreResult<()>
where
    P: AsRef<Path>,
    T: Serialize + ?Sized,
{
    let content = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &content)
}

/// Remove a temp file left behind by an interrupted write of `path`
///
/// Returns whether a file was removed.
pub fn cleanup_temp_file<P: AsRef<Path>>(path: P) -> StoreResult<bool> {
    let path = path.as_ref();
    let temp_path = temp_path_for(path);
    if temp_path.as_path() == path || !temp_path.exists() {
        return Ok(false);
    }
    fs::remove_file(&temp_path)?;
    Ok(true)
}

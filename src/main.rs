//! State Store - inspector binary
//!
//! Opens a persisted store file and prints its version and keys as JSON.
//!
//! ```text
//! state-store [PATH]        # PATH defaults to $STATE_STORE_PATH
//! ```

use std::process::ExitCode;

use serde_json::json;
use tracing_subscriber::EnvFilter;

use state_store::persistence::load_document;
use state_store::StateStoreConfig;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let path = match std::env::args().nth(1) {
        Some(path) => std::path::PathBuf::from(path),
        None => match StateStoreConfig::from_env().storage_path {
            Some(path) => path,
            None => {
                eprintln!("usage: state-store [PATH]  (or set STATE_STORE_PATH)");
                return ExitCode::from(2);
            }
        },
    };

    match load_document(&path) {
        Ok(Some(document)) => {
            let keys: Vec<&String> = document.state.keys().collect();
            let summary = json!({
                "path": path.display().to_string(),
                "version": document.version,
                "timestamp": document.timestamp,
                "keys": keys,
            });
            match serde_json::to_string_pretty(&summary) {
                Ok(text) => {
                    println!("{}", text);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to render summary");
                    ExitCode::FAILURE
                }
            }
        }
        Ok(None) => {
            tracing::error!(path = %path.display(), "store file not found");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read store file");
            ExitCode::FAILURE
        }
    }
}

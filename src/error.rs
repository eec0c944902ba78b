//! User-facing run errors.
//!
//! `Display` output is sent verbatim over the error channel, so messages are
//! written for the person at the keyboard.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("A run is already in progress.")]
    AlreadyRunning,

    #[error("Collection file not found. Provide a valid path.")]
    CollectionNotFound,

    #[error("Failed to read collection {}: {source}", path.display())]
    ReadCollection {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse collection {}: {source}", path.display())]
    ParseCollection {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

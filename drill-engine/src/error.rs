//! FILENAME: drill-engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrillError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported expand state version: {0}")]
    UnsupportedVersion(u32),
}

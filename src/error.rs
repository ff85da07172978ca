//! Error taxonomy for the capture lifecycle.
//!
//! Three failure classes, matching the three fallible stages:
//! - `Open`: the backend could not be initialized for the source. Fatal to the
//!   attempted open; no handle exists afterwards.
//! - `Read`: a single pull from an open session failed or the source is
//!   exhausted. The caller decides whether this is end-of-stream or fatal.
//! - `Save`: encoding or writing a frame to disk failed. Never retried
//!   automatically.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open video source {source_id}: {reason}")]
    Open { source_id: String, reason: String },

    #[error("failed to read frame from source: {reason}")]
    Read { reason: String },

    #[error("failed to save frame to {}: {reason}", .path.display())]
    Save { path: PathBuf, reason: String },
}

impl CaptureError {
    pub(crate) fn open(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Open {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn read(reason: impl Into<String>) -> Self {
        Self::Read {
            reason: reason.into(),
        }
    }

    pub(crate) fn save(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Save {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

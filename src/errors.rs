//! Error taxonomy for the mark/upload pipeline.
//!
//! Every variant here degrades to a notification; nothing is fatal to the
//! host process.

use thiserror::Error;

use crate::host::Severity;

/// Failures surfaced to the user by the orchestration layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("no entry under the cursor")]
    NoTarget,
    #[error("upload destination is not set (run set-destination first)")]
    DestinationUnset,
    #[error("nothing is marked for upload")]
    NothingMarked,
    #[error("rsync executable not found on PATH")]
    ToolNotFound,
    #[error("transfer failed with exit code {0}")]
    TransferFailed(i32),
}

impl UploadError {
    /// Severity used when the error is reported through the notification sink.
    pub fn severity(&self) -> Severity {
        match self {
            UploadError::NoTarget | UploadError::NothingMarked => Severity::Warning,
            UploadError::DestinationUnset
            | UploadError::ToolNotFound
            | UploadError::TransferFailed(_) => Severity::Error,
        }
    }
}

/// Command construction failures, detected before any process is spawned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("rsync executable not found on PATH")]
    ToolNotFound,
}

impl From<BuildError> for UploadError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::ToolNotFound => UploadError::ToolNotFound,
        }
    }
}

/// Session launch failures. Allocation or spawn errors never leave a child
/// process behind.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to allocate output surface")]
    SurfaceUnavailable,
    #[error("failed to spawn transfer process: {0}")]
    Io(#[from] std::io::Error),
}

/// Stale or unknown annotation handles. Always cosmetic: callers swallow
/// this and keep the logical mark state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("annotation handle is stale")]
    StaleHandle,
}

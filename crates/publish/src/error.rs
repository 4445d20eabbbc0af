//! Publish error types.

use std::path::PathBuf;

use bundlepub_protocol::Platform;

/// Errors produced while building or publishing a platform's bundles.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest error: {0}")]
    Protocol(#[from] bundlepub_protocol::ProtocolError),

    #[error("transfer error: {0}")]
    Transfer(#[from] bundlepub_transfer::TransferError),

    #[error("build failed for {platform}: {message}")]
    Build { platform: Platform, message: String },

    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("upload already in progress for {0}")]
    AlreadyUploading(Platform),
}

/// A bundle group that was dropped before the build. Reported as a
/// warning; the rest of the publish continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupingError {
    #[error("bundle group {0} has no member files")]
    Empty(String),

    #[error("bundle {0} is produced by more than one group")]
    Duplicate(String),
}

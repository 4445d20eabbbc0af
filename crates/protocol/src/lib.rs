//! Shared types for the bundle publish pipeline: platform targets,
//! on-disk/remote layout constants and the version manifest format.

pub mod constants;
pub mod manifest;
pub mod types;

pub use manifest::{ManifestEntry, VersionManifest};
pub use types::{Platform, UploadTarget};

/// Errors produced by the protocol crate.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate manifest path: {0}")]
    DuplicatePath(String),

    #[error("unknown upload target: {0}")]
    UnknownTarget(String),
}

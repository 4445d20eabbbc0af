//! Upload primitives for the publish pipeline: path remapping, content
//! checksums, the transport seam and the single-upload transfer task.

mod checksum;
mod remap;
mod task;
mod transport;

pub use checksum::{calculate_file_checksum, checksum_bytes};
pub use remap::{join_url, remap_upload_path, version_file_path};
pub use task::{Payload, TaskKind, TaskState, TransferTask};
pub use transport::{
    Credentials, HttpTransport, LocalTransport, Transport, UploadFuture, transport_for_url,
};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected upload to {url}: status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("unsupported server URL scheme: {0}")]
    UnsupportedScheme(String),
}

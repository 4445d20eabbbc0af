//! Local build-output path → remote server path mapping.
//!
//! Bundles live under `<output>/<Segment>/build/...` locally and under
//! `<Segment>/build/...` on the server. Everything before the last
//! `build/` anchor is machine-specific and is discarded.

use bundlepub_protocol::Platform;
use bundlepub_protocol::constants::{BUILD_ANCHOR, VERSION_FILE_NAME};

/// Maps a local bundle path to its path on the server for `platform`.
///
/// Callers must pass a path containing the `build/` anchor. Without it
/// the whole normalized path is treated as the bundle-relative tail,
/// which is deterministic but almost certainly not what the server
/// expects.
pub fn remap_upload_path(file_path: &str, platform: Platform) -> String {
    let normalized = file_path.replace('\\', "/");
    let tail = match normalized.rfind(BUILD_ANCHOR) {
        Some(idx) => &normalized[idx + BUILD_ANCHOR.len()..],
        None => normalized.as_str(),
    };
    format!("{}/{}{}", platform.segment(), BUILD_ANCHOR, tail)
}

/// Server path of the version manifest for `platform`.
pub fn version_file_path(platform: Platform) -> String {
    format!("{}/{}", platform.segment(), VERSION_FILE_NAME)
}

/// Joins a base URL and a relative remote path with exactly one `/`.
pub fn join_url(base_url: &str, remote_path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        remote_path.trim_start_matches('/')
    )
}

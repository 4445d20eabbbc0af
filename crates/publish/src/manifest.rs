//! Version manifest construction and persistence.

use std::path::{Path, PathBuf};

use bundlepub_protocol::VersionManifest;
use bundlepub_protocol::constants::VERSION_FILE_NAME;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::PublishError;
use crate::types::BundleRecord;

/// Builds and writes the version manifest for one platform output root.
pub struct ManifestBuilder {
    output_root: PathBuf,
}

impl ManifestBuilder {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// Where [`write`](Self::write) puts the manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.output_root.join(VERSION_FILE_NAME)
    }

    /// One entry per record: all individual bundles, then all packed
    /// bundles, each in the order given.
    pub fn build(
        &self,
        created_at: DateTime<Utc>,
        individual: &[BundleRecord],
        packed: &[BundleRecord],
    ) -> VersionManifest {
        let mut manifest = VersionManifest::new(created_at);
        for record in individual.iter().chain(packed) {
            if let Err(e) = manifest.push(record.bundle_path(), &record.content_hash) {
                warn!(error = %e, "skipping manifest entry");
            }
        }
        manifest
    }

    /// Serializes `manifest` into the output root, replacing any previous
    /// file. Returns the manifest text and its path.
    pub fn write(&self, manifest: &VersionManifest) -> Result<(String, PathBuf), PublishError> {
        ensure_dir(&self.output_root)?;

        let json = manifest.to_json()?;
        let path = self.manifest_path();
        std::fs::write(&path, &json)?;

        info!(path = %path.display(), entries = manifest.len(), "version manifest written");
        Ok((json, path))
    }

    /// Deletes a manifest left by an earlier build. Returns `true` if one
    /// was removed.
    pub fn remove_stale(&self) -> Result<bool, PublishError> {
        let path = self.manifest_path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "stale version manifest removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Creates `dir` (and parents), mapping failure to [`PublishError::OutputDir`].
pub(crate) fn ensure_dir(dir: &Path) -> Result<(), PublishError> {
    std::fs::create_dir_all(dir).map_err(|source| PublishError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}

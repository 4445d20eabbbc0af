//! Version manifest: the per-platform record of bundle path → content hash.
//!
//! Clients download this file first and compare hashes to decide which
//! bundles to fetch. The JSON shape is:
//!
//! ```json
//! {
//!   "createdAt": "2026-10-19T08:30:00Z",
//!   "entries": [{ "path": "ui/title.unity3d", "hash": "9f86d0..." }]
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// One bundle entry in a [`VersionManifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Bundle path relative to the platform's bundle root.
    pub path: String,
    /// Content hash reported by the build backend.
    pub hash: String,
}

/// Serialized record of every bundle published for one platform.
///
/// Entries keep insertion order and paths are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    entries: Vec<ManifestEntry>,
}

impl VersionManifest {
    /// Creates an empty manifest stamped with `created_at`.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            entries: Vec::new(),
        }
    }

    /// Appends an entry. Rejects a path that is already present.
    pub fn push(
        &mut self,
        path: impl Into<String>,
        hash: impl Into<String>,
    ) -> Result<(), ProtocolError> {
        let path = path.into();
        if self.contains(&path) {
            return Err(ProtocolError::DuplicatePath(path));
        }
        self.entries.push(ManifestEntry {
            path,
            hash: hash.into(),
        });
        Ok(())
    }

    /// Returns `true` if an entry with `path` exists.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    /// Looks up the hash recorded for `path`.
    pub fn hash_of(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.hash.as_str())
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes to pretty-printed UTF-8 JSON.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a manifest, re-checking path uniqueness.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let parsed: VersionManifest = serde_json::from_str(json)?;
        let mut manifest = VersionManifest::new(parsed.created_at);
        for entry in parsed.entries {
            manifest.push(entry.path, entry.hash)?;
        }
        Ok(manifest)
    }
}

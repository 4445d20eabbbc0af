//! Platform build backend seam.
//!
//! The orchestrator hands a backend the list of bundles to build for one
//! platform and gets back a content hash per bundle name. Real engines
//! plug in behind [`BuildBackend`]; [`PackingBackend`] is a self-contained
//! implementation that writes an uncompressed archive per bundle.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use bundlepub_protocol::Platform;
use bundlepub_protocol::constants::BUILD_DIR;
use bundlepub_transfer::checksum_bytes;
use tracing::{debug, warn};

use crate::error::PublishError;

/// One bundle to build: its name (bundle path) and member files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSpec {
    pub name: String,
    /// Member files relative to the source root.
    pub files: Vec<String>,
}

/// Builds bundles for one platform and reports their content hashes.
///
/// Callers filter out specs with no files first; implementations warn
/// and skip any that slip through. Called from a blocking thread.
pub trait BuildBackend: Send + Sync {
    fn build(
        &self,
        platform: Platform,
        bundles: &[BundleSpec],
    ) -> Result<HashMap<String, String>, PublishError>;
}

const PACK_MAGIC: &[u8; 4] = b"BPK1";

/// Writes each bundle to `<output>/<Segment>/build/<name>` as a
/// length-prefixed concatenation of its member files and hashes it with
/// SHA-256.
///
/// Layout: magic, platform segment, then per member `u32` path length,
/// path bytes, `u64` data length, data. All integers little-endian.
pub struct PackingBackend {
    source_root: PathBuf,
    output_dir: PathBuf,
}

impl PackingBackend {
    pub fn new(source_root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_dir: output_dir.into(),
        }
    }

    fn pack(&self, platform: Platform, spec: &BundleSpec) -> Result<Vec<u8>, PublishError> {
        let mut data = Vec::new();
        data.write_all(PACK_MAGIC)?;
        write_field(&mut data, platform.segment().as_bytes())?;

        for member in &spec.files {
            let bytes = std::fs::read(self.source_root.join(member))?;
            write_field(&mut data, member.as_bytes())?;
            data.write_all(&(bytes.len() as u64).to_le_bytes())?;
            data.write_all(&bytes)?;
        }
        Ok(data)
    }
}

fn write_field(out: &mut Vec<u8>, bytes: &[u8]) -> std::io::Result<()> {
    out.write_all(&(bytes.len() as u32).to_le_bytes())?;
    out.write_all(bytes)
}

impl BuildBackend for PackingBackend {
    fn build(
        &self,
        platform: Platform,
        bundles: &[BundleSpec],
    ) -> Result<HashMap<String, String>, PublishError> {
        let bundle_root = self.output_dir.join(platform.segment()).join(BUILD_DIR);
        let mut hashes = HashMap::with_capacity(bundles.len());

        for spec in bundles {
            if spec.files.is_empty() {
                warn!(bundle = %spec.name, "bundle has no member files, not building");
                continue;
            }

            let data = self.pack(platform, spec)?;
            let out_path = bundle_root.join(&spec.name);
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&out_path, &data)?;

            let hash = checksum_bytes(&data);
            debug!(bundle = %spec.name, bytes = data.len(), %hash, "bundle built");
            hashes.insert(spec.name.clone(), hash);
        }

        Ok(hashes)
    }
}

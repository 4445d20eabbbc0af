//! Data types for the publish flow.

use std::path::PathBuf;
use std::time::Duration;

use bundlepub_protocol::Platform;
use bundlepub_protocol::constants::DEFAULT_BATCH_SIZE;
use bundlepub_transfer::Credentials;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogOptions;
use crate::error::GroupingError;

/// How a bundle group was formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    /// One source file, one bundle.
    Individual,
    /// Every file beneath a marked directory.
    Packed,
}

/// A bundle as produced by the catalog, before it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleGroup {
    /// Bundle directory relative to the bundle root, `/`-separated.
    pub directory: String,
    pub bundle_name: String,
    /// Member files relative to the source root, `/`-separated.
    pub member_files: Vec<String>,
    pub kind: BundleKind,
}

impl BundleGroup {
    /// `<directory>/<bundle_name>`, the path used as build name and
    /// manifest entry.
    pub fn bundle_path(&self) -> String {
        join_bundle_path(&self.directory, &self.bundle_name)
    }
}

/// A built bundle with its content hash. Immutable once hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRecord {
    pub bundle_name: String,
    pub directory: String,
    pub member_files: Vec<String>,
    pub output_path: PathBuf,
    pub content_hash: String,
    pub kind: BundleKind,
}

impl BundleRecord {
    pub fn bundle_path(&self) -> String {
        join_bundle_path(&self.directory, &self.bundle_name)
    }
}

fn join_bundle_path(directory: &str, name: &str) -> String {
    let dir = directory.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// What the scheduler does after a failed transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and keep going.
    #[default]
    BestEffort,
    /// Drop the remaining queue once any transfer has failed.
    FailFast,
}

/// Scheduler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum asset transfers in flight at once. Must be at least 1.
    pub batch_size: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            failure_policy: FailurePolicy::BestEffort,
        }
    }
}

/// Resolved server selection for one publish call.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub base_url: String,
    pub credentials: Credentials,
}

impl ServerConfig {
    /// Returns a configuration error if the server cannot be published to.
    pub fn validate(&self) -> Result<(), crate::PublishError> {
        if self.base_url.trim().is_empty() {
            return Err(crate::PublishError::Config("server URL is empty".into()));
        }
        if !self.credentials.is_complete() {
            return Err(crate::PublishError::Config(
                "username and password are required".into(),
            ));
        }
        Ok(())
    }
}

/// Everything the orchestrator needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    /// Root of the source asset tree.
    pub source_root: PathBuf,
    /// Parent of the per-platform output roots.
    pub output_dir: PathBuf,
    pub catalog: CatalogOptions,
    pub scheduler: SchedulerConfig,
    /// Cadence of the scheduler tick driver.
    pub tick_interval: Duration,
}

impl PublishSettings {
    /// `<output_dir>/<Segment>`: holds the manifest and the bundle root.
    pub fn output_root(&self, platform: Platform) -> PathBuf {
        self.output_dir.join(platform.segment())
    }
}

/// A transfer that did not make it to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    pub url: String,
    pub message: String,
}

/// Aggregate result of one scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<TransferFailure>,
    /// Size of each asset batch, in launch order.
    pub batch_sizes: Vec<usize>,
    /// The queue was dropped under [`FailurePolicy::FailFast`].
    pub aborted: bool,
}

impl UploadSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.aborted
    }

    pub(crate) fn record(&mut self, url: &str, error: Option<String>) {
        match error {
            None => self.succeeded += 1,
            Some(message) => {
                self.failed += 1;
                self.failures.push(TransferFailure {
                    url: url.to_string(),
                    message,
                });
            }
        }
    }
}

/// Progress event emitted during publishing.
#[derive(Debug, Clone)]
pub enum PublishEvent {
    /// The version manifest transfer finished.
    ManifestUploaded {
        platform: Platform,
        url: String,
        error: Option<String>,
    },
    /// A new asset batch was launched.
    BatchStarted {
        platform: Platform,
        size: usize,
        remaining: usize,
    },
    /// One asset transfer finished.
    TaskFinished {
        platform: Platform,
        url: String,
        error: Option<String>,
    },
    /// The scheduler returned to idle.
    Completed {
        platform: Platform,
        summary: UploadSummary,
    },
}

/// Per-platform outcome of a build or publish call.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub platform: Platform,
    /// Written manifest, if the platform had any bundles.
    pub manifest_path: Option<PathBuf>,
    pub bundle_count: usize,
    pub warnings: Vec<GroupingError>,
    /// Files handed to the scheduler.
    pub file_count: usize,
    /// `None` when no upload was run for this platform.
    pub upload: Option<UploadSummary>,
    /// Fatal error for this platform only.
    pub error: Option<String>,
}

impl PublishReport {
    pub(crate) fn new(platform: Platform) -> Self {
        Self {
            platform,
            manifest_path: None,
            bundle_count: 0,
            warnings: Vec::new(),
            file_count: 0,
            upload: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.upload.as_ref().is_none_or(UploadSummary::is_success)
    }
}

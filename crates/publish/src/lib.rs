//! Bundle publish flow: catalog, build, manifest, batched upload.
//!
//! This crate implements the **business logic** for publishing asset
//! bundles to a content server. It has no CLI or engine dependencies:
//! the caller provides a [`BuildBackend`] that produces bundles and a
//! [`Transport`](bundlepub_transfer::Transport) that moves bytes.
//!
//! # Pipeline
//!
//! 1. **Scan**: group the source tree into individual and packed bundles
//! 2. **Build**: hand the non-empty groups to the backend, collect hashes
//! 3. **Manifest**: write `assetbundlelist.json` into the platform root
//! 4. **Upload**: manifest first, then bundle files in bounded batches

pub mod backend;
pub mod catalog;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod plan;
pub mod scheduler;
pub mod types;

// Re-export primary types for convenience.
pub use backend::{BuildBackend, BundleSpec, PackingBackend};
pub use catalog::{AssetCatalog, CatalogOptions, list_upload_files};
pub use error::{GroupingError, PublishError};
pub use manifest::ManifestBuilder;
pub use orchestrator::PublishOrchestrator;
pub use plan::BuildPlan;
pub use scheduler::{TickOutcome, UploadRequest, UploadScheduler};
pub use types::{
    BundleGroup, BundleKind, BundleRecord, FailurePolicy, PublishEvent, PublishReport,
    PublishSettings, SchedulerConfig, ServerConfig, TransferFailure, UploadSummary,
};

//! Publish orchestrator: build, manifest and upload per platform.
//!
//! Owns one [`UploadScheduler`] per platform and a shared event channel.
//! Platforms of an `All` run are processed in order (Windows, Android,
//! iOS); a failure on one is reported and the others continue.

use std::collections::HashMap;
use std::sync::Arc;

use bundlepub_protocol::constants::BUILD_DIR;
use bundlepub_protocol::{Platform, UploadTarget};
use bundlepub_transfer::Transport;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::backend::BuildBackend;
use crate::catalog::{AssetCatalog, list_upload_files};
use crate::error::PublishError;
use crate::manifest::{ManifestBuilder, ensure_dir};
use crate::plan::BuildPlan;
use crate::scheduler::{TickOutcome, UploadRequest, UploadScheduler};
use crate::types::{PublishEvent, PublishReport, PublishSettings, ServerConfig, UploadSummary};

/// Runs the publish pipeline for one or all platforms.
pub struct PublishOrchestrator {
    settings: PublishSettings,
    backend: Arc<dyn BuildBackend>,
    schedulers: HashMap<Platform, UploadScheduler>,
    events_rx: Option<mpsc::Receiver<PublishEvent>>,
}

impl PublishOrchestrator {
    pub fn new(
        settings: PublishSettings,
        backend: Arc<dyn BuildBackend>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        let schedulers = Platform::ALL
            .iter()
            .map(|&platform| {
                let scheduler =
                    UploadScheduler::new(platform, Arc::clone(&transport), settings.scheduler)
                        .with_events(events_tx.clone());
                (platform, scheduler)
            })
            .collect();

        Self {
            settings,
            backend,
            schedulers,
            events_rx: Some(events_rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<PublishEvent>> {
        self.events_rx.take()
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    pub fn scheduler(&self, platform: Platform) -> Option<&UploadScheduler> {
        self.schedulers.get(&platform)
    }

    /// True while any platform is still uploading.
    pub fn is_uploading(&self) -> bool {
        self.schedulers.values().any(UploadScheduler::is_in_upload)
    }

    /// Builds bundles and writes manifests without uploading.
    pub async fn build(&self, target: UploadTarget) -> Vec<PublishReport> {
        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => return failed_reports(target, &e),
        };

        let mut reports = Vec::new();
        for &platform in target.platforms() {
            let mut report = PublishReport::new(platform);
            report.warnings = plan.skipped.clone();
            if let Err(e) = self.prepare(platform, &plan, &mut report).await {
                error!(platform = %platform, error = %e, "build failed");
                report.error = Some(e.to_string());
            }
            reports.push(report);
        }
        reports
    }

    /// Builds, writes manifests and starts the uploads for `target`.
    ///
    /// Returns once every manifest is on the server and the asset
    /// queues are loaded; drive the uploads with [`tick_all`] or
    /// [`drive`]. Fails as a whole only when the server selection is
    /// invalid or a platform is already uploading.
    ///
    /// [`tick_all`]: Self::tick_all
    /// [`drive`]: Self::drive
    pub async fn start_publish(
        &mut self,
        target: UploadTarget,
        server: &ServerConfig,
    ) -> Result<Vec<PublishReport>, PublishError> {
        server.validate()?;
        for &platform in target.platforms() {
            if self.schedulers.get(&platform).is_some_and(UploadScheduler::is_in_upload) {
                return Err(PublishError::AlreadyUploading(platform));
            }
        }

        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => return Ok(failed_reports(target, &e)),
        };

        let mut reports = Vec::new();
        for &platform in target.platforms() {
            let mut report = PublishReport::new(platform);
            report.warnings = plan.skipped.clone();
            if let Err(e) = self
                .start_platform(platform, target, &plan, server, &mut report)
                .await
            {
                error!(platform = %platform, error = %e, "publish failed");
                report.error = Some(e.to_string());
            }
            reports.push(report);
        }
        Ok(reports)
    }

    /// Ticks every scheduler once, in platform order.
    pub async fn tick_all(&mut self) -> Vec<(Platform, TickOutcome)> {
        let mut outcomes = Vec::with_capacity(Platform::ALL.len());
        for platform in Platform::ALL {
            if let Some(scheduler) = self.schedulers.get_mut(&platform) {
                outcomes.push((platform, scheduler.tick().await));
            }
        }
        outcomes
    }

    /// Ticks at the configured interval until no platform is uploading.
    /// Returns the summary of every upload that completed.
    pub async fn drive(&mut self) -> HashMap<Platform, UploadSummary> {
        let mut summaries = HashMap::new();
        let mut ticker = tokio::time::interval(self.settings.tick_interval);
        loop {
            ticker.tick().await;
            for (platform, outcome) in self.tick_all().await {
                if let TickOutcome::Completed(summary) = outcome {
                    summaries.insert(platform, summary);
                }
            }
            if !self.is_uploading() {
                return summaries;
            }
        }
    }

    /// [`start_publish`](Self::start_publish) followed by
    /// [`drive`](Self::drive); reports carry the upload summaries.
    pub async fn publish(
        &mut self,
        target: UploadTarget,
        server: &ServerConfig,
    ) -> Result<Vec<PublishReport>, PublishError> {
        let mut reports = self.start_publish(target, server).await?;
        let mut summaries = self.drive().await;
        for report in &mut reports {
            if let Some(summary) = summaries.remove(&report.platform) {
                report.upload = Some(summary);
            }
        }
        Ok(reports)
    }

    fn plan(&self) -> Result<BuildPlan, PublishError> {
        let catalog = AssetCatalog::scan(&self.settings.source_root, &self.settings.catalog)?;
        let plan = BuildPlan::from_catalog(&catalog);
        info!(
            bundles = plan.len(),
            skipped = plan.skipped.len(),
            "build plan ready"
        );
        Ok(plan)
    }

    /// Builds the platform's bundles and writes its manifest. Returns the
    /// manifest text, or `None` when there is nothing to publish; a
    /// manifest from an earlier build is then deleted.
    async fn prepare(
        &self,
        platform: Platform,
        plan: &BuildPlan,
        report: &mut PublishReport,
    ) -> Result<Option<String>, PublishError> {
        let output_root = self.settings.output_root(platform);
        if plan.is_empty() {
            info!(platform = %platform, "no bundles to build");
            ManifestBuilder::new(&output_root).remove_stale()?;
            return Ok(None);
        }

        ensure_dir(&output_root)?;

        let backend = Arc::clone(&self.backend);
        let specs = plan.specs();
        let hashes = tokio::task::spawn_blocking(move || backend.build(platform, &specs))
            .await
            .map_err(|e| PublishError::Build {
                platform,
                message: format!("build task failed: {e}"),
            })??;

        let (individual, packed) =
            plan.attach_hashes(platform, &hashes, &output_root.join(BUILD_DIR))?;

        let builder = ManifestBuilder::new(&output_root);
        let manifest = builder.build(Utc::now(), &individual, &packed);
        let (json, path) = builder.write(&manifest)?;

        report.bundle_count = manifest.len();
        report.manifest_path = Some(path);
        Ok(Some(json))
    }

    async fn start_platform(
        &mut self,
        platform: Platform,
        target: UploadTarget,
        plan: &BuildPlan,
        server: &ServerConfig,
        report: &mut PublishReport,
    ) -> Result<(), PublishError> {
        let Some(manifest_json) = self.prepare(platform, plan, report).await? else {
            return Ok(());
        };

        let files = list_upload_files(&self.settings.output_root(platform))?;
        report.file_count = files.len();
        if files.is_empty() && target == UploadTarget::All {
            info!(platform = %platform, "no files to upload, skipping");
            return Ok(());
        }

        debug!(platform = %platform, files = files.len(), "handing files to scheduler");
        let scheduler = self
            .schedulers
            .get_mut(&platform)
            .ok_or_else(|| PublishError::Config(format!("no scheduler for {platform}")))?;
        scheduler
            .execute(UploadRequest {
                server: server.clone(),
                manifest_json,
                files,
            })
            .await
    }
}

fn failed_reports(target: UploadTarget, e: &PublishError) -> Vec<PublishReport> {
    error!(error = %e, "catalog scan failed");
    target
        .platforms()
        .iter()
        .map(|&platform| {
            let mut report = PublishReport::new(platform);
            report.error = Some(e.to_string());
            report
        })
        .collect()
}

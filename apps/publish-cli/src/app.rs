//! Command wiring: builds the publish pipeline from the configuration and
//! runs one command to completion.

use std::sync::Arc;

use bundlepub_protocol::UploadTarget;
use bundlepub_publish::{
    AssetCatalog, BuildPlan, PackingBackend, PublishEvent, PublishOrchestrator, PublishReport,
    ServerConfig, list_upload_files,
};
use bundlepub_transfer::{
    Credentials, LocalTransport, calculate_file_checksum, transport_for_url,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::Command;
use crate::config::{Config, ServerKind};

/// Runs `command`. Returns `false` if any platform failed.
pub async fn run(command: Command, config: Config) -> anyhow::Result<bool> {
    match command {
        Command::Build { target } => build(target, &config).await,
        Command::Publish {
            target,
            server,
            user,
            password,
        } => {
            let server = resolve_server(&config, server, user, password)?;
            publish(target, &server, &config).await
        }
        Command::List { target } => {
            list(target, &config)?;
            Ok(true)
        }
    }
}

async fn build(target: UploadTarget, config: &Config) -> anyhow::Result<bool> {
    let settings = config.to_settings();
    let backend = Arc::new(PackingBackend::new(&settings.source_root, &settings.output_dir));
    // Build never uploads; the transport only satisfies the scheduler wiring.
    let transport = Arc::new(LocalTransport::new(&settings.output_dir));
    let orchestrator = PublishOrchestrator::new(settings, backend, transport);

    let reports = orchestrator.build(target).await;
    Ok(log_reports(&reports))
}

async fn publish(
    target: UploadTarget,
    server: &ServerConfig,
    config: &Config,
) -> anyhow::Result<bool> {
    let settings = config.to_settings();
    let transport = transport_for_url(&server.base_url, config.request_timeout())?;
    let backend = Arc::new(PackingBackend::new(&settings.source_root, &settings.output_dir));
    let mut orchestrator = PublishOrchestrator::new(settings, backend, transport);

    let logger = orchestrator.take_events().map(|rx| tokio::spawn(log_events(rx)));

    info!(upload_target = %target, server = %server.base_url, "publishing");
    let result = orchestrator.publish(target, server).await;

    // Closes the event channel so the logger drains and exits.
    drop(orchestrator);
    if let Some(logger) = logger {
        let _ = logger.await;
    }

    let reports = result?;
    Ok(log_reports(&reports))
}

fn list(target: UploadTarget, config: &Config) -> anyhow::Result<()> {
    let settings = config.to_settings();
    let catalog = AssetCatalog::scan(&settings.source_root, &settings.catalog)?;
    let plan = BuildPlan::from_catalog(&catalog);

    println!("bundles ({}):", plan.len());
    for group in plan.individual.iter().chain(&plan.packed) {
        println!(
            "  {} [{:?}, {} file(s)]",
            group.bundle_path(),
            group.kind,
            group.member_files.len()
        );
    }
    for skipped in &plan.skipped {
        println!("  skipped: {skipped}");
    }

    for &platform in target.platforms() {
        let files = list_upload_files(&settings.output_root(platform))?;
        println!("{platform}: {} file(s) to upload", files.len());
        for file in files {
            let hash = calculate_file_checksum(&file)?;
            println!("  {}  {hash}", file.display());
        }
    }
    Ok(())
}

/// Picks the server URL from the presets and the credentials from the
/// command line, falling back to the configured username.
fn resolve_server(
    config: &Config,
    kind: ServerKind,
    user: Option<String>,
    password: Option<String>,
) -> anyhow::Result<ServerConfig> {
    let username = user
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| config.username.clone());
    anyhow::ensure!(
        !username.is_empty(),
        "no username: pass --user or set username in the config"
    );

    let password = password.unwrap_or_default();
    anyhow::ensure!(
        !password.is_empty(),
        "no password: pass --password or set BUNDLEPUB_PASSWORD"
    );

    let base_url = config.servers.url(kind).to_string();
    anyhow::ensure!(!base_url.is_empty(), "server preset {kind:?} has no URL");

    Ok(ServerConfig {
        base_url,
        credentials: Credentials::new(username, password),
    })
}

async fn log_events(mut rx: mpsc::Receiver<PublishEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            PublishEvent::ManifestUploaded {
                platform,
                url,
                error: None,
            } => info!(platform = %platform, url = %url, "manifest uploaded"),
            PublishEvent::ManifestUploaded {
                platform,
                url,
                error: Some(e),
            } => warn!(platform = %platform, url = %url, error = %e, "manifest upload failed"),
            PublishEvent::BatchStarted {
                platform,
                size,
                remaining,
            } => debug!(platform = %platform, size, remaining, "batch started"),
            PublishEvent::TaskFinished {
                platform,
                url,
                error,
            } => debug!(platform = %platform, url = %url, failed = error.is_some(), "transfer finished"),
            PublishEvent::Completed { platform, summary } => info!(
                platform = %platform,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "upload complete"
            ),
        }
    }
}

/// Logs one line per platform. Returns `true` if all succeeded.
fn log_reports(reports: &[PublishReport]) -> bool {
    let mut ok = true;
    for report in reports {
        for warning in &report.warnings {
            warn!(platform = %report.platform, "{warning}");
        }
        if let Some(e) = &report.error {
            error!(platform = %report.platform, error = %e, "failed");
            ok = false;
            continue;
        }

        match &report.upload {
            Some(summary) => {
                for failure in &summary.failures {
                    error!(
                        platform = %report.platform,
                        url = %failure.url,
                        error = %failure.message,
                        "transfer failed"
                    );
                }
                info!(
                    platform = %report.platform,
                    bundles = report.bundle_count,
                    uploaded = summary.succeeded,
                    failed = summary.failed,
                    aborted = summary.aborted,
                    "done"
                );
                ok &= summary.is_success();
            }
            None => info!(
                platform = %report.platform,
                bundles = report.bundle_count,
                manifest = ?report.manifest_path,
                "done"
            ),
        }
    }
    ok
}

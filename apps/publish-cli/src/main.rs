//! bundlepub command line entry point.

mod app;
mod config;

use std::path::PathBuf;

use bundlepub_protocol::UploadTarget;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::ServerKind;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build bundles and write version manifests without uploading
    Build {
        /// windows, android, ios or all
        #[arg(short, long, default_value = "all")]
        target: UploadTarget,
    },

    /// Build, write manifests and upload to a server
    Publish {
        /// windows, android, ios or all
        #[arg(short, long, default_value = "all")]
        target: UploadTarget,

        /// Server preset to upload to
        #[arg(short, long, value_enum, default_value_t = ServerKind::Development)]
        server: ServerKind,

        /// Upload account (overrides config)
        #[arg(short, long)]
        user: Option<String>,

        /// Upload password
        #[arg(short, long, env = "BUNDLEPUB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show the bundle groups and the files that would be uploaded
    List {
        /// windows, android, ios or all
        #[arg(short, long, default_value = "all")]
        target: UploadTarget,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bundlepub=debug")),
        )
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting bundlepub");

    let config = config::Config::load(cli.config.as_deref())?;
    tracing::debug!(
        source = %config.source_dir.display(),
        output = %config.output_dir.display(),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    let ok = rt.block_on(app::run(cli.command, config))?;
    anyhow::ensure!(ok, "one or more platforms failed");
    Ok(())
}

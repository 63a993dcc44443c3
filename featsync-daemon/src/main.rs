//! featsync-daemon entry point.
//!
//! Startup order matters: CLI parse -> config load -> CLI overrides ->
//! validate -> tracing init -> orchestrator build -> pass run -> report.
//! Tracing comes up before the orchestrator so that catalog and handle
//! construction are already observable.

use anyhow::Result;
use clap::Parser;

use featsync_core::config::FeatsyncConfig;
use featsync_daemon::cli::DaemonCli;
use featsync_daemon::logging;
use featsync_daemon::orchestrator::Orchestrator;
use featsync_daemon::report::PassReport;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = FeatsyncConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config from {}: {}", cli.config.display(), e))?;

    // CLI flags outrank both the config file and FEATSYNC_* env overrides.
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    logging::init_tracing(&config.general)?;

    if cli.validate {
        tracing::info!(config = %cli.config.display(), "configuration is valid");
        println!("configuration ok: {}", cli.config.display());
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "featsync-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config)?;
    let reports = orchestrator.run(cli.descriptor.as_deref(), cli.full).await?;

    println!("{}", serde_json::to_string_pretty(&reports)?);

    if reports.iter().any(PassReport::failed) {
        tracing::error!("one or more passes failed");
        std::process::exit(1);
    }

    tracing::info!(passes = reports.len(), "all passes complete");
    Ok(())
}

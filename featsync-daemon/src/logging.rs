//! Tracing setup for the daemon binary.
//!
//! The `[general]` config section picks the base level and output format.
//! A `RUST_LOG` environment filter, when present, wins over the config
//! level so operators can raise verbosity per run without editing files.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use featsync_core::config::GeneralConfig;

/// Install the global tracing subscriber.
///
/// Called once at startup, after config validation and before the
/// orchestrator is built, so catalog and handle construction are already
/// traced. Pass runs then correlate events via the `run_id` field.
///
/// `log_format` accepts `"json"` (one event per line, for shipped logs)
/// or `"pretty"` (terminal output); anything else is rejected here since
/// a daemon that silently falls back would hide a config typo.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize JSON tracing subscriber: {}", e)
                })?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize pretty tracing subscriber: {}", e)
                })?;
        }
        _ => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                config.log_format
            ));
        }
    }

    Ok(())
}

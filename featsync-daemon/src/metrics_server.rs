//! Prometheus scrape endpoint for pass and lifecycle metrics.
//!
//! Installs the global recorder from `metrics-exporter-prometheus` with its
//! built-in HTTP listener and registers HELP text for every metric named in
//! `featsync_core::metrics`. Only enabled when `[metrics] enabled = true`;
//! with it off, the `metrics` macros throughout the crates are no-ops.

use std::net::SocketAddr;

use anyhow::Result;
use featsync_core::config::MetricsConfig;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the global recorder and bind the scrape listener.
///
/// One recorder per process: a second call fails, as does binding an
/// address already in use. The scrape path is fixed at `/metrics`; any
/// other configured endpoint is rejected up front rather than being
/// silently served on the wrong path.
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    if config.endpoint != "/metrics" {
        return Err(anyhow::anyhow!(
            "unsupported metrics endpoint '{}': only '/metrics' is currently supported",
            config.endpoint
        ));
    }

    let addr: SocketAddr = format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict listen_addr in untrusted networks"
        );
    }

    tracing::info!(
        listen_addr = %addr,
        "installing Prometheus metrics recorder"
    );

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    // Register metric descriptions
    featsync_core::metrics::describe_all();

    tracing::info!(
        listen_addr = %addr,
        "Prometheus metrics endpoint active"
    );

    Ok(())
}

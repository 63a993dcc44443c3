//! CLI argument definitions for featsync-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Featsync feature-set reconciliation daemon.
///
/// Drives declarative feature-set passes across the configured server
/// fleet: reconcile, push, reload, and supervise readiness.
#[derive(Parser, Debug)]
#[command(name = "featsync-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to featsync.toml configuration file.
    #[arg(short, long, default_value = "/etc/featsync/featsync.toml")]
    pub config: PathBuf,

    /// Run only the pass with this descriptor id.
    ///
    /// Without this flag every gate-eligible pass runs in config order.
    #[arg(short, long)]
    pub descriptor: Option<String>,

    /// Include passes gated as `full`.
    #[arg(long)]
    pub full: bool,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without running any pass.
    #[arg(long)]
    pub validate: bool,
}

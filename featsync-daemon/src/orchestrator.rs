//! Pass orchestration -- descriptor selection, gate filtering, and
//! concurrent per-server application.
//!
//! The [`Orchestrator`] is the central coordinator of `featsync-daemon`.
//! It loads configuration, builds the catalog and descriptors, and runs
//! passes: each pass reconciles and applies one descriptor to every
//! targeted server concurrently (one task per server; handles are
//! independent, the catalog is shared read-only).
//!
//! The active descriptor is always passed explicitly through a
//! [`PassContext`] — there is no process-global "current pass".
//!
//! # Failure Isolation
//!
//! - `RuntimeLevelTooLow` -> server skipped with a warning, pass continues.
//! - `ReconfigurationFailed` / `ReadinessTimeout` -> server marked failed,
//!   remaining servers continue; the pass report aggregates to failed.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::task::JoinSet;
use uuid::Uuid;

use featsync_core::config::{FeatsyncConfig, LifecycleConfig, PassConfig};
use featsync_core::error::ReconcileError;
use featsync_core::metrics as metric_names;
use featsync_core::types::TestModeGate;
use featsync_reconciler::{ActionDescriptor, FeatureCatalog, ReconcileEngine};
use featsync_lifecycle::{FsServerControl, LifecycleController, ServerHandle};

use crate::metrics_server;
use crate::report::{OutcomeStatus, PassReport, ServerOutcome, aggregate_status};

/// Explicit context for one pass run.
///
/// Threaded into every per-server task so that log events and outcomes can
/// be correlated without any global state.
#[derive(Clone)]
pub struct PassContext {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// The active descriptor, frozen at first reconcile.
    pub descriptor: Arc<ActionDescriptor>,
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: FeatsyncConfig,
    /// Reconciliation engine over the shared catalog.
    engine: Arc<ReconcileEngine>,
    /// Handles for every configured server.
    handles: Vec<ServerHandle>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read, parsed, or
    /// validated.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = FeatsyncConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Useful for testing or when config has already been loaded.
    pub fn build_from_config(config: FeatsyncConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        // Install metrics recorder before any pass runs
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let catalog = Arc::new(FeatureCatalog::from_config(&config.catalog));
        let engine = Arc::new(ReconcileEngine::new(catalog));

        let handles: Vec<ServerHandle> = config.servers.iter().map(ServerHandle::from_config).collect();

        tracing::info!(
            servers = handles.len(),
            passes = config.passes.len(),
            families = engine.catalog().family_count(),
            "orchestrator initialized"
        );

        if config.metrics.enabled {
            record_daemon_metrics(handles.len());
        }

        Ok(Self {
            config,
            engine,
            handles,
            start_time: Instant::now(),
        })
    }

    /// Run the selected passes and return their reports.
    ///
    /// With `descriptor_id` set, only that pass runs (an unknown id is an
    /// error). Otherwise every gate-eligible pass runs in config order.
    /// Gate filtering: `quarantine` passes never run; `full` passes run
    /// only when `full` is set; `lite` passes always run.
    pub async fn run(&mut self, descriptor_id: Option<&str>, full: bool) -> Result<Vec<PassReport>> {
        let selected: Vec<PassConfig> = match descriptor_id {
            Some(id) => {
                let pass = self
                    .config
                    .passes
                    .iter()
                    .find(|p| p.id == id)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("no pass with descriptor id '{}'", id))?;
                vec![pass]
            }
            None => self.config.passes.clone(),
        };

        let mut reports = Vec::new();
        for pass in &selected {
            let gate = pass.parsed_gate();
            match gate {
                TestModeGate::Quarantine => {
                    tracing::info!(descriptor_id = pass.id.as_str(), "pass quarantined, not running");
                    continue;
                }
                TestModeGate::Full if !full => {
                    tracing::info!(
                        descriptor_id = pass.id.as_str(),
                        "pass gated as full, run with --full to include it"
                    );
                    continue;
                }
                TestModeGate::Full | TestModeGate::Lite => {}
            }

            let descriptor = ActionDescriptor::from_config(pass)
                .map_err(|e| anyhow::anyhow!("invalid pass '{}': {}", pass.id, e))?;
            let ctx = PassContext {
                run_id: Uuid::new_v4(),
                descriptor: Arc::new(descriptor),
            };
            reports.push(self.run_pass(ctx).await);
        }

        if self.config.metrics.enabled {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(metric_names::DAEMON_UPTIME_SECONDS)
                .set(self.start_time.elapsed().as_secs() as f64);
        }

        Ok(reports)
    }

    /// Apply one descriptor to every targeted server concurrently.
    async fn run_pass(&mut self, ctx: PassContext) -> PassReport {
        tracing::info!(
            run_id = %ctx.run_id,
            descriptor_id = ctx.descriptor.id(),
            gate = %ctx.descriptor.gate(),
            "pass starting"
        );

        let mut tasks: JoinSet<(ServerHandle, ServerOutcome)> = JoinSet::new();
        let mut kept = Vec::new();

        for mut handle in std::mem::take(&mut self.handles) {
            if !ctx.descriptor.applies_to(&handle.id) {
                kept.push(handle);
                continue;
            }
            let engine = Arc::clone(&self.engine);
            let ctx = ctx.clone();
            let lifecycle = self.config.lifecycle.clone();
            tasks.spawn(async move {
                let outcome = apply_to_server(&engine, &ctx, &lifecycle, &mut handle).await;
                (handle, outcome)
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((handle, outcome)) => {
                    kept.push(handle);
                    outcomes.push(outcome);
                }
                Err(e) => {
                    // A panicked apply task loses its handle; surface loudly.
                    tracing::error!(run_id = %ctx.run_id, error = %e, "apply task panicked");
                }
            }
        }

        kept.sort_by(|a, b| a.id.cmp(&b.id));
        self.handles = kept;
        outcomes.sort_by(|a, b| a.server_id.cmp(&b.server_id));

        let status = aggregate_status(&outcomes);
        let report = PassReport {
            run_id: ctx.run_id.to_string(),
            descriptor_id: ctx.descriptor.id().to_owned(),
            status,
            outcomes,
        };

        let result_label = if report.failed() { "failure" } else { "success" };
        metrics::counter!(
            metric_names::RECONCILE_PASSES_TOTAL,
            metric_names::LABEL_RESULT => result_label,
            metric_names::LABEL_GATE => ctx.descriptor.gate().to_string()
        )
        .increment(1);
        tracing::info!(
            run_id = %ctx.run_id,
            descriptor_id = ctx.descriptor.id(),
            status = ?report.status,
            servers = report.outcomes.len(),
            "pass complete"
        );
        report
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &FeatsyncConfig {
        &self.config
    }

    /// Read-only view of the server handles (ordered by id after a pass).
    pub fn handles(&self) -> &[ServerHandle] {
        &self.handles
    }
}

/// Reconcile and apply one descriptor to one server.
///
/// Never propagates an error: every failure mode is folded into the
/// returned [`ServerOutcome`] so sibling servers keep going.
async fn apply_to_server(
    engine: &ReconcileEngine,
    ctx: &PassContext,
    lifecycle: &LifecycleConfig,
    handle: &mut ServerHandle,
) -> ServerOutcome {
    let result = match engine.reconcile(&handle.features, &ctx.descriptor, handle.runtime_level) {
        Ok(result) => result,
        Err(ReconcileError::RuntimeLevelTooLow { level, required, .. }) => {
            tracing::warn!(
                run_id = %ctx.run_id,
                server_id = handle.id.as_str(),
                descriptor_id = ctx.descriptor.id(),
                level,
                required,
                "runtime level too low, skipping server"
            );
            metrics::counter!(
                metric_names::RECONCILE_SERVERS_SKIPPED_TOTAL,
                metric_names::LABEL_SERVER => handle.id.clone(),
                metric_names::LABEL_DESCRIPTOR => ctx.descriptor.id().to_owned()
            )
            .increment(1);
            return ServerOutcome {
                server_id: handle.id.clone(),
                status: OutcomeStatus::Skipped,
                detail: Some(format!("runtime level {level} below required {required}")),
            };
        }
    };

    let added = result
        .target
        .iter()
        .filter(|f| !handle.features.contains(f))
        .count();
    let removed = handle
        .features
        .iter()
        .filter(|f| !result.target.contains(f))
        .count();
    metrics::counter!(metric_names::RECONCILE_FEATURES_ADDED_TOTAL).increment(added as u64);
    metrics::counter!(metric_names::RECONCILE_FEATURES_REMOVED_TOTAL).increment(removed as u64);
    metrics::counter!(metric_names::RECONCILE_SUPERSESSIONS_TOTAL)
        .increment(result.superseded.len() as u64);

    let control = FsServerControl::new(&handle.id, &handle.root_dir);
    let controller = LifecycleController::new(control, lifecycle.clone());

    match controller.apply(handle, ctx.descriptor.id(), &result).await {
        Ok(featsync_lifecycle::ApplyOutcome::Unchanged) => ServerOutcome {
            server_id: handle.id.clone(),
            status: OutcomeStatus::Unchanged,
            detail: None,
        },
        Ok(featsync_lifecycle::ApplyOutcome::Reloaded) => ServerOutcome {
            server_id: handle.id.clone(),
            status: OutcomeStatus::Reloaded,
            detail: None,
        },
        Err(e) => {
            tracing::error!(
                run_id = %ctx.run_id,
                server_id = handle.id.as_str(),
                descriptor_id = ctx.descriptor.id(),
                evidence_lines = e.evidence().len(),
                error = %e,
                "reconfiguration failed"
            );
            for line in e.evidence() {
                tracing::debug!(server_id = handle.id.as_str(), line = line.as_str(), "evidence");
            }
            ServerOutcome {
                server_id: handle.id.clone(),
                status: OutcomeStatus::Failed,
                detail: Some(e.to_string()),
            }
        }
    }
}

/// Record daemon-level metrics (build info, managed servers).
///
/// This should be called once during orchestrator initialization.
fn record_daemon_metrics(server_count: usize) {
    metrics::gauge!(metric_names::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION"))
        .set(1.0);

    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(metric_names::DAEMON_SERVERS_MANAGED).set(server_count as f64);

    tracing::debug!(
        server_count,
        version = env!("CARGO_PKG_VERSION"),
        "daemon metrics recorded"
    );
}

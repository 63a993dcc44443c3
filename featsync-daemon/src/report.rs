//! Pass outcome reporting.
//!
//! A completed pass produces a [`PassReport`]: one [`ServerOutcome`] per
//! targeted server plus an aggregate status. The aggregate follows
//! worst-of semantics.
//!
//! # Aggregation Rule
//!
//! - All reloaded/unchanged -> Succeeded
//! - Any skipped, none failed -> SucceededWithSkips
//! - Any failed -> Failed

use serde::Serialize;

/// Result of applying one pass to one server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Feature set changed and the server confirmed readiness.
    Reloaded,
    /// Feature set already matched the target; no I/O performed.
    Unchanged,
    /// Server skipped (runtime level below the descriptor requirement).
    Skipped,
    /// Reconfiguration failed.
    Failed,
}

/// Aggregate status of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    Succeeded,
    SucceededWithSkips,
    Failed,
}

/// Per-server outcome within a pass.
#[derive(Debug, Clone, Serialize)]
pub struct ServerOutcome {
    /// Server identifier.
    pub server_id: String,
    /// Outcome classification.
    pub status: OutcomeStatus,
    /// Human-readable detail (skip reason or failure message).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Report for one completed pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    /// Unique run identifier for correlating log events.
    pub run_id: String,
    /// Descriptor that drove the pass.
    pub descriptor_id: String,
    /// Aggregate status (worst of all outcomes).
    pub status: PassStatus,
    /// Per-server outcomes, ordered by server id.
    pub outcomes: Vec<ServerOutcome>,
}

impl PassReport {
    /// Returns `true` if any server failed.
    pub fn failed(&self) -> bool {
        self.status == PassStatus::Failed
    }
}

/// Aggregate per-server outcomes into a single pass status.
///
/// Returns the worst status found: Failed > SucceededWithSkips > Succeeded.
/// An empty outcome list (no targeted servers) counts as Succeeded.
pub fn aggregate_status(outcomes: &[ServerOutcome]) -> PassStatus {
    let mut worst = PassStatus::Succeeded;
    for outcome in outcomes {
        match outcome.status {
            OutcomeStatus::Failed => return PassStatus::Failed,
            OutcomeStatus::Skipped => worst = PassStatus::SucceededWithSkips,
            OutcomeStatus::Reloaded | OutcomeStatus::Unchanged => {}
        }
    }
    worst
}

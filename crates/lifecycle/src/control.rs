//! Server control boundary.
//!
//! The [`ServerControl`] trait abstracts the transport to a managed server,
//! allowing the controller to use [`FsServerControl`] in production while
//! tests script probe sequences with `MockServerControl`.
//!
//! # Filesystem transport layout
//!
//! [`FsServerControl`] drives a server through its root directory:
//!
//! ```text
//! <root_dir>/
//!   config.toml        -- configuration document pushed by featsync
//!   reload.request     -- reload trigger marker (sequence number)
//!   server.running     -- liveness marker maintained by the server
//!   workarea/          -- server scratch space, recovered by tidy
//!   logs/messages.log  -- append-only diagnostic log (readiness oracle)
//! ```
//!
//! Configuration outcomes are asynchronous: the server acknowledges a reload
//! by appending a success or failure marker line to `messages.log`. Probing
//! scans only the lines appended after the last reload signal.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use featsync_core::error::LifecycleError;
use featsync_core::types::FeatureSet;

/// Default marker line confirming a completed configuration update.
pub const DEFAULT_READY_MARKER: &str = "configuration update completed";

/// Default marker line reporting a failed configuration update.
pub const DEFAULT_FATAL_MARKER: &str = "configuration update failed";

/// Default marker line announcing a clean server stop.
pub const DEFAULT_STOP_MARKER: &str = "server stopped";

/// Configuration document pushed to a managed server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Descriptor that produced this document.
    pub descriptor_id: String,
    /// Target feature set.
    pub features: FeatureSet,
}

/// Observed server condition at a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// No liveness marker; the server process is gone.
    NotRunning,
    /// Alive but no configuration outcome reported yet.
    Starting,
    /// Success marker observed since the last reload signal.
    Ready,
    /// Failure marker observed; carries the matching log line.
    Fatal(String),
}

/// Transport to one managed server.
///
/// Implementations are bound to a single server identity; errors carry that
/// identity so failures can be attributed without extra context.
pub trait ServerControl: Send + Sync + 'static {
    /// Writes the configuration document to the server.
    fn push_config(
        &self,
        doc: &ConfigDocument,
    ) -> impl Future<Output = Result<(), LifecycleError>> + Send;

    /// Asks the server to pick up the pushed configuration. Resets the
    /// readiness oracle so that [`probe`](Self::probe) only considers
    /// outcomes reported after this signal.
    fn signal_reload(&self) -> impl Future<Output = Result<(), LifecycleError>> + Send;

    /// Observes the server's current condition.
    fn probe(&self) -> impl Future<Output = Result<Probe, LifecycleError>> + Send;

    /// Returns the last `n` diagnostic log lines (fewer if the log is short).
    fn tail_log(
        &self,
        n: usize,
    ) -> impl Future<Output = Result<Vec<String>, LifecycleError>> + Send;

    /// Removes remnants of a previous instance at the same identity: stale
    /// reload requests, leftover scratch space, and a liveness marker the
    /// server announced it would drop but never did.
    fn tidy(&self) -> impl Future<Output = Result<(), LifecycleError>> + Send;
}

/// Production control implementation over a server root directory.
pub struct FsServerControl {
    server_id: String,
    root_dir: PathBuf,
    ready_marker: String,
    fatal_marker: String,
    stop_marker: String,
    /// Byte offset into `messages.log` at the last reload signal.
    log_offset: AtomicU64,
    reload_seq: AtomicU64,
}

impl FsServerControl {
    /// Creates a control bound to `root_dir` with the default markers.
    pub fn new(server_id: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_id: server_id.into(),
            root_dir: root_dir.into(),
            ready_marker: DEFAULT_READY_MARKER.to_owned(),
            fatal_marker: DEFAULT_FATAL_MARKER.to_owned(),
            stop_marker: DEFAULT_STOP_MARKER.to_owned(),
            log_offset: AtomicU64::new(0),
            reload_seq: AtomicU64::new(0),
        }
    }

    /// Overrides the readiness and failure marker lines.
    pub fn with_markers(
        mut self,
        ready_marker: impl Into<String>,
        fatal_marker: impl Into<String>,
    ) -> Self {
        self.ready_marker = ready_marker.into();
        self.fatal_marker = fatal_marker.into();
        self
    }

    fn config_path(&self) -> PathBuf {
        self.root_dir.join("config.toml")
    }

    fn reload_path(&self) -> PathBuf {
        self.root_dir.join("reload.request")
    }

    fn running_path(&self) -> PathBuf {
        self.root_dir.join("server.running")
    }

    fn workarea_path(&self) -> PathBuf {
        self.root_dir.join("workarea")
    }

    fn log_path(&self) -> PathBuf {
        self.root_dir.join("logs").join("messages.log")
    }

    fn control_err(&self, context: &str, e: impl std::fmt::Display) -> LifecycleError {
        LifecycleError::Control {
            server_id: self.server_id.clone(),
            reason: format!("{context}: {e}"),
        }
    }

    async fn read_log(&self) -> Result<String, LifecycleError> {
        match tokio::fs::read_to_string(self.log_path()).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(self.control_err("failed to read messages.log", e)),
        }
    }
}

impl ServerControl for FsServerControl {
    async fn push_config(&self, doc: &ConfigDocument) -> Result<(), LifecycleError> {
        let content = toml::to_string_pretty(doc)
            .map_err(|e| self.control_err("failed to serialize config document", e))?;
        tokio::fs::write(self.config_path(), content)
            .await
            .map_err(|e| self.control_err("failed to write config.toml", e))?;
        debug!(server_id = self.server_id.as_str(), "config document pushed");
        Ok(())
    }

    async fn signal_reload(&self) -> Result<(), LifecycleError> {
        // Record the log length first so no outcome line can slip between
        // the offset snapshot and the reload request becoming visible.
        let offset = self.read_log().await?.len() as u64;
        self.log_offset.store(offset, Ordering::Release);

        let seq = self.reload_seq.fetch_add(1, Ordering::Relaxed) + 1;
        tokio::fs::write(self.reload_path(), format!("{seq}\n"))
            .await
            .map_err(|e| self.control_err("failed to write reload request", e))?;
        debug!(
            server_id = self.server_id.as_str(),
            seq, "reload signalled"
        );
        Ok(())
    }

    async fn probe(&self) -> Result<Probe, LifecycleError> {
        let content = self.read_log().await?;
        let offset = self.log_offset.load(Ordering::Acquire) as usize;
        let appended = content.get(offset..).unwrap_or("");

        for line in appended.lines() {
            if line.contains(&self.fatal_marker) {
                return Ok(Probe::Fatal(line.to_owned()));
            }
        }
        for line in appended.lines() {
            if line.contains(&self.ready_marker) {
                return Ok(Probe::Ready);
            }
        }

        match tokio::fs::try_exists(self.running_path()).await {
            Ok(true) => Ok(Probe::Starting),
            Ok(false) => Ok(Probe::NotRunning),
            Err(e) => Err(self.control_err("failed to check liveness marker", e)),
        }
    }

    async fn tail_log(&self, n: usize) -> Result<Vec<String>, LifecycleError> {
        let content = self.read_log().await?;
        let mut lines: Vec<String> = content.lines().rev().take(n).map(str::to_owned).collect();
        lines.reverse();
        Ok(lines)
    }

    async fn tidy(&self) -> Result<(), LifecycleError> {
        remove_if_exists(&self.reload_path())
            .await
            .map_err(|e| self.control_err("failed to remove stale reload request", e))?;

        match tokio::fs::remove_dir_all(self.workarea_path()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(self.control_err("failed to recover workarea", e)),
        }

        // A liveness marker left behind after an announced stop is stale.
        let content = self.read_log().await?;
        let announced_stop = content
            .lines()
            .next_back()
            .is_some_and(|line| line.contains(&self.stop_marker));
        if announced_stop {
            remove_if_exists(&self.running_path())
                .await
                .map_err(|e| self.control_err("failed to remove stale liveness marker", e))?;
        }

        debug!(server_id = self.server_id.as_str(), "tidy complete");
        Ok(())
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Scripted control implementation for controller tests.
#[cfg(test)]
pub struct MockServerControl {
    server_id: String,
    /// Probe results returned in order; the last entry repeats.
    probes: std::sync::Mutex<Vec<Probe>>,
    pub pushed: std::sync::Mutex<Vec<ConfigDocument>>,
    pub reloads: AtomicU64,
    pub tidies: AtomicU64,
    pub log_lines: Vec<String>,
    pub fail_push: bool,
}

#[cfg(test)]
impl MockServerControl {
    pub fn new(server_id: &str) -> Self {
        Self {
            server_id: server_id.to_owned(),
            probes: std::sync::Mutex::new(vec![Probe::Ready]),
            pushed: std::sync::Mutex::new(Vec::new()),
            reloads: AtomicU64::new(0),
            tidies: AtomicU64::new(0),
            log_lines: Vec::new(),
            fail_push: false,
        }
    }

    pub fn with_probes(self, probes: Vec<Probe>) -> Self {
        *self.probes.lock().unwrap() = probes;
        self
    }

    pub fn with_log_lines(mut self, lines: Vec<String>) -> Self {
        self.log_lines = lines;
        self
    }

    pub fn with_failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }
}

#[cfg(test)]
impl ServerControl for MockServerControl {
    async fn push_config(&self, doc: &ConfigDocument) -> Result<(), LifecycleError> {
        if self.fail_push {
            return Err(LifecycleError::Control {
                server_id: self.server_id.clone(),
                reason: "mock push failure".to_owned(),
            });
        }
        self.pushed.lock().unwrap().push(doc.clone());
        Ok(())
    }

    async fn signal_reload(&self) -> Result<(), LifecycleError> {
        self.reloads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn probe(&self) -> Result<Probe, LifecycleError> {
        let mut probes = self.probes.lock().unwrap();
        if probes.len() > 1 {
            Ok(probes.remove(0))
        } else {
            Ok(probes[0].clone())
        }
    }

    async fn tail_log(&self, n: usize) -> Result<Vec<String>, LifecycleError> {
        let start = self.log_lines.len().saturating_sub(n);
        Ok(self.log_lines[start..].to_vec())
    }

    async fn tidy(&self) -> Result<(), LifecycleError> {
        self.tidies.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

//! Pure reconciliation engine.
//!
//! [`ReconcileEngine`] computes the target feature set for a server from its
//! current set and an [`ActionDescriptor`]. It performs no I/O, reads no
//! clock, and is deterministic, so it is safe to call concurrently for many
//! servers sharing one `Arc<FeatureCatalog>`.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use featsync_core::error::ReconcileError;
use featsync_core::types::{Feature, FeatureSet};

use crate::catalog::FeatureCatalog;
use crate::descriptor::ActionDescriptor;

/// A same-family feature evicted in favor of an incoming addition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Supersession {
    /// Feature removed from the working set.
    pub evicted: String,
    /// Addition that displaced it.
    pub replacement: String,
}

/// Outcome of a single reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// Computed target feature set.
    pub target: FeatureSet,
    /// Whether the target differs from the input set (membership only).
    pub changed: bool,
    /// Same-family evictions performed while applying additions.
    pub superseded: Vec<Supersession>,
}

/// Stateless reconciliation engine over a shared read-only catalog.
pub struct ReconcileEngine {
    catalog: Arc<FeatureCatalog>,
}

impl ReconcileEngine {
    /// Creates an engine over the given catalog.
    pub fn new(catalog: Arc<FeatureCatalog>) -> Self {
        Self { catalog }
    }

    /// Returns the shared catalog.
    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    /// Computes the effective minimum runtime level for a descriptor: the
    /// greater of the descriptor's own requirement and the catalog
    /// requirements of its additions.
    pub fn required_runtime_level(&self, descriptor: &ActionDescriptor) -> u32 {
        descriptor
            .additions()
            .iter()
            .filter_map(|id| self.catalog.min_runtime_level(&Feature::parse(id)))
            .fold(descriptor.min_runtime_level(), u32::max)
    }

    /// Reconciles `current` against `descriptor`.
    ///
    /// Order of operations: the runtime gate is checked first and fails
    /// without touching the inputs; removals are applied next (idempotent,
    /// absent members are no-ops); additions land last, each evicting any
    /// conflicting same-family member already present.
    ///
    /// The descriptor is frozen on entry; later amendment attempts fail with
    /// `DescriptorError::Frozen`.
    pub fn reconcile(
        &self,
        current: &FeatureSet,
        descriptor: &ActionDescriptor,
        server_runtime_level: u32,
    ) -> Result<ReconciliationResult, ReconcileError> {
        descriptor.freeze();

        let required = self.required_runtime_level(descriptor);
        if server_runtime_level < required {
            return Err(ReconcileError::RuntimeLevelTooLow {
                descriptor_id: descriptor.id().to_owned(),
                level: server_runtime_level,
                required,
            });
        }

        let mut target = current.clone();

        for removal in descriptor.removals().iter() {
            target.remove(removal);
        }

        let mut superseded = Vec::new();
        for addition in descriptor.additions().iter() {
            let incoming = Feature::parse(addition);
            if !self.catalog.is_known(&incoming) {
                debug!(
                    descriptor = descriptor.id(),
                    feature = addition,
                    "addition not in catalog, passing through unchanged"
                );
            }

            let evicted: Vec<String> = target
                .iter()
                .filter(|existing| {
                    self.catalog
                        .conflicts_with(&incoming, &Feature::parse(existing))
                })
                .map(str::to_owned)
                .collect();
            for member in evicted {
                target.remove(&member);
                superseded.push(Supersession {
                    evicted: member,
                    replacement: addition.to_owned(),
                });
            }

            target.insert(addition);
        }

        let changed = target != *current;
        Ok(ReconciliationResult {
            target,
            changed,
            superseded,
        })
    }
}

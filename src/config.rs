//! Engine configuration and cooperative cancellation.
//!
//! `CancelHandle` is lifted directly from the teacher's
//! `execution::timeout::CancelHandle` pattern (an `Arc<AtomicBool>` checked
//! at loop boundaries); loading `EngineConfig` from files/env is a CLI
//! concern (§1 Non-goals) so there is no `figment` layer here, only the
//! builder the core itself consumes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether a subtree should be forced local, allowed to go hybrid, or left
/// for the hybrid iterator to decide on its own (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionModeHint {
    #[default]
    Auto,
    ForceLocal,
}

/// Cooperative cancellation token shared down the whole iterator tree
/// (§5). Iterators check it at loop boundaries; `close` always runs on
/// unwind regardless of cancellation state.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        CancelHandle { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Engine-wide settings threaded through every `DynamicContext` (§10.3).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub execution_mode_hint: ExecutionModeHint,
    pub default_stable_sort: bool,
    /// Resource limit guarding OrderBy/GroupBy's full-materialization
    /// steps, analogous to the teacher's `ResourceLimits::max_intermediate_size`.
    pub max_materialized_tuples: Option<usize>,
    pub cancel: CancelHandle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            execution_mode_hint: ExecutionModeHint::Auto,
            default_stable_sort: false,
            max_materialized_tuples: None,
            cancel: CancelHandle::new(),
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder { config: EngineConfig::default() }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn force_local(mut self) -> Self {
        self.config.execution_mode_hint = ExecutionModeHint::ForceLocal;
        self
    }

    pub fn default_stable_sort(mut self, stable: bool) -> Self {
        self.config.default_stable_sort = stable;
        self
    }

    pub fn max_materialized_tuples(mut self, limit: usize) -> Self {
        self.config.max_materialized_tuples = Some(limit);
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_handle_is_cooperative() {
        let handle = CancelHandle::new();
        assert!(!handle.is_cancelled());
        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn builder_applies_overrides() {
        let config = EngineConfig::builder().force_local().max_materialized_tuples(10).build();
        assert_eq!(config.execution_mode_hint, ExecutionModeHint::ForceLocal);
        assert_eq!(config.max_materialized_tuples, Some(10));
    }
}

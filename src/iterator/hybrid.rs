//! Shared "decide once, then cache" hybrid execution logic (§4.1, §9).
//!
//! Both expression-level and tuple-level iterators that can run either
//! locally or against the distributed backend delegate the decision here
//! instead of repeating it inline at every `open`. The decision is made
//! once per iterator instance and reused by every subsequent `open`
//! (including across a `reset`), matching the teacher's `initIsRDD()`
//! memoization in its hybrid operators.

use std::cell::Cell;

use crate::config::ExecutionModeHint;

use super::ExecutionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChosenMode {
    Local,
    Rdd,
    DataFrame,
}

/// Picks a mode for one `open` call, honoring a forced-local hint over
/// whatever the child subtree reports itself capable of.
pub fn decide(hint: ExecutionModeHint, child_kind: ExecutionKind) -> ChosenMode {
    if hint == ExecutionModeHint::ForceLocal {
        return ChosenMode::Local;
    }
    match child_kind {
        ExecutionKind::RddCapable => ChosenMode::Rdd,
        ExecutionKind::DataFrameCapable => ChosenMode::DataFrame,
        ExecutionKind::LocalOnly => ChosenMode::Local,
    }
}

/// A memoized `ChosenMode`, computed at most once.
#[derive(Default)]
pub struct CachedDecision(Cell<Option<ChosenMode>>);

impl CachedDecision {
    pub fn new() -> Self {
        CachedDecision(Cell::new(None))
    }

    pub fn get_or_init(&self, compute: impl FnOnce() -> ChosenMode) -> ChosenMode {
        if let Some(mode) = self.0.get() {
            return mode;
        }
        let mode = compute();
        self.0.set(Some(mode));
        mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_local_hint_overrides_child_capability() {
        let mode = decide(ExecutionModeHint::ForceLocal, ExecutionKind::RddCapable);
        assert_eq!(mode, ChosenMode::Local);
    }

    #[test]
    fn auto_hint_follows_child_capability() {
        let mode = decide(ExecutionModeHint::Auto, ExecutionKind::DataFrameCapable);
        assert_eq!(mode, ChosenMode::DataFrame);
    }

    #[test]
    fn cached_decision_computes_once() {
        let cache = CachedDecision::new();
        let calls = std::cell::Cell::new(0);
        let first = cache.get_or_init(|| {
            calls.set(calls.get() + 1);
            ChosenMode::Local
        });
        let second = cache.get_or_init(|| {
            calls.set(calls.get() + 1);
            ChosenMode::Rdd
        });
        assert_eq!(first, ChosenMode::Local);
        assert_eq!(second, ChosenMode::Local);
        assert_eq!(calls.get(), 1);
    }
}

//! `RuntimeIterator`: the core streaming contract (§4.1).
//!
//! A single trait with capability methods replaces the teacher's
//! class-hierarchy idiom (local/hybrid/tuple subclasses) — per §9's
//! redesign note, a tagged `ExecutionKind` plus `Option`-returning
//! capability methods stands in for the base-class/visitor scaffolding.

pub mod arithmetic;
pub mod build;
pub mod comparison;
pub mod control;
pub mod function_call;
pub mod hybrid;
pub mod literal;
pub mod logical;
pub mod path;
pub mod quantified;
pub mod range;
pub mod sequence_ctor;

use std::sync::Arc;

use crate::context::DynamicContext;
use crate::distributed::dataframe::DataFrame;
use crate::distributed::PartitionedCollectionHandle;
use crate::error::JResult;
use crate::item::Item;

/// Which evaluation strategies a subtree is capable of (§4.1, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionKind {
    LocalOnly,
    RddCapable,
    DataFrameCapable,
}

/// The uniform pull-based item stream every expression implements (§4.1).
///
/// Lifecycle: `open` once, then `hasNext`/`next` pairs until exhausted,
/// then `close`. `close` must be idempotent and safe on a partially
/// consumed stream; every `open` must be matched by exactly one `close`,
/// including on error paths (§5, §8 "open/close balance").
pub trait RuntimeIterator: Send {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()>;

    fn has_next(&mut self) -> JResult<bool>;

    /// Fails with `JsoniqError::IteratorFlow` if called when `has_next()`
    /// would return `false` — iterator-flow misuse, not a user error (§4.1).
    fn next(&mut self) -> JResult<Item>;

    fn close(&mut self) -> JResult<()>;

    /// Rewinds to the beginning, possibly under a new context. Document-order
    /// streaming sources may reject this with `NotRewindable` (§4.1).
    fn reset(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let _ = context;
        Err(crate::error::JsoniqError::NotRewindable {
            reason: "this iterator does not support rewinding".to_string(),
        })
    }

    fn execution_kind(&self) -> ExecutionKind {
        ExecutionKind::LocalOnly
    }

    fn is_rdd(&self) -> bool {
        self.execution_kind() == ExecutionKind::RddCapable
    }

    fn get_rdd(&mut self, context: Arc<DynamicContext>) -> JResult<PartitionedCollectionHandle> {
        let _ = context;
        Err(crate::error::JsoniqError::dynamic(
            "this iterator is not RDD-capable; call is_rdd() first",
        ))
    }

    fn is_data_frame(&self) -> bool {
        self.execution_kind() == ExecutionKind::DataFrameCapable
    }

    fn get_data_frame(
        &mut self,
        context: Arc<DynamicContext>,
        projection: &[String],
    ) -> JResult<Box<dyn DataFrame>> {
        let _ = (context, projection);
        Err(crate::error::JsoniqError::dynamic(
            "this iterator is not DataFrame-capable; call is_data_frame() first",
        ))
    }

    /// Drains the whole stream into a `Vec`, closing it afterwards. A
    /// convenience used by the non-streaming edges of the pipeline (e.g.
    /// OrderBy's local materialization step, §4.4).
    ///
    /// Checks cancellation at each loop boundary (§5): a cancelled context
    /// surfaces `JsoniqError::Cancelled` from here rather than running to
    /// completion, `close()` still runs via `CloseGuard` on that path.
    fn materialize(&mut self, context: Arc<DynamicContext>) -> JResult<Vec<Item>> {
        self.open(Arc::clone(&context))?;
        let guard = CloseGuard(self);
        let this = guard.0;
        let mut out = Vec::new();
        while this.has_next()? {
            if context.is_cancelled() {
                return Err(crate::error::JsoniqError::Cancelled);
            }
            out.push(this.next()?);
        }
        drop(guard);
        Ok(out)
    }
}

/// Ensures `close()` runs on every exit path out of `materialize`,
/// including early returns from a propagated error — the guard/deferred-
/// release mechanism §5 calls for.
struct CloseGuard<'a>(&'a mut dyn RuntimeIterator);

impl Drop for CloseGuard<'_> {
    fn drop(&mut self) {
        let _ = self.0.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use literal::LiteralIterator;

    #[test]
    fn materialize_closes_even_after_full_drain() {
        let config = Arc::new(EngineConfig::default());
        let ctx = DynamicContext::root(config);
        let mut it = LiteralIterator::new(vec![Item::Integer(1), Item::Integer(2)]);
        let items = it.materialize(ctx).unwrap();
        assert_eq!(items, vec![Item::Integer(1), Item::Integer(2)]);
    }

    #[test]
    fn materialize_surfaces_cancellation() {
        let mut config = EngineConfig::default();
        config.cancel.cancel();
        let ctx = DynamicContext::root(Arc::new(config));
        let mut it = LiteralIterator::new(vec![Item::Integer(1), Item::Integer(2)]);
        let result = it.materialize(ctx);
        assert!(matches!(result, Err(crate::error::JsoniqError::Cancelled)));
    }
}

//! `QueryDriver`: the only place in this crate with partial-failure
//! semantics (§7). Everything below the driver — a single expression's
//! iterator tree — fails the whole expression on the first error; the
//! driver exists because a batch of independent top-level expressions
//! should not all abort because one of them does.
//!
//! Grounded in the teacher's `session.rs` query-dispatch role, scaled down
//! to this crate's concern: no network/session state, just fan out each
//! expression under its own `DynamicContext`, evaluate, and collect.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::ast::ExprNode;
use crate::config::EngineConfig;
use crate::context::DynamicContext;
use crate::error::JResult;
use crate::item::Item;
use crate::iterator::build::build;

/// Runs a batch of independent top-level expressions against a shared
/// `EngineConfig`, each under its own fresh root context.
pub struct QueryDriver {
    config: Arc<EngineConfig>,
}

impl QueryDriver {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        QueryDriver { config }
    }

    /// Evaluates `expressions` in order, one fresh `DynamicContext` per
    /// expression. A failure in one does not prevent the rest from
    /// running — the caller gets one `JResult` per input expression, in
    /// the same order, rather than the batch aborting on the first error.
    #[instrument(skip(self, expressions))]
    pub fn run_all(&self, expressions: &[Arc<ExprNode>]) -> Vec<JResult<Vec<Item>>> {
        expressions
            .iter()
            .enumerate()
            .map(|(index, expr)| {
                let result = self.run_one(expr);
                if let Err(e) = &result {
                    warn!(index, error = %e, "top-level expression failed");
                }
                result
            })
            .collect()
    }

    /// Evaluates a single top-level expression under a fresh root context.
    pub fn run_one(&self, expr: &Arc<ExprNode>) -> JResult<Vec<Item>> {
        let context = DynamicContext::root(Arc::clone(&self.config));
        let mut iterator = build(expr)?;
        iterator.materialize(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, ExprNode};
    use crate::error::SourceSpan;

    fn literal(n: i64) -> Arc<ExprNode> {
        ExprNode::new(ExprKind::IntegerLiteral(n.to_string()), SourceSpan::default())
    }

    fn undefined_variable() -> Arc<ExprNode> {
        ExprNode::new(ExprKind::VariableReference("does-not-exist".to_string()), SourceSpan::default())
    }

    #[test]
    fn one_failure_does_not_abort_the_others() {
        let driver = QueryDriver::new(Arc::new(EngineConfig::default()));
        let expressions = vec![literal(1), undefined_variable(), literal(3)];
        let results = driver.run_all(&expressions);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &vec![Item::Integer(1)]);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap(), &vec![Item::Integer(3)]);
    }
}

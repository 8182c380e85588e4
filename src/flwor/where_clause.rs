//! `where predicate` (§4.3): filters tuples by the predicate's effective
//! boolean value, evaluated against each tuple's accumulated bindings.

use std::sync::Arc;

use crate::ast::{DependencyMap, ExprNode};
use crate::context::DynamicContext;
use crate::error::JResult;
use crate::item::sequence_effective_boolean_value;
use crate::tuple::Tuple;

use super::{tuple_context, TupleIterator};

pub struct WhereIterator {
    source: Box<dyn TupleIterator>,
    predicate: Arc<ExprNode>,
    context: Option<Arc<DynamicContext>>,
    pending: Option<Tuple>,
}

impl WhereIterator {
    pub fn new(source: Box<dyn TupleIterator>, predicate: Arc<ExprNode>) -> Self {
        WhereIterator { source, predicate, context: None, pending: None }
    }

    /// Pulls from the source until a matching tuple is found or the source
    /// is exhausted, buffering the match in `pending` for `next`.
    fn fill_pending(&mut self) -> JResult<bool> {
        if self.pending.is_some() {
            return Ok(true);
        }
        let context = self.context.clone().expect("fill_pending called before open");
        while self.source.has_next()? {
            let tuple = self.source.next()?;
            let child_context = tuple_context(&context, &tuple);
            let mut predicate_iter = crate::iterator::build::build(&self.predicate)?;
            let items = predicate_iter.materialize(child_context)?;
            if sequence_effective_boolean_value(&items)? {
                self.pending = Some(tuple);
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl TupleIterator for WhereIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        self.source.open(Arc::clone(&context))?;
        self.context = Some(context);
        self.pending = None;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        self.fill_pending()
    }

    fn next(&mut self) -> JResult<Tuple> {
        if !self.has_next()? {
            return Err(crate::error::JsoniqError::iterator_flow("WhereIterator::next", "called when has_next() is false"));
        }
        Ok(self.pending.take().expect("has_next just confirmed a pending tuple"))
    }

    fn close(&mut self) -> JResult<()> {
        self.pending = None;
        self.source.close()
    }

    fn bound_variables(&self) -> Vec<String> {
        Vec::new()
    }

    fn variable_dependencies(&self) -> DependencyMap {
        crate::ast::free_variable_dependencies(&self.predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, ValueCompareOp};
    use crate::config::EngineConfig;
    use crate::error::SourceSpan;
    use crate::item::Item;

    fn ctx() -> Arc<DynamicContext> {
        DynamicContext::root(Arc::new(EngineConfig::default()))
    }

    fn eq_two() -> Arc<ExprNode> {
        ExprNode::new(
            ExprKind::ValueCompare {
                op: ValueCompareOp::Eq,
                lhs: ExprNode::new(ExprKind::VariableReference("x".to_string()), SourceSpan::default()),
                rhs: ExprNode::new(ExprKind::IntegerLiteral("2".to_string()), SourceSpan::default()),
            },
            SourceSpan::default(),
        )
    }

    #[test]
    fn filters_out_non_matching_tuples() {
        let seed = Box::new(super::super::SeedTupleIterator::new());
        let source = Box::new(crate::iterator::literal::LiteralIterator::new(vec![
            Item::Integer(1),
            Item::Integer(2),
            Item::Integer(3),
        ]));
        let for_it = Box::new(crate::flwor::for_clause::ForIterator::new(seed, "x".to_string(), None, source));
        let mut it = WhereIterator::new(for_it, eq_two());
        let tuples = it.materialize(ctx()).unwrap();
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].get("x"), Some(&vec![Item::Integer(2)]));
    }
}

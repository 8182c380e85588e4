//! `return expr` (§4.3, §4.5 `Flwor`): the bridge back from the tuple
//! world to the item world. Evaluates the return expression once per
//! tuple, against that tuple's bindings, concatenating every tuple's
//! output items in stream order.

use std::sync::Arc;

use crate::ast::ExprNode;
use crate::context::DynamicContext;
use crate::error::{JResult, JsoniqError};
use crate::item::Item;
use crate::iterator::RuntimeIterator;

use super::{tuple_context, TupleIterator};

pub struct ReturnIterator {
    source: Box<dyn TupleIterator>,
    expr: Arc<ExprNode>,
    context: Option<Arc<DynamicContext>>,
    current_items: Vec<Item>,
    item_position: usize,
}

impl ReturnIterator {
    pub fn new(source: Box<dyn TupleIterator>, expr: Arc<ExprNode>) -> Self {
        ReturnIterator { source, expr, context: None, current_items: Vec::new(), item_position: 0 }
    }

    fn advance_to_next_nonempty(&mut self) -> JResult<bool> {
        let context = self.context.clone().expect("advance_to_next_nonempty called before open");
        while self.source.has_next()? {
            let tuple = self.source.next()?;
            let child_context = tuple_context(&context, &tuple);
            let mut expr_iter = crate::iterator::build::build(&self.expr)?;
            let items = expr_iter.materialize(child_context)?;
            if !items.is_empty() {
                self.current_items = items;
                self.item_position = 0;
                return Ok(true);
            }
        }
        self.current_items.clear();
        self.item_position = 0;
        Ok(false)
    }
}

impl RuntimeIterator for ReturnIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        self.source.open(Arc::clone(&context))?;
        self.context = Some(context);
        self.current_items.clear();
        self.item_position = 0;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        if self.item_position < self.current_items.len() {
            return Ok(true);
        }
        self.advance_to_next_nonempty()
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(JsoniqError::iterator_flow("ReturnIterator::next", "called when has_next() is false"));
        }
        let item = self.current_items[self.item_position].clone();
        self.item_position += 1;
        Ok(item)
    }

    fn close(&mut self) -> JResult<()> {
        self.current_items.clear();
        self.item_position = 0;
        self.source.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprKind;
    use crate::config::EngineConfig;
    use crate::error::SourceSpan;
    use crate::iterator::literal::LiteralIterator;

    fn ctx() -> Arc<DynamicContext> {
        DynamicContext::root(Arc::new(EngineConfig::default()))
    }

    #[test]
    fn returns_variable_reference_per_tuple() {
        let seed = Box::new(super::super::SeedTupleIterator::new());
        let source = Box::new(LiteralIterator::new(vec![Item::Integer(1), Item::Integer(2)]));
        let for_it = Box::new(crate::flwor::for_clause::ForIterator::new(seed, "x".to_string(), None, source));
        let expr = ExprNode::new(ExprKind::VariableReference("x".to_string()), SourceSpan::default());
        let mut it = ReturnIterator::new(for_it, expr);
        assert_eq!(it.materialize(ctx()).unwrap(), vec![Item::Integer(1), Item::Integer(2)]);
    }
}

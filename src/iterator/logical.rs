//! Short-circuit logical `and`/`or` over effective boolean values (§4.5).

use std::sync::Arc;

use crate::ast::LogicalOp;
use crate::context::DynamicContext;
use crate::error::JResult;
use crate::item::{sequence_effective_boolean_value, Item};

use super::RuntimeIterator;

pub struct LogicalIterator {
    op: LogicalOp,
    lhs: Box<dyn RuntimeIterator>,
    rhs: Box<dyn RuntimeIterator>,
    result: Option<bool>,
    emitted: bool,
}

impl LogicalIterator {
    pub fn new(op: LogicalOp, lhs: Box<dyn RuntimeIterator>, rhs: Box<dyn RuntimeIterator>) -> Self {
        LogicalIterator { op, lhs, rhs, result: None, emitted: false }
    }
}

impl RuntimeIterator for LogicalIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let left_items = self.lhs.materialize(Arc::clone(&context))?;
        let left = sequence_effective_boolean_value(&left_items)?;

        let short_circuits = match self.op {
            LogicalOp::And => !left,
            LogicalOp::Or => left,
        };

        self.result = Some(if short_circuits {
            left
        } else {
            let right_items = self.rhs.materialize(context)?;
            let right = sequence_effective_boolean_value(&right_items)?;
            match self.op {
                LogicalOp::And => left && right,
                LogicalOp::Or => left || right,
            }
        });
        self.emitted = false;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.result.is_some() && !self.emitted)
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(crate::error::JsoniqError::iterator_flow(
                "LogicalIterator::next",
                "called when has_next() is false",
            ));
        }
        self.emitted = true;
        Ok(Item::Boolean(self.result.unwrap()))
    }

    fn close(&mut self) -> JResult<()> {
        self.result = None;
        self.emitted = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::iterator::literal::LiteralIterator;

    fn ctx() -> Arc<DynamicContext> {
        DynamicContext::root(Arc::new(EngineConfig::default()))
    }

    #[test]
    fn and_short_circuits_on_false_left() {
        let lhs = Box::new(LiteralIterator::new(vec![Item::Boolean(false)]));
        let rhs = Box::new(LiteralIterator::new(vec![]));
        let mut it = LogicalIterator::new(LogicalOp::And, lhs, rhs);
        let items = it.materialize(ctx()).unwrap();
        assert_eq!(items, vec![Item::Boolean(false)]);
    }

    #[test]
    fn or_short_circuits_on_true_left() {
        let lhs = Box::new(LiteralIterator::new(vec![Item::Boolean(true)]));
        let rhs = Box::new(LiteralIterator::new(vec![]));
        let mut it = LogicalIterator::new(LogicalOp::Or, lhs, rhs);
        let items = it.materialize(ctx()).unwrap();
        assert_eq!(items, vec![Item::Boolean(true)]);
    }
}

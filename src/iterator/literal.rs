//! Literal sequences and variable references (§4.5).

use std::sync::Arc;

use crate::context::DynamicContext;
use crate::error::JResult;
use crate::item::{Item, Sequence};

use super::RuntimeIterator;

/// Streams a fixed, already-materialized sequence. Used for all scalar
/// literals (null/boolean/string/integer/decimal/double) once the value is
/// parsed, and for `SequenceLiteral` nodes.
pub struct LiteralIterator {
    items: Sequence,
    position: usize,
    opened: bool,
}

impl LiteralIterator {
    pub fn new(items: Sequence) -> Self {
        LiteralIterator { items, position: 0, opened: false }
    }
}

impl RuntimeIterator for LiteralIterator {
    fn open(&mut self, _context: Arc<DynamicContext>) -> JResult<()> {
        self.position = 0;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.opened && self.position < self.items.len())
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(crate::error::JsoniqError::iterator_flow(
                "LiteralIterator::next",
                "called when has_next() is false",
            ));
        }
        let item = self.items[self.position].clone();
        self.position += 1;
        Ok(item)
    }

    fn close(&mut self) -> JResult<()> {
        self.opened = false;
        Ok(())
    }

    fn reset(&mut self, _context: Arc<DynamicContext>) -> JResult<()> {
        self.position = 0;
        Ok(())
    }
}

/// Streams the current binding of a single variable (§4.5 "variable
/// reference"). Tolerates either a materialized or partitioned binding by
/// forcing materialization at `open` time — a hybrid consumer that wants to
/// stay distributed reads the raw binding from the context itself instead
/// of going through this iterator.
pub struct VariableReferenceIterator {
    name: String,
    inner: Option<LiteralIterator>,
}

impl VariableReferenceIterator {
    pub fn new(name: impl Into<String>) -> Self {
        VariableReferenceIterator { name: name.into(), inner: None }
    }
}

impl RuntimeIterator for VariableReferenceIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let binding = context.lookup(&self.name)?;
        let materialized = binding.materialize()?;
        let mut inner = LiteralIterator::new(materialized);
        inner.open(context)?;
        self.inner = Some(inner);
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        match &mut self.inner {
            Some(inner) => inner.has_next(),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> JResult<Item> {
        match &mut self.inner {
            Some(inner) => inner.next(),
            None => Err(crate::error::JsoniqError::iterator_flow(
                "VariableReferenceIterator::next",
                "called before open()",
            )),
        }
    }

    fn close(&mut self) -> JResult<()> {
        if let Some(inner) = &mut self.inner {
            inner.close()?;
        }
        Ok(())
    }

    fn reset(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        self.open(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::context::Binding;

    #[test]
    fn variable_reference_streams_bound_sequence() {
        let config = Arc::new(EngineConfig::default());
        let root = DynamicContext::root(config);
        let ctx = root.child_with_binding("x", Binding::Materialized(vec![Item::Integer(7)]));
        let mut it = VariableReferenceIterator::new("x");
        let items = it.materialize(ctx).unwrap();
        assert_eq!(items, vec![Item::Integer(7)]);
    }
}

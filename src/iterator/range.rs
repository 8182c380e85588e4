//! `a to b`: a lazy inclusive integer range (§4.5).

use std::sync::Arc;

use crate::context::DynamicContext;
use crate::error::{JResult, JsoniqError};
use crate::item::Item;

use super::RuntimeIterator;

pub struct RangeIterator {
    lo: Box<dyn RuntimeIterator>,
    hi: Box<dyn RuntimeIterator>,
    current: Option<i64>,
    end: Option<i64>,
}

impl RangeIterator {
    pub fn new(lo: Box<dyn RuntimeIterator>, hi: Box<dyn RuntimeIterator>) -> Self {
        RangeIterator { lo, hi, current: None, end: None }
    }

    fn singleton_integer(it: &mut dyn RuntimeIterator, context: Arc<DynamicContext>) -> JResult<i64> {
        let items = it.materialize(context)?;
        match items.as_slice() {
            [Item::Integer(n)] => Ok(*n),
            [other] => Err(JsoniqError::unexpected_type("integer", other.type_tag().to_string())),
            _ => Err(JsoniqError::dynamic("range operands must each be a single integer")),
        }
    }
}

impl RuntimeIterator for RangeIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let lo = Self::singleton_integer(self.lo.as_mut(), Arc::clone(&context))?;
        let hi = Self::singleton_integer(self.hi.as_mut(), context)?;
        // lo > hi yields an empty sequence (§4.5); current starts one below
        // lo and we stop as soon as it would exceed hi.
        self.current = Some(lo - 1);
        self.end = Some(hi);
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        match (self.current, self.end) {
            (Some(cur), Some(end)) => Ok(cur + 1 <= end),
            _ => Ok(false),
        }
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(JsoniqError::iterator_flow("RangeIterator::next", "called when has_next() is false"));
        }
        let next = self.current.unwrap() + 1;
        self.current = Some(next);
        Ok(Item::Integer(next))
    }

    fn close(&mut self) -> JResult<()> {
        self.current = None;
        self.end = None;
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
    fn inclusive_ascending_range() {
        let lo = Box::new(LiteralIterator::new(vec![Item::Integer(1)]));
        let hi = Box::new(LiteralIterator::new(vec![Item::Integer(5)]));
        let mut it = RangeIterator::new(lo, hi);
        let items = it.materialize(ctx()).unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5].into_iter().map(Item::Integer).collect::<Vec<_>>());
    }

    #[test]
    fn empty_when_lo_greater_than_hi() {
        let lo = Box::new(LiteralIterator::new(vec![Item::Integer(5)]));
        let hi = Box::new(LiteralIterator::new(vec![Item::Integer(1)]));
        let mut it = RangeIterator::new(lo, hi);
        let items = it.materialize(ctx()).unwrap();
        assert!(items.is_empty());
    }
}

//! Value and general comparisons (§4.5).
//!
//! Value comparisons require singleton operands; general comparisons do
//! existential matching over the cartesian product and treat an empty
//! operand as `false` overall.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::ast::{GeneralCompareOp, ValueCompareOp};
use crate::context::DynamicContext;
use crate::error::{JResult, JsoniqError};
use crate::item::ordering::compare_items;
use crate::item::{items_equal, Item};

use super::RuntimeIterator;

fn value_compare_matches(op: ValueCompareOp, a: &Item, b: &Item) -> JResult<bool> {
    match op {
        ValueCompareOp::Eq => items_equal(a, b),
        ValueCompareOp::Ne => items_equal(a, b).map(|eq| !eq),
        ValueCompareOp::Lt => compare_items(a, b).map(|o| o == Ordering::Less),
        ValueCompareOp::Le => compare_items(a, b).map(|o| o != Ordering::Greater),
        ValueCompareOp::Gt => compare_items(a, b).map(|o| o == Ordering::Greater),
        ValueCompareOp::Ge => compare_items(a, b).map(|o| o != Ordering::Less),
    }
}

fn general_compare_matches(op: GeneralCompareOp, a: &Item, b: &Item) -> JResult<bool> {
    let vc = match op {
        GeneralCompareOp::Eq => ValueCompareOp::Eq,
        GeneralCompareOp::Ne => ValueCompareOp::Ne,
        GeneralCompareOp::Lt => ValueCompareOp::Lt,
        GeneralCompareOp::Le => ValueCompareOp::Le,
        GeneralCompareOp::Gt => ValueCompareOp::Gt,
        GeneralCompareOp::Ge => ValueCompareOp::Ge,
    };
    value_compare_matches(vc, a, b)
}

pub struct ValueCompareIterator {
    op: ValueCompareOp,
    lhs: Box<dyn RuntimeIterator>,
    rhs: Box<dyn RuntimeIterator>,
    result: Option<bool>,
    emitted: bool,
}

impl ValueCompareIterator {
    pub fn new(op: ValueCompareOp, lhs: Box<dyn RuntimeIterator>, rhs: Box<dyn RuntimeIterator>) -> Self {
        ValueCompareIterator { op, lhs, rhs, result: None, emitted: false }
    }
}

impl RuntimeIterator for ValueCompareIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let a = self.lhs.materialize(Arc::clone(&context))?;
        let b = self.rhs.materialize(context)?;
        let (a, b) = match (a.as_slice(), b.as_slice()) {
            ([a], [b]) => (a, b),
            _ => return Err(JsoniqError::dynamic("value comparison requires singleton operands")),
        };
        self.result = Some(value_compare_matches(self.op, a, b)?);
        self.emitted = false;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.result.is_some() && !self.emitted)
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(JsoniqError::iterator_flow("ValueCompareIterator::next", "called when has_next() is false"));
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

/// General comparison: empty existential matching over the cartesian
/// product; an empty operand makes the whole comparison `false` (§4.5).
pub struct GeneralCompareIterator {
    op: GeneralCompareOp,
    lhs: Box<dyn RuntimeIterator>,
    rhs: Box<dyn RuntimeIterator>,
    result: Option<bool>,
    emitted: bool,
}

impl GeneralCompareIterator {
    pub fn new(op: GeneralCompareOp, lhs: Box<dyn RuntimeIterator>, rhs: Box<dyn RuntimeIterator>) -> Self {
        GeneralCompareIterator { op, lhs, rhs, result: None, emitted: false }
    }
}

impl RuntimeIterator for GeneralCompareIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let a = self.lhs.materialize(Arc::clone(&context))?;
        let b = self.rhs.materialize(context)?;
        let mut matched = false;
        'outer: for x in &a {
            for y in &b {
                if general_compare_matches(self.op, x, y)? {
                    matched = true;
                    break 'outer;
                }
            }
        }
        self.result = Some(matched);
        self.emitted = false;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.result.is_some() && !self.emitted)
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(JsoniqError::iterator_flow("GeneralCompareIterator::next", "called when has_next() is false"));
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
    fn value_compare_requires_singletons() {
        let lhs = Box::new(LiteralIterator::new(vec![Item::Integer(1), Item::Integer(2)]));
        let rhs = Box::new(LiteralIterator::new(vec![Item::Integer(1)]));
        let mut it = ValueCompareIterator::new(ValueCompareOp::Eq, lhs, rhs);
        assert!(it.materialize(ctx()).is_err());
    }

    #[test]
    fn general_compare_is_existential() {
        let lhs = Box::new(LiteralIterator::new(vec![Item::Integer(1), Item::Integer(2)]));
        let rhs = Box::new(LiteralIterator::new(vec![Item::Integer(2), Item::Integer(3)]));
        let mut it = GeneralCompareIterator::new(GeneralCompareOp::Eq, lhs, rhs);
        let items = it.materialize(ctx()).unwrap();
        assert_eq!(items, vec![Item::Boolean(true)]);
    }

    #[test]
    fn general_compare_empty_operand_is_false() {
        let lhs = Box::new(LiteralIterator::new(vec![]));
        let rhs = Box::new(LiteralIterator::new(vec![Item::Integer(3)]));
        let mut it = GeneralCompareIterator::new(GeneralCompareOp::Eq, lhs, rhs);
        let items = it.materialize(ctx()).unwrap();
        assert_eq!(items, vec![Item::Boolean(false)]);
    }
}

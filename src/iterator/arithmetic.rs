//! Arithmetic operators over the numeric promotion lattice (§4.5).

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::ast::ArithOp;
use crate::context::DynamicContext;
use crate::error::{JResult, JsoniqError};
use crate::item::{promote_pair, Item, PromotedNumeric};

use super::RuntimeIterator;

pub struct ArithmeticIterator {
    op: ArithOp,
    lhs: Box<dyn RuntimeIterator>,
    rhs: Box<dyn RuntimeIterator>,
    result: Option<Item>,
    emitted: bool,
}

impl ArithmeticIterator {
    pub fn new(op: ArithOp, lhs: Box<dyn RuntimeIterator>, rhs: Box<dyn RuntimeIterator>) -> Self {
        ArithmeticIterator { op, lhs, rhs, result: None, emitted: false }
    }

    fn singleton_numeric(it: &mut dyn RuntimeIterator, context: Arc<DynamicContext>) -> JResult<Item> {
        let items = it.materialize(context)?;
        match items.as_slice() {
            [single] if single.is_numeric() => Ok(items.into_iter().next().unwrap()),
            [single] => Err(JsoniqError::unexpected_type("numeric", single.type_tag().to_string())),
            [] => Err(JsoniqError::dynamic("arithmetic operand must be a singleton, found empty sequence")),
            _ => Err(JsoniqError::dynamic("arithmetic operand must be a singleton")),
        }
    }

    fn apply(op: ArithOp, a: &Item, b: &Item) -> JResult<Item> {
        let (pa, pb) = promote_pair(a, b)?;
        match (pa, pb) {
            (PromotedNumeric::Integer(x), PromotedNumeric::Integer(y)) => int_op(op, x, y).map(Item::Integer),
            (PromotedNumeric::Decimal(x), PromotedNumeric::Decimal(y)) => decimal_op(op, x, y).map(Item::Decimal),
            (PromotedNumeric::Double(x), PromotedNumeric::Double(y)) => Ok(Item::Double(double_op(op, x, y))),
            _ => unreachable!("promote_pair guarantees matching ranks"),
        }
    }
}

fn int_op(op: ArithOp, x: i64, y: i64) -> JResult<i64> {
    match op {
        ArithOp::Add => Ok(x + y),
        ArithOp::Sub => Ok(x - y),
        ArithOp::Mul => Ok(x * y),
        ArithOp::Div | ArithOp::IDiv => {
            if y == 0 {
                Err(JsoniqError::dynamic("integer division by zero"))
            } else {
                Ok(x / y)
            }
        }
        ArithOp::Mod => {
            if y == 0 {
                Err(JsoniqError::dynamic("integer modulo by zero"))
            } else {
                Ok(x % y)
            }
        }
    }
}

fn decimal_op(op: ArithOp, x: Decimal, y: Decimal) -> JResult<Decimal> {
    match op {
        ArithOp::Add => Ok(x + y),
        ArithOp::Sub => Ok(x - y),
        ArithOp::Mul => Ok(x * y),
        ArithOp::Div | ArithOp::IDiv => {
            if y.is_zero() {
                Err(JsoniqError::dynamic("decimal division by zero"))
            } else {
                Ok(x / y)
            }
        }
        ArithOp::Mod => {
            if y.is_zero() {
                Err(JsoniqError::dynamic("decimal modulo by zero"))
            } else {
                Ok(x % y)
            }
        }
    }
}

/// Double arithmetic follows IEEE 754: division by zero yields infinity or
/// NaN rather than an error (§4.5).
fn double_op(op: ArithOp, x: f64, y: f64) -> f64 {
    match op {
        ArithOp::Add => x + y,
        ArithOp::Sub => x - y,
        ArithOp::Mul => x * y,
        ArithOp::Div | ArithOp::IDiv => x / y,
        ArithOp::Mod => x % y,
    }
}

impl RuntimeIterator for ArithmeticIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let a = Self::singleton_numeric(self.lhs.as_mut(), Arc::clone(&context))?;
        let b = Self::singleton_numeric(self.rhs.as_mut(), context)?;
        self.result = Some(Self::apply(self.op, &a, &b)?);
        self.emitted = false;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.result.is_some() && !self.emitted)
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(JsoniqError::iterator_flow("ArithmeticIterator::next", "called when has_next() is false"));
        }
        self.emitted = true;
        Ok(self.result.clone().unwrap())
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
    fn integer_division_by_zero_errors() {
        let lhs = Box::new(LiteralIterator::new(vec![Item::Integer(1)]));
        let rhs = Box::new(LiteralIterator::new(vec![Item::Integer(0)]));
        let mut it = ArithmeticIterator::new(ArithOp::Div, lhs, rhs);
        assert!(it.materialize(ctx()).is_err());
    }

    #[test]
    fn double_division_by_zero_is_infinity() {
        let lhs = Box::new(LiteralIterator::new(vec![Item::Double(1.0)]));
        let rhs = Box::new(LiteralIterator::new(vec![Item::Double(0.0)]));
        let mut it = ArithmeticIterator::new(ArithOp::Div, lhs, rhs);
        let items = it.materialize(ctx()).unwrap();
        assert_eq!(items, vec![Item::Double(f64::INFINITY)]);
    }

    #[test]
    fn mixed_integer_and_double_promotes() {
        let lhs = Box::new(LiteralIterator::new(vec![Item::Integer(2)]));
        let rhs = Box::new(LiteralIterator::new(vec![Item::Double(0.5)]));
        let mut it = ArithmeticIterator::new(ArithOp::Mul, lhs, rhs);
        let items = it.materialize(ctx()).unwrap();
        assert_eq!(items, vec![Item::Double(1.0)]);
    }
}

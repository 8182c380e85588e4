//! `some`/`every` quantified expressions (§4.5).
//!
//! Iterates the cartesian product of the binding sequences, evaluating the
//! predicate once per combination, and short-circuits as soon as the
//! overall answer is determined.

use std::sync::Arc;

use crate::ast::Quantifier;
use crate::context::{Binding, DynamicContext};
use crate::error::JResult;
use crate::item::{sequence_effective_boolean_value, Item};

use super::RuntimeIterator;

pub struct QuantifiedIterator {
    quantifier: Quantifier,
    bindings: Vec<(String, Box<dyn RuntimeIterator>)>,
    predicate_factory: Box<dyn Fn() -> Box<dyn RuntimeIterator> + Send>,
    result: Option<bool>,
    emitted: bool,
}

impl QuantifiedIterator {
    pub fn new(
        quantifier: Quantifier,
        bindings: Vec<(String, Box<dyn RuntimeIterator>)>,
        predicate_factory: Box<dyn Fn() -> Box<dyn RuntimeIterator> + Send>,
    ) -> Self {
        QuantifiedIterator { quantifier, bindings, predicate_factory, result: None, emitted: false }
    }

    fn cartesian_product(
        &mut self,
        context: &Arc<DynamicContext>,
    ) -> JResult<Vec<std::collections::HashMap<String, Binding>>> {
        let mut sequences = Vec::with_capacity(self.bindings.len());
        for (name, iter) in &mut self.bindings {
            let items = iter.materialize(Arc::clone(context))?;
            sequences.push((name.clone(), items));
        }

        let mut combos: Vec<std::collections::HashMap<String, Binding>> = vec![std::collections::HashMap::new()];
        for (name, items) in sequences {
            let mut next_combos = Vec::with_capacity(combos.len() * items.len().max(1));
            for combo in &combos {
                for item in &items {
                    let mut extended = combo.clone();
                    extended.insert(name.clone(), Binding::Materialized(vec![item.clone()]));
                    next_combos.push(extended);
                }
            }
            combos = next_combos;
            if combos.is_empty() {
                break;
            }
        }
        Ok(combos)
    }
}

impl RuntimeIterator for QuantifiedIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let combos = self.cartesian_product(&context)?;

        let short_circuit_value = match self.quantifier {
            Quantifier::Some => true,
            Quantifier::Every => false,
        };

        let mut answer = match self.quantifier {
            Quantifier::Some => false,
            Quantifier::Every => true,
        };

        for combo in combos {
            let tuple_ctx = context.child_with_bindings(combo);
            let mut predicate = (self.predicate_factory)();
            let items = predicate.materialize(tuple_ctx)?;
            let truth = sequence_effective_boolean_value(&items)?;
            let matches_short_circuit = truth == short_circuit_value;
            if matches_short_circuit {
                answer = short_circuit_value;
                break;
            }
        }

        self.result = Some(answer);
        self.emitted = false;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.result.is_some() && !self.emitted)
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(crate::error::JsoniqError::iterator_flow(
                "QuantifiedIterator::next",
                "called when has_next() is false",
            ));
        }
        self.emitted = true;
        Ok(Item::Boolean(self.result.unwrap()))
    }

    fn close(&mut self) -> JResult<()> {
        for (_, iter) in &mut self.bindings {
            iter.close()?;
        }
        self.result = None;
        self.emitted = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ValueCompareOp;
    use crate::config::EngineConfig;
    use crate::iterator::comparison::ValueCompareIterator;
    use crate::iterator::literal::{LiteralIterator, VariableReferenceIterator};

    fn ctx() -> Arc<DynamicContext> {
        DynamicContext::root(Arc::new(EngineConfig::default()))
    }

    #[test]
    fn some_short_circuits_true() {
        let bindings = vec![(
            "x".to_string(),
            Box::new(LiteralIterator::new(vec![Item::Integer(1), Item::Integer(2), Item::Integer(3)])) as Box<dyn RuntimeIterator>,
        )];
        let predicate_factory = Box::new(|| {
            Box::new(ValueCompareIterator::new(
                ValueCompareOp::Eq,
                Box::new(VariableReferenceIterator::new("x")),
                Box::new(LiteralIterator::new(vec![Item::Integer(2)])),
            )) as Box<dyn RuntimeIterator>
        });
        let mut it = QuantifiedIterator::new(Quantifier::Some, bindings, predicate_factory);
        assert_eq!(it.materialize(ctx()).unwrap(), vec![Item::Boolean(true)]);
    }

    #[test]
    fn every_requires_all_combinations_true() {
        let bindings = vec![(
            "x".to_string(),
            Box::new(LiteralIterator::new(vec![Item::Integer(2), Item::Integer(2)])) as Box<dyn RuntimeIterator>,
        )];
        let predicate_factory = Box::new(|| {
            Box::new(ValueCompareIterator::new(
                ValueCompareOp::Eq,
                Box::new(VariableReferenceIterator::new("x")),
                Box::new(LiteralIterator::new(vec![Item::Integer(2)])),
            )) as Box<dyn RuntimeIterator>
        });
        let mut it = QuantifiedIterator::new(Quantifier::Every, bindings, predicate_factory);
        assert_eq!(it.materialize(ctx()).unwrap(), vec![Item::Boolean(true)]);
    }
}

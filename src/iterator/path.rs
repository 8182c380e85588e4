//! Postfix/path expressions: `.key`, `[[index]]`, `[predicate]`, `(args)`
//! applied in sequence (§4.5). Each step streams over the previous step's
//! output sequence.

use std::sync::Arc;

use crate::ast::PathStep;
use crate::context::DynamicContext;
use crate::error::{JResult, JsoniqError};
use crate::item::{sequence_effective_boolean_value, Item};

use super::function_call::call_function_item;
use super::RuntimeIterator;

pub struct PathIterator {
    source: Box<dyn RuntimeIterator>,
    steps: Vec<PathStepExec>,
    results: Vec<Item>,
    position: usize,
}

pub enum PathStepExec {
    ObjectLookup(String),
    ArrayLookup(Box<dyn RuntimeIterator>),
    Predicate(Box<dyn Fn() -> Box<dyn RuntimeIterator> + Send>),
    Call(Vec<Box<dyn RuntimeIterator>>),
}

impl PathIterator {
    pub fn new(source: Box<dyn RuntimeIterator>, steps: Vec<PathStepExec>) -> Self {
        PathIterator { source, steps, results: Vec::new(), position: 0 }
    }

    fn apply_object_lookup(item: &Item, key: &str) -> JResult<Vec<Item>> {
        match item {
            Item::Object(obj) => Ok(obj.get(key).cloned().into_iter().collect()),
            other => Err(JsoniqError::unexpected_type("object", other.type_tag().to_string())),
        }
    }

    fn apply_array_lookup(item: &Item, index_items: &[Item]) -> JResult<Vec<Item>> {
        let idx = match index_items {
            [Item::Integer(n)] => *n,
            _ => return Err(JsoniqError::dynamic("array lookup index must be a single integer")),
        };
        match item {
            Item::Array(items) => {
                if idx < 1 || (idx as usize) > items.len() {
                    Ok(vec![])
                } else {
                    Ok(vec![items[(idx - 1) as usize].clone()])
                }
            }
            other => Err(JsoniqError::unexpected_type("array", other.type_tag().to_string())),
        }
    }

    fn apply_predicate(item: &Item, position: usize, predicate_items: &[Item]) -> JResult<bool> {
        // A singleton integer predicate is positional; anything else uses
        // the item's effective boolean value (§4.5).
        match predicate_items {
            [Item::Integer(n)] => Ok(*n == position as i64),
            _ => sequence_effective_boolean_value(predicate_items).map(|truth| truth && item_is_relevant(item)),
        }
    }

    fn apply_call(item: &Item, args: Vec<Vec<Item>>, context: Arc<DynamicContext>) -> JResult<Vec<Item>> {
        match item {
            Item::Function(func) => call_function_item(func, args, context),
            other => Err(JsoniqError::unexpected_type("function", other.type_tag().to_string())),
        }
    }
}

fn item_is_relevant(_item: &Item) -> bool {
    true
}

impl RuntimeIterator for PathIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let mut current = self.source.materialize(Arc::clone(&context))?;

        for step in &mut self.steps {
            let mut next = Vec::new();
            match step {
                PathStepExec::ObjectLookup(key) => {
                    for item in &current {
                        next.extend(Self::apply_object_lookup(item, key)?);
                    }
                }
                PathStepExec::ArrayLookup(index_expr) => {
                    let index_items = index_expr.materialize(Arc::clone(&context))?;
                    for item in &current {
                        next.extend(Self::apply_array_lookup(item, &index_items)?);
                    }
                }
                PathStepExec::Predicate(factory) => {
                    for (i, item) in current.iter().enumerate() {
                        let mut predicate = factory();
                        let predicate_items = predicate.materialize(Arc::clone(&context))?;
                        if Self::apply_predicate(item, i + 1, &predicate_items)? {
                            next.push(item.clone());
                        }
                    }
                }
                PathStepExec::Call(arg_exprs) => {
                    let mut args = Vec::with_capacity(arg_exprs.len());
                    for arg in arg_exprs {
                        args.push(arg.materialize(Arc::clone(&context))?);
                    }
                    for item in &current {
                        next.extend(Self::apply_call(item, args.clone(), Arc::clone(&context))?);
                    }
                }
            }
            current = next;
        }

        self.results = current;
        self.position = 0;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.position < self.results.len())
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(JsoniqError::iterator_flow("PathIterator::next", "called when has_next() is false"));
        }
        let item = self.results[self.position].clone();
        self.position += 1;
        Ok(item)
    }

    fn close(&mut self) -> JResult<()> {
        self.results.clear();
        self.position = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::item::ObjectItem;
    use crate::iterator::literal::LiteralIterator;

    fn ctx() -> Arc<DynamicContext> {
        DynamicContext::root(Arc::new(EngineConfig::default()))
    }

    #[test]
    fn object_lookup_step() {
        let obj = ObjectItem::try_from_pairs(vec![("a".to_string(), Item::Integer(1))]).unwrap();
        let source = Box::new(LiteralIterator::new(vec![Item::Object(obj)]));
        let mut it = PathIterator::new(source, vec![PathStepExec::ObjectLookup("a".to_string())]);
        assert_eq!(it.materialize(ctx()).unwrap(), vec![Item::Integer(1)]);
    }

    #[test]
    fn array_lookup_is_one_based() {
        let source = Box::new(LiteralIterator::new(vec![Item::Array(vec![Item::Integer(10), Item::Integer(20)])]));
        let index = Box::new(LiteralIterator::new(vec![Item::Integer(2)]));
        let mut it = PathIterator::new(source, vec![PathStepExec::ArrayLookup(index)]);
        assert_eq!(it.materialize(ctx()).unwrap(), vec![Item::Integer(20)]);
    }

    #[test]
    fn positional_predicate_filters_by_index() {
        let source = Box::new(LiteralIterator::new(vec![Item::Integer(10), Item::Integer(20), Item::Integer(30)]));
        let predicate = PathStepExec::Predicate(Box::new(|| Box::new(LiteralIterator::new(vec![Item::Integer(2)]))));
        let mut it = PathIterator::new(source, vec![predicate]);
        assert_eq!(it.materialize(ctx()).unwrap(), vec![Item::Integer(20)]);
    }
}

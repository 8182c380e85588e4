//! `for $variable [at $position_variable] in expr` (§4.3).
//!
//! Streams one output tuple per item of `expr`'s sequence, evaluated fresh
//! against each incoming tuple's bindings. An incoming tuple whose `expr`
//! evaluates to the empty sequence contributes no output tuples at all —
//! unlike `let`, which always emits exactly one.

use std::sync::Arc;

use crate::ast::{DependencyMap, ExprNode};
use crate::context::DynamicContext;
use crate::error::{JResult, JsoniqError};
use crate::item::Item;
use crate::iterator::RuntimeIterator;
use crate::tuple::Tuple;

use super::{tuple_context, TupleIterator};

pub struct ForIterator {
    source: Box<dyn TupleIterator>,
    variable: String,
    position_variable: Option<String>,
    in_expr: Box<dyn RuntimeIterator>,
    in_expr_node: Option<Arc<ExprNode>>,
    context: Option<Arc<DynamicContext>>,
    current_tuple: Option<Tuple>,
    current_items: Vec<Item>,
    item_position: usize,
}

impl ForIterator {
    pub fn new(
        source: Box<dyn TupleIterator>,
        variable: String,
        position_variable: Option<String>,
        in_expr: Box<dyn RuntimeIterator>,
    ) -> Self {
        ForIterator {
            source,
            variable,
            position_variable,
            in_expr,
            in_expr_node: None,
            context: None,
            current_tuple: None,
            current_items: Vec::new(),
            item_position: 0,
        }
    }

    /// Attaches the source AST node `in_expr` was built from, so
    /// `variable_dependencies` can report this clause's own free variables
    /// rather than an empty map (§4.2). Optional: unit tests that build an
    /// `in_expr` iterator directly, with no AST node at hand, simply skip it.
    pub fn with_source_node(mut self, node: Arc<ExprNode>) -> Self {
        self.in_expr_node = Some(node);
        self
    }

    /// Pulls source tuples until one yields a non-empty `expr` sequence,
    /// or the source is exhausted.
    fn advance_to_next_nonempty(&mut self) -> JResult<bool> {
        let context = self.context.clone().expect("advance_to_next_nonempty called before open");
        while self.source.has_next()? {
            let tuple = self.source.next()?;
            let child_context = tuple_context(&context, &tuple);
            let items = self.in_expr.materialize(child_context)?;
            if !items.is_empty() {
                self.current_tuple = Some(tuple);
                self.current_items = items;
                self.item_position = 0;
                return Ok(true);
            }
        }
        self.current_tuple = None;
        self.current_items.clear();
        self.item_position = 0;
        Ok(false)
    }
}

impl TupleIterator for ForIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        self.source.open(Arc::clone(&context))?;
        self.context = Some(context);
        self.current_tuple = None;
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

    fn next(&mut self) -> JResult<Tuple> {
        if !self.has_next()? {
            return Err(JsoniqError::iterator_flow("ForIterator::next", "called when has_next() is false"));
        }
        let item = self.current_items[self.item_position].clone();
        let position = self.item_position + 1;
        self.item_position += 1;

        let base = self.current_tuple.as_ref().expect("current tuple set by has_next");
        let mut out = base.extend(self.variable.clone(), vec![item]);
        if let Some(pos_var) = &self.position_variable {
            out = out.extend(pos_var.clone(), vec![Item::Integer(position as i64)]);
        }
        Ok(out)
    }

    fn close(&mut self) -> JResult<()> {
        self.current_tuple = None;
        self.current_items.clear();
        self.item_position = 0;
        self.in_expr.close()?;
        self.source.close()
    }

    fn bound_variables(&self) -> Vec<String> {
        let mut vars = vec![self.variable.clone()];
        if let Some(pos_var) = &self.position_variable {
            vars.push(pos_var.clone());
        }
        vars
    }

    fn variable_dependencies(&self) -> DependencyMap {
        match &self.in_expr_node {
            Some(node) => crate::ast::free_variable_dependencies(node),
            None => DependencyMap::new(),
        }
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
    fn emits_one_tuple_per_item() {
        let seed = Box::new(super::super::SeedTupleIterator::new());
        let source = Box::new(LiteralIterator::new(vec![Item::Integer(1), Item::Integer(2), Item::Integer(3)]));
        let mut it = ForIterator::new(seed, "x".to_string(), None, source);
        let tuples = it.materialize(ctx()).unwrap();
        let values: Vec<Item> = tuples.iter().map(|t| t.get("x").unwrap()[0].clone()).collect();
        assert_eq!(values, vec![Item::Integer(1), Item::Integer(2), Item::Integer(3)]);
    }

    #[test]
    fn empty_sequence_produces_no_tuples() {
        let seed = Box::new(super::super::SeedTupleIterator::new());
        let source = Box::new(LiteralIterator::new(vec![]));
        let mut it = ForIterator::new(seed, "x".to_string(), None, source);
        let tuples = it.materialize(ctx()).unwrap();
        assert!(tuples.is_empty());
    }

    #[test]
    fn position_variable_is_one_based() {
        let seed = Box::new(super::super::SeedTupleIterator::new());
        let source = Box::new(LiteralIterator::new(vec![Item::Integer(10), Item::Integer(20)]));
        let mut it = ForIterator::new(seed, "x".to_string(), Some("p".to_string()), source);
        let tuples = it.materialize(ctx()).unwrap();
        let positions: Vec<Item> = tuples.iter().map(|t| t.get("p").unwrap()[0].clone()).collect();
        assert_eq!(positions, vec![Item::Integer(1), Item::Integer(2)]);
    }
}

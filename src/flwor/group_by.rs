//! `group by $g := expr, ...` (§4.3): a non-streaming clause. It fully
//! materializes its source, partitions tuples by grouping-key equality,
//! and emits one output tuple per group: the grouping variables bound to
//! their (singleton-or-empty) key value, and every other variable bound to
//! the concatenation of that variable's values across the group's members,
//! in original order.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::{Binding, DependencyMap};
use crate::context::DynamicContext;
use crate::error::JResult;
use crate::item::ordering::{keys_equal, OrderKey};
use crate::item::Item;
use crate::tuple::Tuple;

use super::{tuple_context, TupleIterator};

pub struct GroupByIterator {
    source: Box<dyn TupleIterator>,
    keys: Vec<Binding>,
    groups: Vec<Tuple>,
    position: usize,
    context: Option<Arc<DynamicContext>>,
}

impl GroupByIterator {
    pub fn new(source: Box<dyn TupleIterator>, keys: Vec<Binding>) -> Self {
        GroupByIterator { source, keys, groups: Vec::new(), position: 0, context: None }
    }

    fn key_variable_names(&self) -> Vec<String> {
        self.keys.iter().map(|b| b.variable.clone()).collect()
    }

    fn compute_groups(&mut self, context: &Arc<DynamicContext>) -> JResult<()> {
        let tuples = self.source.materialize(Arc::clone(context))?;

        let mut group_keys: Vec<Vec<OrderKey>> = Vec::new();
        let mut group_members: Vec<Vec<Tuple>> = Vec::new();

        for tuple in tuples {
            let mut key_values = Vec::with_capacity(self.keys.len());
            for binding in &self.keys {
                let child_context = tuple_context(context, &tuple);
                let mut expr_iter = crate::iterator::build::build(&binding.expr)?;
                let items = expr_iter.materialize(child_context)?;
                key_values.push(OrderKey::from_sequence(&items)?);
            }

            let mut existing = None;
            for (idx, candidate) in group_keys.iter().enumerate() {
                if candidate.len() != key_values.len() {
                    continue;
                }
                let mut all_equal = true;
                for (a, b) in candidate.iter().zip(key_values.iter()) {
                    if !keys_equal(a, b)? {
                        all_equal = false;
                        break;
                    }
                }
                if all_equal {
                    existing = Some(idx);
                    break;
                }
            }

            match existing {
                Some(idx) => group_members[idx].push(tuple),
                None => {
                    group_keys.push(key_values);
                    group_members.push(vec![tuple]);
                }
            }
        }

        let skip = self.key_variable_names();
        let mut groups = Vec::with_capacity(group_keys.len());
        for (key_values, members) in group_keys.into_iter().zip(group_members.into_iter()) {
            let refs: Vec<&Tuple> = members.iter().collect();
            let mut out = Tuple::merge_concatenating(&refs, &skip);
            for (binding, key_value) in self.keys.iter().zip(key_values.into_iter()) {
                let values: Vec<Item> = match key_value {
                    OrderKey::Present(item) => vec![item],
                    OrderKey::Empty => vec![],
                };
                out = out.extend(binding.variable.clone(), values);
            }
            groups.push(out);
        }

        self.groups = groups;
        self.position = 0;
        Ok(())
    }
}

impl TupleIterator for GroupByIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        self.source.open(Arc::clone(&context))?;
        self.compute_groups(&context)?;
        self.context = Some(context);
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.position < self.groups.len())
    }

    fn next(&mut self) -> JResult<Tuple> {
        if !self.has_next()? {
            return Err(crate::error::JsoniqError::iterator_flow("GroupByIterator::next", "called when has_next() is false"));
        }
        let tuple = self.groups[self.position].clone();
        self.position += 1;
        Ok(tuple)
    }

    fn close(&mut self) -> JResult<()> {
        self.groups.clear();
        self.position = 0;
        self.source.close()
    }

    fn bound_variables(&self) -> Vec<String> {
        self.key_variable_names()
    }

    fn variable_dependencies(&self) -> DependencyMap {
        let mut deps = DependencyMap::new();
        for binding in &self.keys {
            for (name, kind) in crate::ast::free_variable_dependencies(&binding.expr) {
                let merged = match deps.get(&name) {
                    Some(existing) => existing.merge(kind),
                    None => kind,
                };
                deps.insert(name, merged);
            }
        }
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprNode;
    use crate::config::EngineConfig;
    use crate::error::SourceSpan;
    use crate::iterator::literal::LiteralIterator;

    fn ctx() -> Arc<DynamicContext> {
        DynamicContext::root(Arc::new(EngineConfig::default()))
    }

    #[test]
    fn groups_tuples_by_key_and_merges_others() {
        let seed = Box::new(super::super::SeedTupleIterator::new());
        let source = Box::new(LiteralIterator::new(vec![Item::Integer(1), Item::Integer(1), Item::Integer(2)]));
        let for_it = Box::new(crate::flwor::for_clause::ForIterator::new(seed, "x".to_string(), None, source));

        let key_expr = ExprNode::new(crate::ast::ExprKind::VariableReference("x".to_string()), SourceSpan::default());
        let keys = vec![Binding { variable: "g".to_string(), expr: key_expr }];
        let mut it = GroupByIterator::new(for_it, keys);
        let tuples = it.materialize(ctx()).unwrap();
        assert_eq!(tuples.len(), 2);

        let group_of_one = tuples.iter().find(|t| t.get("g") == Some(&vec![Item::Integer(1)])).unwrap();
        assert_eq!(group_of_one.get("x"), Some(&vec![Item::Integer(1), Item::Integer(1)]));

        let group_of_two = tuples.iter().find(|t| t.get("g") == Some(&vec![Item::Integer(2)])).unwrap();
        assert_eq!(group_of_two.get("x"), Some(&vec![Item::Integer(2)]));
    }
}

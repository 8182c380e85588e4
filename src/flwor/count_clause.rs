//! `count $variable` (§4.3): binds the 1-based ordinal position of each
//! tuple within the stream seen so far.

use std::sync::Arc;

use crate::ast::DependencyMap;
use crate::context::DynamicContext;
use crate::error::JResult;
use crate::item::Item;
use crate::tuple::Tuple;

use super::TupleIterator;

pub struct CountIterator {
    source: Box<dyn TupleIterator>,
    variable: String,
    position: u64,
}

impl CountIterator {
    pub fn new(source: Box<dyn TupleIterator>, variable: String) -> Self {
        CountIterator { source, variable, position: 0 }
    }
}

impl TupleIterator for CountIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        self.source.open(context)?;
        self.position = 0;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        self.source.has_next()
    }

    fn next(&mut self) -> JResult<Tuple> {
        let tuple = self.source.next()?;
        self.position += 1;
        Ok(tuple.extend(self.variable.clone(), vec![Item::Integer(self.position as i64)]))
    }

    fn close(&mut self) -> JResult<()> {
        self.position = 0;
        self.source.close()
    }

    fn bound_variables(&self) -> Vec<String> {
        vec![self.variable.clone()]
    }

    fn variable_dependencies(&self) -> DependencyMap {
        DependencyMap::new()
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
    fn counts_from_one() {
        let seed = Box::new(super::super::SeedTupleIterator::new());
        let source = Box::new(LiteralIterator::new(vec![Item::Integer(10), Item::Integer(20), Item::Integer(30)]));
        let for_it = Box::new(crate::flwor::for_clause::ForIterator::new(seed, "x".to_string(), None, source));
        let mut it = CountIterator::new(for_it, "c".to_string());
        let tuples = it.materialize(ctx()).unwrap();
        let counts: Vec<Item> = tuples.iter().map(|t| t.get("c").unwrap()[0].clone()).collect();
        assert_eq!(counts, vec![Item::Integer(1), Item::Integer(2), Item::Integer(3)]);
    }
}

//! `let $variable := expr` (§4.3): binds the whole sequence, unlike `for`.
//! Always emits exactly one output tuple per input tuple.

use std::sync::Arc;

use crate::ast::{DependencyMap, ExprNode};
use crate::context::DynamicContext;
use crate::error::JResult;
use crate::iterator::RuntimeIterator;
use crate::tuple::Tuple;

use super::{tuple_context, TupleIterator};

pub struct LetIterator {
    source: Box<dyn TupleIterator>,
    variable: String,
    expr: Box<dyn RuntimeIterator>,
    expr_node: Option<Arc<ExprNode>>,
    context: Option<Arc<DynamicContext>>,
}

impl LetIterator {
    pub fn new(source: Box<dyn TupleIterator>, variable: String, expr: Box<dyn RuntimeIterator>) -> Self {
        LetIterator { source, variable, expr, expr_node: None, context: None }
    }

    /// Attaches the source AST node `expr` was built from, so
    /// `variable_dependencies` can report this clause's own free variables
    /// (§4.2). See `ForIterator::with_source_node`.
    pub fn with_source_node(mut self, node: Arc<ExprNode>) -> Self {
        self.expr_node = Some(node);
        self
    }
}

impl TupleIterator for LetIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        self.source.open(Arc::clone(&context))?;
        self.context = Some(context);
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        self.source.has_next()
    }

    fn next(&mut self) -> JResult<Tuple> {
        let tuple = self.source.next()?;
        let context = self.context.clone().expect("next called before open");
        let child_context = tuple_context(&context, &tuple);
        let value = self.expr.materialize(child_context)?;
        Ok(tuple.extend(self.variable.clone(), value))
    }

    fn close(&mut self) -> JResult<()> {
        self.expr.close()?;
        self.source.close()
    }

    fn bound_variables(&self) -> Vec<String> {
        vec![self.variable.clone()]
    }

    fn variable_dependencies(&self) -> DependencyMap {
        match &self.expr_node {
            Some(node) => crate::ast::free_variable_dependencies(node),
            None => DependencyMap::new(),
        }
    }
}

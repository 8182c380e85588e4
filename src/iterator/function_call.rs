//! Named function calls: `f(args...)` where `f` resolves against the
//! registry (builtin or user-defined), and dynamic function invocation of
//! a function item produced by an inline-function expression (§4.5, §4.6).
//!
//! User-defined calls evaluate the callee's body against a *fresh* context
//! rooted at the function's closure (the lexical scope captured when the
//! inline-function expression was evaluated), not the call site's context —
//! this is what makes a returned function item behave like a real closure
//! rather than leaking the caller's bindings into the callee (§4.5).

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::{Binding, DynamicContext};
use crate::error::{JResult, JsoniqError};
use crate::item::{FunctionItem, Item};

use super::RuntimeIterator;

/// Evaluates a user-defined function's body with its parameters bound to
/// `args`, against a context chained off the function's own closure.
/// Never propagates `close()` into an iterator the call itself didn't
/// open: this builds a brand new iterator and context per call, so there
/// is nothing from an unopened parent to accidentally close.
pub fn call_function_item(func: &FunctionItem, args: Vec<Vec<Item>>, _caller_context: Arc<DynamicContext>) -> JResult<Vec<Item>> {
    if args.len() != func.params.len() {
        return Err(JsoniqError::invalid_argument(format!(
            "function '{}' expects {} argument(s), got {}",
            func.name.as_deref().unwrap_or("<anonymous>"),
            func.params.len(),
            args.len()
        )));
    }

    let mut bindings = HashMap::with_capacity(func.params.len());
    for (param, values) in func.params.iter().zip(args) {
        bindings.insert(param.clone(), Binding::Materialized(values));
    }

    let call_context = func.closure.child_with_bindings(bindings);
    let mut body = super::build::build(&func.body)?;
    body.materialize(call_context)
}

/// Resolves `name/arity` against the context's registry at `open` time —
/// user-defined functions win over built-ins with the same signature — and
/// streams the resolved call's output lazily.
pub struct FunctionCallIterator {
    name: String,
    arg_exprs: Vec<Box<dyn RuntimeIterator>>,
    results: Vec<Item>,
    position: usize,
}

impl FunctionCallIterator {
    pub fn new(name: impl Into<String>, arg_exprs: Vec<Box<dyn RuntimeIterator>>) -> Self {
        FunctionCallIterator { name: name.into(), arg_exprs, results: Vec::new(), position: 0 }
    }
}

impl RuntimeIterator for FunctionCallIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let mut args = Vec::with_capacity(self.arg_exprs.len());
        for arg in &mut self.arg_exprs {
            args.push(arg.materialize(Arc::clone(&context))?);
        }

        let arity = args.len();
        let registry = Arc::clone(context.registry());
        self.results = if registry.is_user_defined(&self.name, arity) {
            let func = registry.resolve_user_defined(&self.name, arity)?;
            call_function_item(&func, args, Arc::clone(&context))?
        } else {
            registry.call_builtin(&self.name, args, context)?
        };
        self.position = 0;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.position < self.results.len())
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(JsoniqError::iterator_flow("FunctionCallIterator::next", "called when has_next() is false"));
        }
        let item = self.results[self.position].clone();
        self.position += 1;
        Ok(item)
    }

    fn close(&mut self) -> JResult<()> {
        self.results.clear();
        self.position = 0;
        for arg in &mut self.arg_exprs {
            arg.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, ExprNode};
    use crate::config::EngineConfig;
    use crate::iterator::literal::LiteralIterator;

    fn ctx() -> Arc<DynamicContext> {
        DynamicContext::root(Arc::new(EngineConfig::default()))
    }

    #[test]
    fn calls_builtin_count() {
        let arg = Box::new(LiteralIterator::new(vec![Item::Integer(1), Item::Integer(2), Item::Integer(3)]));
        let mut it = FunctionCallIterator::new("count", vec![arg]);
        assert_eq!(it.materialize(ctx()).unwrap(), vec![Item::Integer(3)]);
    }

    #[test]
    fn calls_user_defined_function() {
        let registry = Arc::new(crate::registry::FunctionRegistry::with_builtins());
        let context = DynamicContext::root_with_registry(Arc::new(EngineConfig::default()), Arc::clone(&registry));
        let func = FunctionItem {
            id: uuid::Uuid::nil(),
            name: Some("double".to_string()),
            params: vec!["x".to_string()],
            body: ExprNode::new(ExprKind::VariableReference("x".to_string()), crate::error::SourceSpan::default()),
            closure: Arc::clone(&context),
        };
        registry.finalize_user_defined(vec![func]).unwrap();

        let arg = Box::new(LiteralIterator::new(vec![Item::Integer(21)]));
        let mut it = FunctionCallIterator::new("double", vec![arg]);
        assert_eq!(it.materialize(context).unwrap(), vec![Item::Integer(21)]);
    }

    /// Recursion works because the registry is finalized *after* the root
    /// context already holds the `Arc` it will be finalized on — `local:f`'s
    /// closure is that same root context, so when its body calls itself,
    /// the lookup resolves against the registry it's already a member of.
    #[test]
    fn recursive_user_defined_function() {
        use crate::ast::{ArithOp, ValueCompareOp};

        let registry = Arc::new(crate::registry::FunctionRegistry::with_builtins());
        let context = DynamicContext::root_with_registry(Arc::new(EngineConfig::default()), Arc::clone(&registry));

        let span = crate::error::SourceSpan::default();
        let n = || ExprNode::new(ExprKind::VariableReference("n".to_string()), span.clone());
        let int = |v: i64| ExprNode::new(ExprKind::IntegerLiteral(v.to_string()), span.clone());

        // if ($n = 0) then 0 else $n + local:f($n - 1)
        let cond = ExprNode::new(
            ExprKind::ValueCompare { op: ValueCompareOp::Eq, lhs: n(), rhs: int(0) },
            span.clone(),
        );
        let recurse = ExprNode::new(
            ExprKind::Arithmetic { op: ArithOp::Sub, lhs: n(), rhs: int(1) },
            span.clone(),
        );
        let call = ExprNode::new(
            ExprKind::FunctionCall { name: "local:f".to_string(), args: vec![recurse] },
            span.clone(),
        );
        let sum = ExprNode::new(ExprKind::Arithmetic { op: ArithOp::Add, lhs: n(), rhs: call }, span.clone());
        let body = ExprNode::new(ExprKind::If { cond, then_expr: int(0), else_expr: sum }, span);

        let func = FunctionItem {
            id: uuid::Uuid::nil(),
            name: Some("local:f".to_string()),
            params: vec!["n".to_string()],
            body,
            closure: Arc::clone(&context),
        };
        registry.finalize_user_defined(vec![func]).unwrap();

        let arg = Box::new(LiteralIterator::new(vec![Item::Integer(5)]));
        let mut it = FunctionCallIterator::new("local:f", vec![arg]);
        assert_eq!(it.materialize(context).unwrap(), vec![Item::Integer(15)]);
    }
}

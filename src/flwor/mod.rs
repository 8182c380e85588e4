//! The FLWOR pipeline (§4.2, §4.3, §4.4): a chain of `TupleIterator`s, one
//! per clause, finishing in a `Return` that hands control back to the
//! item-level `RuntimeIterator` world.
//!
//! `TupleIterator` mirrors `RuntimeIterator`'s open/has_next/next/close
//! lifecycle one level up: instead of items, it streams `Tuple`s — the
//! partial variable bindings accumulated so far by the clauses above it in
//! the pipeline.

pub mod count_clause;
pub mod for_clause;
pub mod group_by;
pub mod let_clause;
pub mod order_by;
pub mod return_clause;
pub mod where_clause;

use std::sync::Arc;

use crate::ast::{DependencyMap, FlworClauseNode};
use crate::context::DynamicContext;
use crate::distributed::dataframe::DataFrame;
use crate::error::JResult;
use crate::iterator::{ExecutionKind, RuntimeIterator};
use crate::tuple::Tuple;

/// The tuple-level streaming contract (§4.2). Lifecycle and error
/// semantics match `RuntimeIterator` exactly; only the payload type
/// differs.
pub trait TupleIterator: Send {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()>;

    fn has_next(&mut self) -> JResult<bool>;

    fn next(&mut self) -> JResult<Tuple>;

    fn close(&mut self) -> JResult<()>;

    fn reset(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let _ = context;
        Err(crate::error::JsoniqError::NotRewindable {
            reason: "this tuple iterator does not support rewinding".to_string(),
        })
    }

    /// Variables this clause itself introduces (not ones merely passed
    /// through from an earlier clause), per §4.2's `getVariablesBoundInCurrentFLWORExpression`.
    fn bound_variables(&self) -> Vec<String>;

    /// How downstream clauses use this clause's bound variables, per
    /// §4.2's `getVariableDependencies` / `DependencyKind` merge rule.
    fn variable_dependencies(&self) -> DependencyMap {
        DependencyMap::new()
    }

    /// What this clause needs from upstream given what its own consumer
    /// needs from it: the parent's projection minus whatever this clause
    /// itself binds, plus the free variables this clause's own expressions
    /// depend on, per §4.2 `getProjection`.
    fn projection(&self, parent_projection: &[String]) -> Vec<String> {
        let bound = self.bound_variables();
        let mut out: Vec<String> = parent_projection.iter().filter(|v| !bound.contains(v)).cloned().collect();
        for name in self.variable_dependencies().keys() {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        out
    }

    fn execution_kind(&self) -> ExecutionKind {
        ExecutionKind::LocalOnly
    }

    fn is_data_frame(&self) -> bool {
        self.execution_kind() == ExecutionKind::DataFrameCapable
    }

    fn get_data_frame(&mut self, context: Arc<DynamicContext>, projection: &[String]) -> JResult<Box<dyn DataFrame>> {
        let _ = (context, projection);
        Err(crate::error::JsoniqError::dynamic(
            "this tuple iterator is not DataFrame-capable; call is_data_frame() first",
        ))
    }

    /// Drains the whole stream into a `Vec`, closing it afterwards —
    /// the tuple-level analog of `RuntimeIterator::materialize`. Checks
    /// cancellation at each loop boundary (§5), same as the item-level
    /// materialize.
    fn materialize(&mut self, context: Arc<DynamicContext>) -> JResult<Vec<Tuple>> {
        self.open(Arc::clone(&context))?;
        let guard = TupleCloseGuard(self);
        let this = guard.0;
        let mut out = Vec::new();
        while this.has_next()? {
            if context.is_cancelled() {
                return Err(crate::error::JsoniqError::Cancelled);
            }
            out.push(this.next()?);
        }
        drop(guard);
        Ok(out)
    }
}

struct TupleCloseGuard<'a>(&'a mut dyn TupleIterator);

impl Drop for TupleCloseGuard<'_> {
    fn drop(&mut self) {
        let _ = self.0.close();
    }
}

/// Extends `parent` with every binding currently carried by `tuple`, so an
/// expression belonging to a later clause can see all the variables bound
/// so far (§3, §4.2).
pub fn tuple_context(parent: &Arc<DynamicContext>, tuple: &Tuple) -> Arc<DynamicContext> {
    let mut bindings = std::collections::HashMap::new();
    for name in tuple.variable_names() {
        if let Some(seq) = tuple.get(name) {
            bindings.insert(name.to_string(), crate::context::Binding::Materialized(seq.clone()));
        }
    }
    parent.child_with_bindings(bindings)
}

/// The start of every FLWOR pipeline: a single empty tuple, mirroring the
/// teacher's sentinel "start" tuple that seeds a `For`/`Let` chain before
/// any variable exists yet.
pub struct SeedTupleIterator {
    emitted: bool,
    opened: bool,
}

impl SeedTupleIterator {
    pub fn new() -> Self {
        SeedTupleIterator { emitted: false, opened: false }
    }
}

impl TupleIterator for SeedTupleIterator {
    fn open(&mut self, _context: Arc<DynamicContext>) -> JResult<()> {
        self.opened = true;
        self.emitted = false;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.opened && !self.emitted)
    }

    fn next(&mut self) -> JResult<Tuple> {
        if !self.has_next()? {
            return Err(crate::error::JsoniqError::iterator_flow("SeedTupleIterator::next", "called when has_next() is false"));
        }
        self.emitted = true;
        Ok(Tuple::new())
    }

    fn close(&mut self) -> JResult<()> {
        self.opened = false;
        self.emitted = false;
        Ok(())
    }

    fn bound_variables(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Prunes each tuple down to exactly the variables still needed downstream
/// (§3, §4.2, SPEC_FULL §11): `build_flwor_pipeline` inserts one of these
/// after a clause whenever an earlier binding won't be read by anything
/// that follows, so it doesn't ride along for the rest of the pipeline.
pub struct ProjectIterator {
    source: Box<dyn TupleIterator>,
    needed: Vec<String>,
}

impl ProjectIterator {
    pub fn new(source: Box<dyn TupleIterator>, needed: Vec<String>) -> Self {
        ProjectIterator { source, needed }
    }
}

impl TupleIterator for ProjectIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        self.source.open(context)
    }

    fn has_next(&mut self) -> JResult<bool> {
        self.source.has_next()
    }

    fn next(&mut self) -> JResult<Tuple> {
        let tuple = self.source.next()?;
        Ok(tuple.project(&self.needed))
    }

    fn close(&mut self) -> JResult<()> {
        self.source.close()
    }

    fn bound_variables(&self) -> Vec<String> {
        Vec::new()
    }

    fn execution_kind(&self) -> ExecutionKind {
        self.source.execution_kind()
    }

    fn is_data_frame(&self) -> bool {
        self.source.is_data_frame()
    }

    fn get_data_frame(&mut self, context: Arc<DynamicContext>, projection: &[String]) -> JResult<Box<dyn DataFrame>> {
        self.source.get_data_frame(context, projection)
    }
}

/// Builds the full `TupleIterator` chain for a FLWOR's clause list, then
/// wraps it in a `return_clause::ReturnIterator` turning the tuple stream
/// back into an item stream for the surrounding expression (§4.5 `Flwor`).
pub fn build_flwor_pipeline(clauses: &[FlworClauseNode]) -> JResult<Box<dyn RuntimeIterator>> {
    let return_expr = clauses
        .iter()
        .find_map(|c| match c { FlworClauseNode::Return { expr } => Some(Arc::clone(expr)), _ => None })
        .ok_or_else(|| crate::error::JsoniqError::dynamic("a FLWOR expression must end in a return clause"))?;

    // First pass, right to left over the AST (§4.2 `getProjection`): for
    // each clause, what does everything *after* it still need? Seeded by
    // the return expression's own free variables, then walked backward,
    // stripping each clause's own bound names and folding in its own
    // expressions' free variables as we cross it.
    let mut needed = crate::ast::free_variable_dependencies(&return_expr);
    let mut needed_after: Vec<Option<Vec<String>>> = vec![None; clauses.len()];

    for (idx, clause) in clauses.iter().enumerate().rev() {
        match clause {
            FlworClauseNode::Return { .. } => {}
            FlworClauseNode::For { variable, position_variable, expr } => {
                needed_after[idx] = Some(needed.keys().cloned().collect());
                needed.remove(variable);
                if let Some(p) = position_variable {
                    needed.remove(p);
                }
                merge_dependency_map(&mut needed, crate::ast::free_variable_dependencies(expr));
            }
            FlworClauseNode::Let { variable, expr } => {
                needed_after[idx] = Some(needed.keys().cloned().collect());
                needed.remove(variable);
                merge_dependency_map(&mut needed, crate::ast::free_variable_dependencies(expr));
            }
            FlworClauseNode::Where { predicate } => {
                needed_after[idx] = Some(needed.keys().cloned().collect());
                merge_dependency_map(&mut needed, crate::ast::free_variable_dependencies(predicate));
            }
            FlworClauseNode::Count { variable } => {
                needed_after[idx] = Some(needed.keys().cloned().collect());
                needed.remove(variable);
            }
            FlworClauseNode::GroupBy { keys } => {
                needed_after[idx] = Some(needed.keys().cloned().collect());
                for binding in keys {
                    needed.remove(&binding.variable);
                }
                for binding in keys {
                    merge_dependency_map(&mut needed, crate::ast::free_variable_dependencies(&binding.expr));
                }
            }
            FlworClauseNode::OrderBy { specs, .. } => {
                needed_after[idx] = Some(needed.keys().cloned().collect());
                for spec in specs {
                    merge_dependency_map(&mut needed, crate::ast::free_variable_dependencies(&spec.expr));
                }
            }
        }
    }

    let mut pipeline: Box<dyn TupleIterator> = Box::new(SeedTupleIterator::new());

    for (idx, clause) in clauses.iter().enumerate() {
        match clause {
            FlworClauseNode::For { variable, position_variable, expr } => {
                let source = crate::iterator::build::build(expr)?;
                pipeline = Box::new(
                    for_clause::ForIterator::new(pipeline, variable.clone(), position_variable.clone(), source)
                        .with_source_node(Arc::clone(expr)),
                );
            }
            FlworClauseNode::Let { variable, expr } => {
                let source = crate::iterator::build::build(expr)?;
                pipeline = Box::new(
                    let_clause::LetIterator::new(pipeline, variable.clone(), source).with_source_node(Arc::clone(expr)),
                );
            }
            FlworClauseNode::Where { predicate } => {
                pipeline = Box::new(where_clause::WhereIterator::new(pipeline, Arc::clone(predicate)));
            }
            FlworClauseNode::Count { variable } => {
                pipeline = Box::new(count_clause::CountIterator::new(pipeline, variable.clone()));
            }
            FlworClauseNode::GroupBy { keys } => {
                pipeline = Box::new(group_by::GroupByIterator::new(pipeline, keys.clone()));
            }
            FlworClauseNode::OrderBy { specs, stable } => {
                pipeline = Box::new(order_by::OrderByIterator::new(pipeline, specs.clone(), *stable));
            }
            FlworClauseNode::Return { .. } => {}
        }

        if let Some(names) = &needed_after[idx] {
            pipeline = Box::new(ProjectIterator::new(pipeline, names.clone()));
        }
    }

    Ok(Box::new(return_clause::ReturnIterator::new(pipeline, return_expr)))
}

fn merge_dependency_map(out: &mut DependencyMap, other: DependencyMap) {
    for (name, kind) in other {
        let merged = match out.get(&name) {
            Some(existing) => existing.merge(kind),
            None => kind,
        };
        out.insert(name, merged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, ExprNode, FlworClauseNode};
    use crate::config::EngineConfig;
    use crate::error::SourceSpan;
    use crate::item::Item;
    use crate::iterator::literal::LiteralIterator;

    fn ctx() -> Arc<DynamicContext> {
        DynamicContext::root(Arc::new(EngineConfig::default()))
    }

    #[test]
    fn materialize_surfaces_cancellation() {
        let mut config = EngineConfig::default();
        config.cancel.cancel();
        let cancelled_ctx = DynamicContext::root(Arc::new(config));
        let seed = Box::new(SeedTupleIterator::new());
        let source = Box::new(LiteralIterator::new(vec![Item::Integer(1), Item::Integer(2)]));
        let mut it = for_clause::ForIterator::new(seed, "x".to_string(), None, source);
        let result = it.materialize(cancelled_ctx);
        assert!(matches!(result, Err(crate::error::JsoniqError::Cancelled)));
    }

    #[test]
    fn project_iterator_drops_unneeded_bindings() {
        let seed = Box::new(SeedTupleIterator::new());
        let source = Box::new(LiteralIterator::new(vec![Item::Integer(1), Item::Integer(2)]));
        let for_it: Box<dyn TupleIterator> = Box::new(for_clause::ForIterator::new(seed, "x".to_string(), None, source));
        let let_expr = Box::new(LiteralIterator::new(vec![Item::Integer(99)]));
        let let_it: Box<dyn TupleIterator> = Box::new(let_clause::LetIterator::new(for_it, "y".to_string(), let_expr));

        let mut projected = ProjectIterator::new(let_it, vec!["y".to_string()]);
        let tuples = projected.materialize(ctx()).unwrap();
        assert_eq!(tuples.len(), 2);
        for tuple in &tuples {
            assert!(tuple.get("x").is_none());
            assert_eq!(tuple.get("y"), Some(&vec![Item::Integer(99)]));
        }
    }

    /// `for $x in (1,2) let $unused := $x for $y in (10,20) return $y`: the
    /// pipeline still produces the right items once the `Project` stage
    /// build_flwor_pipeline inserts after the first `for`/`let` drops `$x`
    /// and `$unused`, neither of which the return expression reads.
    #[test]
    fn build_flwor_pipeline_prunes_bindings_the_return_expression_never_reads() {
        let int = |n: i64| ExprNode::new(ExprKind::IntegerLiteral(n.to_string()), SourceSpan::default());
        let seq = |ns: Vec<i64>| ExprNode::new(ExprKind::SequenceLiteral(ns.into_iter().map(int).collect()), SourceSpan::default());
        let var = |name: &str| ExprNode::new(ExprKind::VariableReference(name.to_string()), SourceSpan::default());

        let clauses = vec![
            FlworClauseNode::For { variable: "x".to_string(), position_variable: None, expr: seq(vec![1, 2]) },
            FlworClauseNode::Let { variable: "unused".to_string(), expr: var("x") },
            FlworClauseNode::For { variable: "y".to_string(), position_variable: None, expr: seq(vec![10, 20]) },
            FlworClauseNode::Return { expr: var("y") },
        ];

        let mut pipeline = build_flwor_pipeline(&clauses).unwrap();
        let result = pipeline.materialize(ctx()).unwrap();
        assert_eq!(
            result,
            vec![
                Item::Integer(10),
                Item::Integer(20),
                Item::Integer(10),
                Item::Integer(20),
            ]
        );
    }
}

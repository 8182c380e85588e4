//! The expression tree handed to the runtime by the parser and static
//! analysis passes (§6). Both are out of scope for this crate; it only
//! reads these nodes, never mutates them.
//!
//! Each node carries its kind, child links, source metadata, a static
//! execution-mode annotation, and a variable-dependency map, exactly as
//! §6 describes. Iterator construction (§4.5) walks this tree once, at
//! `open` time, and builds the matching `RuntimeIterator`/`TupleIterator`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SourceSpan;

/// How a downstream consumer needs a bound variable (§3 "Variable
/// dependencies", §4.2 `getProjection`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// The full, ordered sequence of items is needed.
    Full,
    /// Only `count()` of the sequence is needed.
    Count,
    /// Only the sum of a numeric sequence is needed.
    Sum,
}

impl DependencyKind {
    /// Two uses of the same variable resolve to `Full` unless they agree,
    /// per §4.2 ("conflict-resolved to FULL when a variable is used in two
    /// incompatible ways").
    pub fn merge(self, other: DependencyKind) -> DependencyKind {
        if self == other {
            self
        } else {
            DependencyKind::Full
        }
    }
}

pub type DependencyMap = HashMap<String, DependencyKind>;

/// Static execution-mode annotation attached to a node by earlier passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    Local,
    Rdd,
    DataFrame,
    #[default]
    Unset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyOrder {
    Least,
    Greatest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralCompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Some,
    Every,
}

/// A single FLWOR `for`/`let`/`some`/`every` binding clause: `$var in expr`.
#[derive(Debug, Clone)]
pub struct Binding {
    pub variable: String,
    pub expr: Arc<ExprNode>,
}

#[derive(Debug, Clone)]
pub struct OrderSpec {
    pub expr: Arc<ExprNode>,
    pub direction: Direction,
    pub empty_order: EmptyOrder,
}

#[derive(Debug, Clone)]
pub enum PathStep {
    /// `.key`
    ObjectLookup(String),
    /// `[[index]]`
    ArrayLookup(Arc<ExprNode>),
    /// `[predicate]`, positional or boolean depending on the predicate's
    /// effective boolean value at runtime (§4.5).
    Predicate(Arc<ExprNode>),
    /// `(args)`, a dynamic function call through a function item.
    Call(Vec<Arc<ExprNode>>),
}

#[derive(Debug, Clone)]
pub enum FlworClauseNode {
    For { variable: String, position_variable: Option<String>, expr: Arc<ExprNode> },
    Let { variable: String, expr: Arc<ExprNode> },
    Where { predicate: Arc<ExprNode> },
    Count { variable: String },
    GroupBy { keys: Vec<Binding> },
    OrderBy { specs: Vec<OrderSpec>, stable: bool },
    Return { expr: Arc<ExprNode> },
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    NullLiteral,
    BooleanLiteral(bool),
    StringLiteral(String),
    IntegerLiteral(String),
    DecimalLiteral(String),
    DoubleLiteral(String),
    SequenceLiteral(Vec<Arc<ExprNode>>),
    ArrayConstructor(Vec<Arc<ExprNode>>),
    ObjectConstructor(Vec<(Arc<ExprNode>, Arc<ExprNode>)>),
    VariableReference(String),
    Range { lo: Arc<ExprNode>, hi: Arc<ExprNode> },
    Arithmetic { op: ArithOp, lhs: Arc<ExprNode>, rhs: Arc<ExprNode> },
    ValueCompare { op: ValueCompareOp, lhs: Arc<ExprNode>, rhs: Arc<ExprNode> },
    GeneralCompare { op: GeneralCompareOp, lhs: Arc<ExprNode>, rhs: Arc<ExprNode> },
    Logical { op: LogicalOp, lhs: Arc<ExprNode>, rhs: Arc<ExprNode> },
    If { cond: Arc<ExprNode>, then_expr: Arc<ExprNode>, else_expr: Arc<ExprNode> },
    Switch { operand: Arc<ExprNode>, cases: Vec<(Arc<ExprNode>, Arc<ExprNode>)>, default: Arc<ExprNode> },
    Typeswitch { operand: Arc<ExprNode>, cases: Vec<(String, Arc<ExprNode>)>, default: Arc<ExprNode> },
    Quantified { quantifier: Quantifier, bindings: Vec<Binding>, predicate: Arc<ExprNode> },
    Path { source: Arc<ExprNode>, steps: Vec<PathStep> },
    FunctionCall { name: String, args: Vec<Arc<ExprNode>> },
    FunctionItemConstructor { params: Vec<String>, body: Arc<ExprNode> },
    DynamicCall { callee: Arc<ExprNode>, args: Vec<Arc<ExprNode>> },
    Flwor { clauses: Vec<FlworClauseNode> },
}

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub span: SourceSpan,
    pub execution_mode: ExecutionMode,
    pub dependencies: DependencyMap,
}

impl ExprNode {
    pub fn new(kind: ExprKind, span: SourceSpan) -> Arc<ExprNode> {
        Arc::new(ExprNode {
            kind,
            span,
            execution_mode: ExecutionMode::Unset,
            dependencies: DependencyMap::new(),
        })
    }
}

fn merge_dependency(out: &mut DependencyMap, name: &str, kind: DependencyKind) {
    let merged = match out.get(name) {
        Some(existing) => existing.merge(kind),
        None => kind,
    };
    out.insert(name.to_string(), merged);
}

fn merge_dependencies(out: &mut DependencyMap, other: DependencyMap) {
    for (name, kind) in other {
        merge_dependency(out, &name, kind);
    }
}

/// Free variables read by `node`, each tagged with how it's used (§4.2
/// `getVariableDependencies`): a variable appearing only as the sole
/// argument of `count`/`sum` is `Count`/`Sum`; every other use is `Full`.
/// Two incompatible uses of the same variable merge to `Full` via
/// `DependencyKind::merge`. Variables bound *within* `node` itself
/// (a quantifier's binding, an inline function's parameters, a nested
/// FLWOR's own clauses) are local and never escape into the result.
pub fn free_variable_dependencies(node: &ExprNode) -> DependencyMap {
    let mut out = DependencyMap::new();
    walk_expr(node, &mut out);
    out
}

fn walk_expr(node: &ExprNode, out: &mut DependencyMap) {
    match &node.kind {
        ExprKind::NullLiteral
        | ExprKind::BooleanLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::IntegerLiteral(_)
        | ExprKind::DecimalLiteral(_)
        | ExprKind::DoubleLiteral(_) => {}
        ExprKind::VariableReference(name) => merge_dependency(out, name, DependencyKind::Full),
        ExprKind::SequenceLiteral(members) | ExprKind::ArrayConstructor(members) => {
            for member in members {
                walk_expr(member, out);
            }
        }
        ExprKind::ObjectConstructor(pairs) => {
            for (key, value) in pairs {
                walk_expr(key, out);
                walk_expr(value, out);
            }
        }
        ExprKind::Range { lo, hi } => {
            walk_expr(lo, out);
            walk_expr(hi, out);
        }
        ExprKind::Arithmetic { lhs, rhs, .. }
        | ExprKind::ValueCompare { lhs, rhs, .. }
        | ExprKind::GeneralCompare { lhs, rhs, .. }
        | ExprKind::Logical { lhs, rhs, .. } => {
            walk_expr(lhs, out);
            walk_expr(rhs, out);
        }
        ExprKind::If { cond, then_expr, else_expr } => {
            walk_expr(cond, out);
            walk_expr(then_expr, out);
            walk_expr(else_expr, out);
        }
        ExprKind::Switch { operand, cases, default } => {
            walk_expr(operand, out);
            for (case, result) in cases {
                walk_expr(case, out);
                walk_expr(result, out);
            }
            walk_expr(default, out);
        }
        ExprKind::Typeswitch { operand, cases, default } => {
            walk_expr(operand, out);
            for (_, result) in cases {
                walk_expr(result, out);
            }
            walk_expr(default, out);
        }
        ExprKind::Quantified { bindings, predicate, .. } => {
            for binding in bindings {
                walk_expr(&binding.expr, out);
            }
            let mut local = DependencyMap::new();
            walk_expr(predicate, &mut local);
            let bound_here: Vec<&str> = bindings.iter().map(|b| b.variable.as_str()).collect();
            local.retain(|name, _| !bound_here.contains(&name.as_str()));
            merge_dependencies(out, local);
        }
        ExprKind::Path { source, steps } => {
            walk_expr(source, out);
            for step in steps {
                match step {
                    PathStep::ObjectLookup(_) => {}
                    PathStep::ArrayLookup(index_expr) => walk_expr(index_expr, out),
                    PathStep::Predicate(predicate_expr) => walk_expr(predicate_expr, out),
                    PathStep::Call(args) => {
                        for arg in args {
                            walk_expr(arg, out);
                        }
                    }
                }
            }
        }
        ExprKind::FunctionCall { name, args } => {
            if let [single] = args.as_slice() {
                if let ExprKind::VariableReference(var) = &single.kind {
                    match name.as_str() {
                        "count" => {
                            merge_dependency(out, var, DependencyKind::Count);
                            return;
                        }
                        "sum" => {
                            merge_dependency(out, var, DependencyKind::Sum);
                            return;
                        }
                        _ => {}
                    }
                }
            }
            for arg in args {
                walk_expr(arg, out);
            }
        }
        ExprKind::FunctionItemConstructor { params, body } => {
            let mut local = DependencyMap::new();
            walk_expr(body, &mut local);
            local.retain(|name, _| !params.contains(name));
            merge_dependencies(out, local);
        }
        ExprKind::DynamicCall { callee, args } => {
            walk_expr(callee, out);
            for arg in args {
                walk_expr(arg, out);
            }
        }
        ExprKind::Flwor { clauses } => {
            let mut local = DependencyMap::new();
            let mut bound_here: Vec<String> = Vec::new();
            for clause in clauses {
                match clause {
                    FlworClauseNode::For { variable, position_variable, expr } => {
                        walk_expr(expr, &mut local);
                        bound_here.push(variable.clone());
                        if let Some(pos) = position_variable {
                            bound_here.push(pos.clone());
                        }
                    }
                    FlworClauseNode::Let { variable, expr } => {
                        walk_expr(expr, &mut local);
                        bound_here.push(variable.clone());
                    }
                    FlworClauseNode::Where { predicate } => walk_expr(predicate, &mut local),
                    FlworClauseNode::Count { variable } => bound_here.push(variable.clone()),
                    FlworClauseNode::GroupBy { keys } => {
                        for binding in keys {
                            walk_expr(&binding.expr, &mut local);
                            bound_here.push(binding.variable.clone());
                        }
                    }
                    FlworClauseNode::OrderBy { specs, .. } => {
                        for spec in specs {
                            walk_expr(&spec.expr, &mut local);
                        }
                    }
                    FlworClauseNode::Return { expr } => walk_expr(expr, &mut local),
                }
            }
            local.retain(|name, _| !bound_here.contains(name));
            merge_dependencies(out, local);
        }
    }
}

#[cfg(test)]
mod free_variable_tests {
    use super::*;
    use crate::error::SourceSpan;

    fn span() -> SourceSpan {
        SourceSpan::default()
    }

    fn var(name: &str) -> Arc<ExprNode> {
        ExprNode::new(ExprKind::VariableReference(name.to_string()), span())
    }

    #[test]
    fn plain_reference_is_full() {
        let deps = free_variable_dependencies(&var("x"));
        assert_eq!(deps.get("x"), Some(&DependencyKind::Full));
    }

    #[test]
    fn sole_count_argument_is_count_only() {
        let call = ExprNode::new(ExprKind::FunctionCall { name: "count".to_string(), args: vec![var("x")] }, span());
        let deps = free_variable_dependencies(&call);
        assert_eq!(deps.get("x"), Some(&DependencyKind::Count));
    }

    #[test]
    fn count_and_full_use_merge_to_full() {
        let count_call = ExprNode::new(ExprKind::FunctionCall { name: "count".to_string(), args: vec![var("x")] }, span());
        let arith = ExprNode::new(ExprKind::Arithmetic { op: ArithOp::Add, lhs: count_call, rhs: var("x") }, span());
        let deps = free_variable_dependencies(&arith);
        assert_eq!(deps.get("x"), Some(&DependencyKind::Full));
    }

    #[test]
    fn quantifier_binding_variable_does_not_escape() {
        let predicate = ExprNode::new(
            ExprKind::ValueCompare { op: ValueCompareOp::Eq, lhs: var("i"), rhs: var("x") },
            span(),
        );
        let quantified = ExprNode::new(
            ExprKind::Quantified {
                quantifier: Quantifier::Some,
                bindings: vec![Binding { variable: "i".to_string(), expr: var("xs") }],
                predicate,
            },
            span(),
        );
        let deps = free_variable_dependencies(&quantified);
        assert!(!deps.contains_key("i"));
        assert_eq!(deps.get("xs"), Some(&DependencyKind::Full));
        assert_eq!(deps.get("x"), Some(&DependencyKind::Full));
    }
}

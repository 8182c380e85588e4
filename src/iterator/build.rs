//! Builds the `RuntimeIterator` tree for an expression node (§4.5).
//!
//! This is the one place in the crate that walks `ast::ExprNode`; every
//! other module only ever sees the iterators it produces. Called once per
//! subtree at `open` time by whichever node owns that subtree (a FLWOR
//! clause, a function body, a path step), never ahead of time — mirroring
//! the "build lazily, just before evaluation" shape of the teacher's
//! expression-to-operator compilation.

use std::sync::Arc;

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::ast::{ExprKind, ExprNode, PathStep};
use crate::error::{JResult, JsoniqError};
use crate::item::Item;

use super::arithmetic::ArithmeticIterator;
use super::comparison::{GeneralCompareIterator, ValueCompareIterator};
use super::control::{IfIterator, SwitchIterator, TypeswitchIterator};
use super::function_call::FunctionCallIterator;
use super::literal::{LiteralIterator, VariableReferenceIterator};
use super::logical::LogicalIterator;
use super::path::{PathIterator, PathStepExec};
use super::quantified::QuantifiedIterator;
use super::range::RangeIterator;
use super::sequence_ctor::{ArrayConstructorIterator, ObjectConstructorIterator};
use super::RuntimeIterator;

pub fn build(node: &ExprNode) -> JResult<Box<dyn RuntimeIterator>> {
    match &node.kind {
        ExprKind::NullLiteral => Ok(Box::new(LiteralIterator::new(vec![Item::Null]))),
        ExprKind::BooleanLiteral(b) => Ok(Box::new(LiteralIterator::new(vec![Item::Boolean(*b)]))),
        ExprKind::StringLiteral(s) => Ok(Box::new(LiteralIterator::new(vec![Item::String(s.clone())]))),
        ExprKind::IntegerLiteral(text) => {
            // Overflowing a machine integer falls back to decimal (§9) rather
            // than erroring: `9223372036854775808` is still a valid literal.
            match i64::from_str(text) {
                Ok(n) => Ok(Box::new(LiteralIterator::new(vec![Item::Integer(n)]))),
                Err(_) => {
                    let d = Decimal::from_str(text)
                        .map_err(|_| JsoniqError::dynamic(format!("invalid integer literal '{text}'")))?;
                    Ok(Box::new(LiteralIterator::new(vec![Item::Decimal(d)])))
                }
            }
        }
        ExprKind::DecimalLiteral(text) => {
            let d = Decimal::from_str(text).map_err(|_| JsoniqError::dynamic(format!("invalid decimal literal '{text}'")))?;
            Ok(Box::new(LiteralIterator::new(vec![Item::Decimal(d)])))
        }
        ExprKind::DoubleLiteral(text) => {
            let d = f64::from_str(text).map_err(|_| JsoniqError::dynamic(format!("invalid double literal '{text}'")))?;
            Ok(Box::new(LiteralIterator::new(vec![Item::Double(d)])))
        }
        ExprKind::SequenceLiteral(members) => {
            let built = members.iter().map(|m| build(m)).collect::<JResult<Vec<_>>>()?;
            Ok(Box::new(ConcatIterator::new(built)))
        }
        ExprKind::ArrayConstructor(members) => {
            let built = members.iter().map(|m| build(m)).collect::<JResult<Vec<_>>>()?;
            Ok(Box::new(ArrayConstructorIterator::new(built)))
        }
        ExprKind::ObjectConstructor(pairs) => {
            let built = pairs
                .iter()
                .map(|(k, v)| Ok((build(k)?, build(v)?)))
                .collect::<JResult<Vec<_>>>()?;
            Ok(Box::new(ObjectConstructorIterator::new(built)))
        }
        ExprKind::VariableReference(name) => Ok(Box::new(VariableReferenceIterator::new(name.clone()))),
        ExprKind::Range { lo, hi } => Ok(Box::new(RangeIterator::new(build(lo)?, build(hi)?))),
        ExprKind::Arithmetic { op, lhs, rhs } => Ok(Box::new(ArithmeticIterator::new(*op, build(lhs)?, build(rhs)?))),
        ExprKind::ValueCompare { op, lhs, rhs } => Ok(Box::new(ValueCompareIterator::new(*op, build(lhs)?, build(rhs)?))),
        ExprKind::GeneralCompare { op, lhs, rhs } => Ok(Box::new(GeneralCompareIterator::new(*op, build(lhs)?, build(rhs)?))),
        ExprKind::Logical { op, lhs, rhs } => Ok(Box::new(LogicalIterator::new(*op, build(lhs)?, build(rhs)?))),
        ExprKind::If { cond, then_expr, else_expr } => {
            Ok(Box::new(IfIterator::new(build(cond)?, build(then_expr)?, build(else_expr)?)))
        }
        ExprKind::Switch { operand, cases, default } => {
            let built_cases = cases
                .iter()
                .map(|(case, result)| Ok((build(case)?, build(result)?)))
                .collect::<JResult<Vec<_>>>()?;
            Ok(Box::new(SwitchIterator::new(build(operand)?, built_cases, build(default)?)))
        }
        ExprKind::Typeswitch { operand, cases, default } => {
            let built_cases = cases
                .iter()
                .map(|(type_name, result)| Ok((type_name.clone(), build(result)?)))
                .collect::<JResult<Vec<_>>>()?;
            Ok(Box::new(TypeswitchIterator::new(build(operand)?, built_cases, build(default)?)))
        }
        ExprKind::Quantified { quantifier, bindings, predicate } => {
            let built_bindings = bindings
                .iter()
                .map(|b| Ok((b.variable.clone(), build(&b.expr)?)))
                .collect::<JResult<Vec<_>>>()?;
            let predicate = Arc::clone(predicate);
            let factory = Box::new(move || build(&predicate).expect("predicate subtree must build"));
            Ok(Box::new(QuantifiedIterator::new(*quantifier, built_bindings, factory)))
        }
        ExprKind::Path { source, steps } => {
            let built_source = build(source)?;
            let built_steps = steps
                .iter()
                .map(build_path_step)
                .collect::<JResult<Vec<_>>>()?;
            Ok(Box::new(PathIterator::new(built_source, built_steps)))
        }
        ExprKind::FunctionCall { name, args } => {
            let built_args = args.iter().map(|a| build(a)).collect::<JResult<Vec<_>>>()?;
            Ok(Box::new(FunctionCallIterator::new(name.clone(), built_args)))
        }
        ExprKind::FunctionItemConstructor { params, body } => {
            Ok(Box::new(FunctionItemConstructorIterator::new(params.clone(), Arc::clone(body))))
        }
        ExprKind::DynamicCall { callee, args } => {
            let built_callee = build(callee)?;
            let built_args = args.iter().map(|a| build(a)).collect::<JResult<Vec<_>>>()?;
            Ok(Box::new(super::path::PathIterator::new(
                built_callee,
                vec![PathStepExec::Call(built_args)],
            )))
        }
        ExprKind::Flwor { clauses } => crate::flwor::build_flwor_pipeline(clauses),
    }
}

fn build_path_step(step: &PathStep) -> JResult<PathStepExec> {
    match step {
        PathStep::ObjectLookup(key) => Ok(PathStepExec::ObjectLookup(key.clone())),
        PathStep::ArrayLookup(index_expr) => Ok(PathStepExec::ArrayLookup(build(index_expr)?)),
        PathStep::Predicate(predicate_expr) => {
            let predicate = Arc::clone(predicate_expr);
            Ok(PathStepExec::Predicate(Box::new(move || build(&predicate).expect("predicate subtree must build"))))
        }
        PathStep::Call(arg_exprs) => {
            let built = arg_exprs.iter().map(|a| build(a)).collect::<JResult<Vec<_>>>()?;
            Ok(PathStepExec::Call(built))
        }
    }
}

/// Concatenates several already-built subtrees' outputs in order, as a
/// `SequenceLiteral`'s commas do (§3 "sequences are flat; nesting a
/// sequence inside a sequence constructor flattens it").
struct ConcatIterator {
    members: Vec<Box<dyn RuntimeIterator>>,
    results: Vec<Item>,
    position: usize,
}

impl ConcatIterator {
    fn new(members: Vec<Box<dyn RuntimeIterator>>) -> Self {
        ConcatIterator { members, results: Vec::new(), position: 0 }
    }
}

impl RuntimeIterator for ConcatIterator {
    fn open(&mut self, context: Arc<crate::context::DynamicContext>) -> JResult<()> {
        let mut out = Vec::new();
        for member in &mut self.members {
            out.extend(member.materialize(Arc::clone(&context))?);
        }
        self.results = out;
        self.position = 0;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.position < self.results.len())
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(JsoniqError::iterator_flow("ConcatIterator::next", "called when has_next() is false"));
        }
        let item = self.results[self.position].clone();
        self.position += 1;
        Ok(item)
    }

    fn close(&mut self) -> JResult<()> {
        self.results.clear();
        self.position = 0;
        for member in &mut self.members {
            member.close()?;
        }
        Ok(())
    }
}

/// `function($params) { body }`: captures the enclosing context as the
/// closure at evaluation time, producing a fresh `FunctionItem` value each
/// time this node is evaluated (distinct identity per §3's function-item
/// equality rule).
struct FunctionItemConstructorIterator {
    params: Vec<String>,
    body: Arc<ExprNode>,
    result: Option<Item>,
    emitted: bool,
}

impl FunctionItemConstructorIterator {
    fn new(params: Vec<String>, body: Arc<ExprNode>) -> Self {
        FunctionItemConstructorIterator { params, body, result: None, emitted: false }
    }
}

impl RuntimeIterator for FunctionItemConstructorIterator {
    fn open(&mut self, context: Arc<crate::context::DynamicContext>) -> JResult<()> {
        let func = crate::item::FunctionItem {
            id: uuid::Uuid::new_v4(),
            name: None,
            params: self.params.clone(),
            body: Arc::clone(&self.body),
            closure: context,
        };
        self.result = Some(Item::Function(func));
        self.emitted = false;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.result.is_some() && !self.emitted)
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(JsoniqError::iterator_flow(
                "FunctionItemConstructorIterator::next",
                "called when has_next() is false",
            ));
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

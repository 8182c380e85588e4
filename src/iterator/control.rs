//! `if`/`switch`/`typeswitch` (§4.5).
//!
//! `typeswitch` matches on the dynamic type tag with no numeric subtyping:
//! JSONiq keeps integer/decimal/double distinct for `typeswitch` purposes —
//! subtyping only happens explicitly via `castable`/`cast` (§4.5).

use std::sync::Arc;

use crate::context::DynamicContext;
use crate::error::JResult;
use crate::item::{sequence_effective_boolean_value, items_equal, Item};

use super::RuntimeIterator;

/// Delegates to whichever branch is selected at `open` time; once picked,
/// streams the branch lazily rather than materializing it.
pub struct IfIterator {
    cond: Box<dyn RuntimeIterator>,
    then_branch: Box<dyn RuntimeIterator>,
    else_branch: Box<dyn RuntimeIterator>,
    chosen: Option<bool>,
}

impl IfIterator {
    pub fn new(cond: Box<dyn RuntimeIterator>, then_branch: Box<dyn RuntimeIterator>, else_branch: Box<dyn RuntimeIterator>) -> Self {
        IfIterator { cond, then_branch, else_branch, chosen: None }
    }

    fn active(&mut self) -> &mut dyn RuntimeIterator {
        if self.chosen == Some(true) {
            self.then_branch.as_mut()
        } else {
            self.else_branch.as_mut()
        }
    }
}

impl RuntimeIterator for IfIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let cond_items = self.cond.materialize(Arc::clone(&context))?;
        let taken = sequence_effective_boolean_value(&cond_items)?;
        self.chosen = Some(taken);
        self.active().open(context)
    }

    fn has_next(&mut self) -> JResult<bool> {
        self.active().has_next()
    }

    fn next(&mut self) -> JResult<Item> {
        self.active().next()
    }

    fn close(&mut self) -> JResult<()> {
        self.then_branch.close()?;
        self.else_branch.close()
    }
}

/// `switch $operand case $a return ... default return ...`. The operand is
/// compared against each case's value with value equality.
pub struct SwitchIterator {
    operand: Box<dyn RuntimeIterator>,
    cases: Vec<(Box<dyn RuntimeIterator>, Box<dyn RuntimeIterator>)>,
    default: Box<dyn RuntimeIterator>,
    chosen: Option<usize>,
}

impl SwitchIterator {
    pub fn new(
        operand: Box<dyn RuntimeIterator>,
        cases: Vec<(Box<dyn RuntimeIterator>, Box<dyn RuntimeIterator>)>,
        default: Box<dyn RuntimeIterator>,
    ) -> Self {
        SwitchIterator { operand, cases, default, chosen: None }
    }

    fn active(&mut self) -> &mut dyn RuntimeIterator {
        match self.chosen {
            Some(i) => self.cases[i].1.as_mut(),
            None => self.default.as_mut(),
        }
    }
}

impl RuntimeIterator for SwitchIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let operand_items = self.operand.materialize(Arc::clone(&context))?;
        let operand_value = match operand_items.as_slice() {
            [single] => single.clone(),
            _ => return Err(crate::error::JsoniqError::dynamic("switch operand must be a singleton")),
        };

        let mut chosen = None;
        for (i, (case_expr, _)) in self.cases.iter_mut().enumerate() {
            let case_items = case_expr.materialize(Arc::clone(&context))?;
            if let [case_value] = case_items.as_slice() {
                if items_equal(&operand_value, case_value).unwrap_or(false) {
                    chosen = Some(i);
                    break;
                }
            }
        }
        self.chosen = chosen;
        self.active().open(context)
    }

    fn has_next(&mut self) -> JResult<bool> {
        self.active().has_next()
    }

    fn next(&mut self) -> JResult<Item> {
        self.active().next()
    }

    fn close(&mut self) -> JResult<()> {
        for (_, result) in &mut self.cases {
            result.close()?;
        }
        self.default.close()
    }
}

/// `typeswitch $operand case TypeName return ... default return ...`. Case
/// labels are type tag names (§4.5's `GLOSSARY`/type predicates); no
/// numeric-lattice subtyping applies here.
pub struct TypeswitchIterator {
    operand: Box<dyn RuntimeIterator>,
    cases: Vec<(String, Box<dyn RuntimeIterator>)>,
    default: Box<dyn RuntimeIterator>,
    chosen: Option<usize>,
}

impl TypeswitchIterator {
    pub fn new(operand: Box<dyn RuntimeIterator>, cases: Vec<(String, Box<dyn RuntimeIterator>)>, default: Box<dyn RuntimeIterator>) -> Self {
        TypeswitchIterator { operand, cases, default, chosen: None }
    }

    fn active(&mut self) -> &mut dyn RuntimeIterator {
        match self.chosen {
            Some(i) => self.cases[i].1.as_mut(),
            None => self.default.as_mut(),
        }
    }
}

impl RuntimeIterator for TypeswitchIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let operand_items = self.operand.materialize(Arc::clone(&context))?;
        let tag = match operand_items.as_slice() {
            [single] => single.type_tag().to_string(),
            [] => "empty-sequence".to_string(),
            _ => "many-items".to_string(),
        };
        self.chosen = self.cases.iter().position(|(name, _)| name == &tag);
        self.active().open(context)
    }

    fn has_next(&mut self) -> JResult<bool> {
        self.active().has_next()
    }

    fn next(&mut self) -> JResult<Item> {
        self.active().next()
    }

    fn close(&mut self) -> JResult<()> {
        for (_, result) in &mut self.cases {
            result.close()?;
        }
        self.default.close()
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
    fn if_picks_then_branch_on_true() {
        let cond = Box::new(LiteralIterator::new(vec![Item::Boolean(true)]));
        let then_b = Box::new(LiteralIterator::new(vec![Item::Integer(1)]));
        let else_b = Box::new(LiteralIterator::new(vec![Item::Integer(2)]));
        let mut it = IfIterator::new(cond, then_b, else_b);
        assert_eq!(it.materialize(ctx()).unwrap(), vec![Item::Integer(1)]);
    }

    #[test]
    fn typeswitch_falls_back_to_default() {
        let operand = Box::new(LiteralIterator::new(vec![Item::String("x".to_string())]));
        let cases = vec![("integer".to_string(), Box::new(LiteralIterator::new(vec![Item::Integer(1)])) as Box<dyn RuntimeIterator>)];
        let default = Box::new(LiteralIterator::new(vec![Item::Integer(0)]));
        let mut it = TypeswitchIterator::new(operand, cases, default);
        assert_eq!(it.materialize(ctx()).unwrap(), vec![Item::Integer(0)]);
    }
}

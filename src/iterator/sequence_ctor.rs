//! Array and object constructors (§3, §4.5).
//!
//! Both produce a single structured item; neither streams internally since
//! the item itself must be fully built before it can be handed onward.

use std::sync::Arc;

use crate::context::DynamicContext;
use crate::error::{JResult, JsoniqError};
use crate::item::{Item, ObjectItem};

use super::RuntimeIterator;

/// `[ expr, expr, ... ]`: each member expression contributes its whole
/// sequence as consecutive array elements.
pub struct ArrayConstructorIterator {
    members: Vec<Box<dyn RuntimeIterator>>,
    result: Option<Item>,
    emitted: bool,
}

impl ArrayConstructorIterator {
    pub fn new(members: Vec<Box<dyn RuntimeIterator>>) -> Self {
        ArrayConstructorIterator { members, result: None, emitted: false }
    }
}

impl RuntimeIterator for ArrayConstructorIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let mut items = Vec::new();
        for member in &mut self.members {
            items.extend(member.materialize(Arc::clone(&context))?);
        }
        self.result = Some(Item::Array(items));
        self.emitted = false;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.result.is_some() && !self.emitted)
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(JsoniqError::iterator_flow("ArrayConstructorIterator::next", "called when has_next() is false"));
        }
        self.emitted = true;
        Ok(self.result.clone().unwrap())
    }

    fn close(&mut self) -> JResult<()> {
        self.result = None;
        self.emitted = false;
        for member in &mut self.members {
            member.close()?;
        }
        Ok(())
    }
}

/// `{ key-expr: value-expr, ... }`. Each key expression must evaluate to a
/// singleton string (§3 "object keys are always strings"); duplicate keys
/// are a dynamic error, not last-write-wins.
pub struct ObjectConstructorIterator {
    pairs: Vec<(Box<dyn RuntimeIterator>, Box<dyn RuntimeIterator>)>,
    result: Option<Item>,
    emitted: bool,
}

impl ObjectConstructorIterator {
    pub fn new(pairs: Vec<(Box<dyn RuntimeIterator>, Box<dyn RuntimeIterator>)>) -> Self {
        ObjectConstructorIterator { pairs, result: None, emitted: false }
    }
}

impl RuntimeIterator for ObjectConstructorIterator {
    fn open(&mut self, context: Arc<DynamicContext>) -> JResult<()> {
        let mut entries = Vec::with_capacity(self.pairs.len());
        for (key_expr, value_expr) in &mut self.pairs {
            let key_items = key_expr.materialize(Arc::clone(&context))?;
            let key = match key_items.as_slice() {
                [Item::String(s)] => s.clone(),
                [other] => return Err(JsoniqError::unexpected_type("string", other.type_tag().to_string())),
                _ => return Err(JsoniqError::dynamic("object key must evaluate to a single string")),
            };
            let value_items = value_expr.materialize(Arc::clone(&context))?;
            let value = match value_items.len() {
                1 => value_items.into_iter().next().unwrap(),
                _ => Item::Array(value_items),
            };
            entries.push((key, value));
        }

        let obj = ObjectItem::try_from_pairs(entries)?;
        self.result = Some(Item::Object(obj));
        self.emitted = false;
        Ok(())
    }

    fn has_next(&mut self) -> JResult<bool> {
        Ok(self.result.is_some() && !self.emitted)
    }

    fn next(&mut self) -> JResult<Item> {
        if !self.has_next()? {
            return Err(JsoniqError::iterator_flow("ObjectConstructorIterator::next", "called when has_next() is false"));
        }
        self.emitted = true;
        Ok(self.result.clone().unwrap())
    }

    fn close(&mut self) -> JResult<()> {
        self.result = None;
        self.emitted = false;
        for (key_expr, value_expr) in &mut self.pairs {
            key_expr.close()?;
            value_expr.close()?;
        }
        Ok(())
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
    fn array_constructor_flattens_member_sequences() {
        let members: Vec<Box<dyn RuntimeIterator>> = vec![
            Box::new(LiteralIterator::new(vec![Item::Integer(1), Item::Integer(2)])),
            Box::new(LiteralIterator::new(vec![Item::Integer(3)])),
        ];
        let mut it = ArrayConstructorIterator::new(members);
        assert_eq!(
            it.materialize(ctx()).unwrap(),
            vec![Item::Array(vec![Item::Integer(1), Item::Integer(2), Item::Integer(3)])]
        );
    }

    #[test]
    fn object_constructor_rejects_duplicate_keys() {
        let pairs: Vec<(Box<dyn RuntimeIterator>, Box<dyn RuntimeIterator>)> = vec![
            (
                Box::new(LiteralIterator::new(vec![Item::String("a".to_string())])),
                Box::new(LiteralIterator::new(vec![Item::Integer(1)])),
            ),
            (
                Box::new(LiteralIterator::new(vec![Item::String("a".to_string())])),
                Box::new(LiteralIterator::new(vec![Item::Integer(2)])),
            ),
        ];
        let mut it = ObjectConstructorIterator::new(pairs);
        assert!(it.materialize(ctx()).is_err());
    }
}

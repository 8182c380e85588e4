//! The minimal built-in function set (§11): `keys`, `count`, and a
//! corrected `lower-case`. Each is registered as a fixed-arity entry;
//! variadic-looking built-ins (none here yet) would register once per
//! supported arity rather than branching on `args.len()` internally.

use std::sync::Arc;

use crate::error::{JResult, JsoniqError};
use crate::item::Item;

use super::FunctionRegistry;

pub fn register_all(registry: &mut FunctionRegistry) {
    registry.register_builtin("keys", 1, Arc::new(keys));
    registry.register_builtin("count", 1, Arc::new(count));
    registry.register_builtin("lower-case", 1, Arc::new(lower_case));
}

fn keys(args: Vec<Vec<Item>>, _context: Arc<crate::context::DynamicContext>) -> JResult<Vec<Item>> {
    match args.as_slice() {
        [arg] => match arg.as_slice() {
            [Item::Object(obj)] => Ok(obj.keys().map(|k| Item::String(k.to_string())).collect()),
            [other] => Err(JsoniqError::unexpected_type("object", other.type_tag().to_string())),
            _ => Err(JsoniqError::invalid_argument("keys() expects a singleton object argument")),
        },
        _ => Err(JsoniqError::invalid_argument("keys() expects exactly one argument")),
    }
}

fn count(args: Vec<Vec<Item>>, _context: Arc<crate::context::DynamicContext>) -> JResult<Vec<Item>> {
    match args.as_slice() {
        [sequence] => Ok(vec![Item::Integer(sequence.len() as i64)]),
        _ => Err(JsoniqError::invalid_argument("count() expects exactly one argument")),
    }
}

/// `lower-case(())` returns `""`; otherwise lowercases the single string
/// argument. (Corrected per the documented contract — earlier drafts of
/// this function ignored the empty-sequence case and always uppercased.)
fn lower_case(args: Vec<Vec<Item>>, _context: Arc<crate::context::DynamicContext>) -> JResult<Vec<Item>> {
    match args.as_slice() {
        [arg] => match arg.as_slice() {
            [] => Ok(vec![Item::String(String::new())]),
            [Item::String(s)] => Ok(vec![Item::String(s.to_lowercase())]),
            [other] => Err(JsoniqError::unexpected_type("string", other.type_tag().to_string())),
            _ => Err(JsoniqError::invalid_argument("lower-case() expects a singleton string argument")),
        },
        _ => Err(JsoniqError::invalid_argument("lower-case() expects exactly one argument")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::context::DynamicContext;
    use crate::item::ObjectItem;

    fn ctx() -> Arc<DynamicContext> {
        DynamicContext::root(Arc::new(EngineConfig::default()))
    }

    #[test]
    fn lower_case_of_empty_sequence_is_empty_string() {
        assert_eq!(lower_case(vec![vec![]], ctx()).unwrap(), vec![Item::String(String::new())]);
    }

    #[test]
    fn lower_case_lowercases() {
        assert_eq!(
            lower_case(vec![vec![Item::String("ABC".to_string())]], ctx()).unwrap(),
            vec![Item::String("abc".to_string())]
        );
    }

    #[test]
    fn keys_returns_object_keys_in_order() {
        let obj = ObjectItem::try_from_pairs(vec![
            ("b".to_string(), Item::Integer(1)),
            ("a".to_string(), Item::Integer(2)),
        ])
        .unwrap();
        assert_eq!(
            keys(vec![vec![Item::Object(obj)]], ctx()).unwrap(),
            vec![Item::String("b".to_string()), Item::String("a".to_string())]
        );
    }
}

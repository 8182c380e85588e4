//! `FunctionRegistry`: resolves `(name, arity)` to a callable (§4.6).
//!
//! Grounded in the teacher's `Catalog` (a plain, immutable-after-construction
//! map consulted read-only during evaluation) rather than a concurrent map —
//! the registry is built once during prolog processing and then shared by
//! `Arc` down the whole context chain (§5 "Item instances are immutable and
//! freely shareable").

pub mod builtins;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::context::DynamicContext;
use crate::error::{JResult, JsoniqError};
use crate::item::{FunctionItem, Item};

/// Each inner `Vec<Item>` is one parameter's materialized argument sequence,
/// in declaration order — boundaries between arguments are never flattened
/// away, since a sequence-valued argument must stay distinguishable from
/// the next parameter's sequence.
pub type BuiltinFn = Arc<dyn Fn(Vec<Vec<Item>>, Arc<DynamicContext>) -> JResult<Vec<Item>> + Send + Sync>;

/// Maps `(name, arity)` to an iterator factory / callable. Variadic
/// built-ins are modeled as multiple fixed-arity entries, per §4.6.
///
/// Built-ins live in a plain map, fixed at construction. User-defined
/// functions live behind a `OnceLock`, set exactly once — during prolog
/// processing, before any query evaluation begins — rather than in the
/// same mutable map. This is what lets a function's closure be the very
/// `DynamicContext` that carries this registry: build the `Arc<FunctionRegistry>`
/// with only built-ins, hand it to the root context, build every declared
/// `FunctionItem` with that context as its closure (so a recursive or
/// mutually-recursive call resolves against the registry it's about to
/// belong to), then finalize the whole batch through the already-shared
/// `Arc`. A `&mut self` map filled before wrapping in `Arc` cannot express
/// this: the closure needs an `Arc<DynamicContext>` pointing at the
/// registry that doesn't exist yet.
#[derive(Default)]
pub struct FunctionRegistry {
    builtins: HashMap<(String, usize), BuiltinFn>,
    user_defined: OnceLock<HashMap<(String, usize), FunctionItem>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        FunctionRegistry::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = FunctionRegistry::new();
        builtins::register_all(&mut registry);
        registry
    }

    pub fn register_builtin(&mut self, name: impl Into<String>, arity: usize, f: BuiltinFn) {
        self.builtins.insert((name.into(), arity), f);
    }

    /// Registers the full batch of user-defined functions declared in a
    /// prolog, in one shot. Each `FunctionItem`'s closure may already
    /// reference `self` through an `Arc` built before this call — that's
    /// the whole point, since it's what makes self- and mutually-recursive
    /// named functions resolve. Errors if called twice, or if two functions
    /// in the batch collide on `(name, arity)` (§4.6) — shadowing a
    /// built-in is allowed.
    pub fn finalize_user_defined(&self, functions: Vec<FunctionItem>) -> JResult<()> {
        let mut map = HashMap::with_capacity(functions.len());
        for func in functions {
            let arity = func.params.len();
            let name = func
                .name
                .clone()
                .ok_or_else(|| JsoniqError::dynamic("user-defined function registration requires a name"))?;
            let key = (name.clone(), arity);
            if map.contains_key(&key) {
                return Err(JsoniqError::dynamic(format!(
                    "function '{name}' with arity {arity} is already defined"
                )));
            }
            map.insert(key, func);
        }
        self.user_defined
            .set(map)
            .map_err(|_| JsoniqError::dynamic("user-defined functions were already finalized for this registry"))
    }

    pub fn resolve_user_defined(&self, name: &str, arity: usize) -> JResult<FunctionItem> {
        self.user_defined
            .get()
            .and_then(|map| map.get(&(name.to_string(), arity)))
            .cloned()
            .ok_or_else(|| JsoniqError::function_not_found(name, arity))
    }

    pub fn call_builtin(&self, name: &str, args: Vec<Vec<Item>>, context: Arc<DynamicContext>) -> JResult<Vec<Item>> {
        match self.builtins.get(&(name.to_string(), args.len())) {
            Some(f) => f(args, context),
            None => Err(JsoniqError::function_not_found(name, args.len())),
        }
    }

    pub fn is_user_defined(&self, name: &str, arity: usize) -> bool {
        self.user_defined
            .get()
            .is_some_and(|map| map.contains_key(&(name.to_string(), arity)))
    }

    pub fn is_builtin(&self, name: &str, arity: usize) -> bool {
        self.builtins.contains_key(&(name.to_string(), arity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn unregistered_function_errors() {
        let registry = FunctionRegistry::with_builtins();
        let config = Arc::new(EngineConfig::default());
        let ctx = DynamicContext::root(config);
        let result = registry.call_builtin("not-a-real-function", vec![], ctx);
        assert!(result.is_err());
    }

    #[test]
    fn builtin_arity_mismatch_is_not_found() {
        let registry = FunctionRegistry::with_builtins();
        let config = Arc::new(EngineConfig::default());
        let ctx = DynamicContext::root(config);
        let result = registry.call_builtin("count", vec![vec![], vec![]], ctx);
        assert!(result.is_err());
    }
}

//! `DynamicContext`: the lexical scope chain iterators evaluate against.
//!
//! Grounded in the teacher's `Catalog`/session-state split: a context owns
//! its own bindings and borrows its parent rather than copying the whole
//! chain, mirroring §3's "stack of immutable frames; child frames borrow
//! parent; when a frame must escape (function closures), deep-copy the
//! relevant subset" redesign note (§9).

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::distributed::PartitionedCollectionHandle;
use crate::error::{JResult, JsoniqError};
use crate::item::Sequence;
use crate::registry::FunctionRegistry;

/// A variable binding may be a materialized sequence or, for large inputs
/// the static analysis decided to keep distributed, a reference to a
/// partitioned collection. Consumers must tolerate either (§3).
#[derive(Clone)]
pub enum Binding {
    Materialized(Sequence),
    Partitioned(PartitionedCollectionHandle),
}

impl Binding {
    /// Forces a materialized view, collecting a partitioned binding if
    /// necessary. Iterators that only need local evaluation call this;
    /// hybrid iterators avoid it when they can stay distributed.
    pub fn materialize(&self) -> JResult<Sequence> {
        match self {
            Binding::Materialized(seq) => Ok(seq.clone()),
            Binding::Partitioned(handle) => handle.collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FocusPosition {
    /// 1-based position within the context-sensitive sequence, if any.
    pub position: Option<u64>,
    pub size: Option<u64>,
}

/// A scope holding variable bindings, the current position/size for
/// context-sensitive operations, and a parent pointer (§3).
pub struct DynamicContext {
    bindings: HashMap<String, Binding>,
    focus: FocusPosition,
    parent: Option<Arc<DynamicContext>>,
    config: Arc<EngineConfig>,
    registry: Arc<FunctionRegistry>,
}

impl DynamicContext {
    pub fn root(config: Arc<EngineConfig>) -> Arc<DynamicContext> {
        DynamicContext::root_with_registry(config, Arc::new(FunctionRegistry::with_builtins()))
    }

    pub fn root_with_registry(config: Arc<EngineConfig>, registry: Arc<FunctionRegistry>) -> Arc<DynamicContext> {
        Arc::new(DynamicContext {
            bindings: HashMap::new(),
            focus: FocusPosition::default(),
            parent: None,
            config,
            registry,
        })
    }

    /// Pushes a child context binding `name` to `value`, as each
    /// tuple-producing FLWOR clause does per input tuple (§3).
    pub fn child_with_binding(self: &Arc<Self>, name: impl Into<String>, value: Binding) -> Arc<DynamicContext> {
        let mut bindings = HashMap::new();
        bindings.insert(name.into(), value);
        Arc::new(DynamicContext {
            bindings,
            focus: self.focus,
            parent: Some(Arc::clone(self)),
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
        })
    }

    pub fn child_with_bindings(self: &Arc<Self>, bindings: HashMap<String, Binding>) -> Arc<DynamicContext> {
        Arc::new(DynamicContext {
            bindings,
            focus: self.focus,
            parent: Some(Arc::clone(self)),
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
        })
    }

    pub fn child_with_focus(self: &Arc<Self>, focus: FocusPosition) -> Arc<DynamicContext> {
        Arc::new(DynamicContext {
            bindings: HashMap::new(),
            focus,
            parent: Some(Arc::clone(self)),
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
        })
    }

    /// Walks the lexical chain looking up `name`, nearest scope first.
    pub fn lookup(&self, name: &str) -> JResult<Binding> {
        if let Some(binding) = self.bindings.get(name) {
            return Ok(binding.clone());
        }
        match &self.parent {
            Some(parent) => parent.lookup(name),
            None => Err(JsoniqError::dynamic(format!("undefined variable: ${name}"))),
        }
    }

    pub fn focus(&self) -> FocusPosition {
        self.focus
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_cancelled(&self) -> bool {
        self.config.cancel.is_cancelled()
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_up_the_chain() {
        let config = Arc::new(EngineConfig::default());
        let root = DynamicContext::root(Arc::clone(&config));
        let child = root.child_with_binding("x", Binding::Materialized(vec![crate::item::Item::Integer(1)]));
        let grandchild = child.child_with_binding("y", Binding::Materialized(vec![crate::item::Item::Integer(2)]));

        let x = grandchild.lookup("x").unwrap().materialize().unwrap();
        assert_eq!(x, vec![crate::item::Item::Integer(1)]);
    }

    #[test]
    fn lookup_of_unbound_variable_errors() {
        let config = Arc::new(EngineConfig::default());
        let root = DynamicContext::root(config);
        assert!(root.lookup("nope").is_err());
    }
}

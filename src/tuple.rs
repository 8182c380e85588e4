//! `Tuple`: a FLWOR pipeline's unit of flow (§3).
//!
//! A mapping from variable name to a materialized sequence, plus — in
//! distributed mode — an opaque serialized encoding used as a row field
//! when the tuple crosses a partition boundary (§3, §6).

use std::collections::HashMap;
use std::sync::Arc;

use crate::item::Sequence;

/// Opaque binary encoding of a tuple's variable bindings, produced when a
/// tuple is about to be handed to the distributed backend as a row. The
/// encoding scheme itself is a backend concern; the core only carries the
/// bytes through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializedTuple(pub Vec<u8>);

#[derive(Debug, Clone, Default)]
pub struct Tuple {
    bindings: HashMap<String, Sequence>,
    serialized: Option<Arc<SerializedTuple>>,
}

impl Tuple {
    pub fn new() -> Self {
        Tuple::default()
    }

    pub fn with_binding(mut self, name: impl Into<String>, value: Sequence) -> Self {
        self.bindings.insert(name.into(), value);
        self
    }

    pub fn extend(&self, name: impl Into<String>, value: Sequence) -> Tuple {
        let mut bindings = self.bindings.clone();
        bindings.insert(name.into(), value);
        Tuple { bindings, serialized: None }
    }

    /// Concatenates all non-grouping variables' sequences, in original
    /// input order — the merge rule `GroupBy` applies per group (§4.3).
    pub fn merge_concatenating(tuples: &[&Tuple], skip: &[String]) -> Tuple {
        let mut merged: HashMap<String, Sequence> = HashMap::new();
        for tuple in tuples {
            for (key, seq) in &tuple.bindings {
                if skip.contains(key) {
                    continue;
                }
                merged.entry(key.clone()).or_default().extend(seq.iter().cloned());
            }
        }
        Tuple { bindings: merged, serialized: None }
    }

    pub fn get(&self, name: &str) -> Option<&Sequence> {
        self.bindings.get(name)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(|s| s.as_str())
    }

    pub fn serialized(&self) -> Option<&SerializedTuple> {
        self.serialized.as_deref()
    }

    pub fn with_serialized(mut self, bytes: SerializedTuple) -> Self {
        self.serialized = Some(Arc::new(bytes));
        self
    }

    /// Restricts this tuple to only the named variables, per `getProjection`
    /// (§4.2): a clause only materializes what downstream actually needs.
    pub fn project(&self, needed: &[String]) -> Tuple {
        let mut bindings = HashMap::new();
        for name in needed {
            if let Some(seq) = self.bindings.get(name) {
                bindings.insert(name.clone(), seq.clone());
            }
        }
        Tuple { bindings, serialized: self.serialized.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;

    #[test]
    fn extend_adds_a_binding_without_mutating_original() {
        let t = Tuple::new().with_binding("x", vec![Item::Integer(1)]);
        let t2 = t.extend("y", vec![Item::Integer(2)]);
        assert!(t.get("y").is_none());
        assert_eq!(t2.get("x"), Some(&vec![Item::Integer(1)]));
        assert_eq!(t2.get("y"), Some(&vec![Item::Integer(2)]));
    }

    #[test]
    fn merge_concatenating_preserves_input_order() {
        let a = Tuple::new().with_binding("g", vec![Item::Integer(0)]).with_binding("x", vec![Item::Integer(1)]);
        let b = Tuple::new().with_binding("g", vec![Item::Integer(0)]).with_binding("x", vec![Item::Integer(3)]);
        let merged = Tuple::merge_concatenating(&[&a, &b], &["g".to_string()]);
        assert_eq!(merged.get("x"), Some(&vec![Item::Integer(1), Item::Integer(3)]));
        assert!(merged.get("g").is_none());
    }

    #[test]
    fn project_keeps_only_requested_variables() {
        let t = Tuple::new()
            .with_binding("x", vec![Item::Integer(1)])
            .with_binding("y", vec![Item::Integer(2)]);
        let projected = t.project(&["x".to_string()]);
        assert!(projected.get("x").is_some());
        assert!(projected.get("y").is_none());
    }
}

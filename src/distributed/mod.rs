//! The distributed backend interface (§6).
//!
//! The backend's internals are out of scope; this module only defines the
//! shape the core depends on: a partitioned item collection, a typed
//! tabular (DataFrame) abstraction, and a session handle for SQL strings.
//! A concrete backend (Spark-like, or the teacher's own `DDComputation`
//! worker-thread design) plugs in by implementing these traits.

pub mod dataframe;

use std::sync::Arc;

use crate::error::JResult;
use crate::item::Item;

/// A partitioned collection of items, as produced by `RuntimeIterator::getRDD`
/// (§4.1) or bound into a `DynamicContext` (§3).
pub trait PartitionedCollection: Send + Sync {
    fn map(&self, f: Arc<dyn Fn(Item) -> JResult<Item> + Send + Sync>) -> JResult<Box<dyn PartitionedCollection>>;
    fn filter(&self, f: Arc<dyn Fn(&Item) -> JResult<bool> + Send + Sync>) -> JResult<Box<dyn PartitionedCollection>>;
    fn collect(&self) -> JResult<Vec<Item>>;
    fn count(&self) -> JResult<u64>;
    fn cache(&self) -> JResult<Box<dyn PartitionedCollection>>;
    fn take(&self, k: usize) -> JResult<Vec<Item>>;
}

/// A cloneable reference to a partitioned collection, held in a
/// `DynamicContext` binding (§3) or returned by `getRDD`.
#[derive(Clone)]
pub struct PartitionedCollectionHandle {
    inner: Arc<dyn PartitionedCollection>,
}

impl PartitionedCollectionHandle {
    pub fn new(inner: Arc<dyn PartitionedCollection>) -> Self {
        PartitionedCollectionHandle { inner }
    }

    pub fn collect(&self) -> JResult<Vec<Item>> {
        self.inner.collect()
    }

    pub fn count(&self) -> JResult<u64> {
        self.inner.count()
    }

    pub fn as_collection(&self) -> &dyn PartitionedCollection {
        self.inner.as_ref()
    }
}

/// A session handle for issuing SQL-like strings against the tabular
/// abstraction (§6).
pub trait SessionHandle: Send + Sync {
    fn sql(&self, query: &str) -> JResult<Box<dyn dataframe::DataFrame>>;
    fn create_temp_view(&self, name: &str, frame: Box<dyn dataframe::DataFrame>) -> JResult<()>;
}

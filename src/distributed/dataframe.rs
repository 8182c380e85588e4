//! The tabular abstraction the distributed `OrderBy` uses (§4.4, §6).
//!
//! Columns are typed with Arrow's `DataType`, matching the teacher's own
//! use of `arrow::datatypes::DataType` for relation schemas (`value::arrow_convert`).
//! This crate does not implement a backend; it only needs the vocabulary to
//! describe the key-materialization schema and register UDF-like callbacks.

use arrow::datatypes::{DataType, Schema};

use crate::error::JResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A single materialized ordering column, per §4.4 step 2: a tiny
/// presence/null/empty encoding plus the typed value itself.
#[derive(Debug, Clone)]
pub struct OrderingColumn {
    pub null_empty_field: String,
    pub value_field: String,
    pub value_type: DataType,
    pub direction: SortDirection,
}

/// A named, typed, UDF-registerable tabular stream (§6).
pub trait DataFrame: Send + Sync {
    fn schema(&self) -> &Schema;

    /// Registers a UDF with the given return type under `name`, to be
    /// referenced from a subsequent `select`/`order_by` projection string.
    /// Used by the distributed OrderBy's "determineType" and
    /// "createOrderingColumns" callbacks (§4.4).
    fn register_udf(&self, name: &str, return_type: DataType) -> JResult<()>;

    fn select(&self, projection: &[&str]) -> JResult<Box<dyn DataFrame>>;

    fn order_by(&self, columns: &[OrderingColumn]) -> JResult<Box<dyn DataFrame>>;

    fn distinct(&self) -> JResult<Box<dyn DataFrame>>;

    fn collect_type_names(&self, column: &str) -> JResult<Vec<String>>;
}

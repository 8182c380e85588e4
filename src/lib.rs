//! # jsoniq_core
//!
//! The evaluation core of a JSONiq query engine: the item/sequence data
//! model, the pull-based streaming iterator protocol, and the FLWOR
//! pipeline built on top of it. Parsing, static analysis, the CLI/REPL,
//! and storage connectors all live outside this crate — it only executes
//! an already-built expression tree (`ast::ExprNode`) against bound
//! variables and a pluggable distributed backend.
//!
//! ## Pipeline
//!
//! ```text
//! ast::ExprNode (built elsewhere)
//!     ↓
//! iterator::build::build            → Box<dyn RuntimeIterator>
//!     ↓
//! RuntimeIterator::open/has_next/next/close   (item-level streaming, §4.1)
//!     ↓
//! flwor::TupleIterator chain (For/Let/Where/Count/GroupBy/OrderBy/Return)
//!     ↓
//! Vec<item::Item> / item::Sequence
//! ```
//!
//! A `Flwor` expression node nests the tuple-level pipeline inside the
//! item-level one: `flwor::build_flwor_pipeline` builds the clause chain
//! and wraps it in a `flwor::return_clause::ReturnIterator`, which is
//! itself a `RuntimeIterator` — so FLWOR expressions compose with every
//! other expression kind exactly like any other subtree.
//!
//! ## Module organization
//!
//! | Module | Purpose |
//! |---|---|
//! | `item` | The heterogeneous value algebra: `Item`, `Sequence`, numeric promotion, effective boolean value |
//! | `ast` | The expression tree this crate consumes (built by the parser/static analysis, out of scope here) |
//! | `context` | `DynamicContext`: the lexical scope chain expressions evaluate against |
//! | `config` | `EngineConfig` and cooperative cancellation |
//! | `error` | `JsoniqError`, the dynamic error taxonomy |
//! | `tuple` | `Tuple`: the FLWOR pipeline's unit of flow |
//! | `distributed` | The distributed backend interface (`PartitionedCollection`, `DataFrame`, `SessionHandle`) |
//! | `iterator` | `RuntimeIterator` and every expression-level iterator, plus the AST-to-iterator builder |
//! | `registry` | `FunctionRegistry`: built-in and user-defined function resolution |
//! | `flwor` | `TupleIterator` and the FLWOR clause chain |
//! | `driver` | `QueryDriver`: runs a batch of independent top-level expressions with partial-failure semantics |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use jsoniq_core::config::EngineConfig;
//! use jsoniq_core::context::DynamicContext;
//! use jsoniq_core::iterator::build::build;
//!
//! let context = DynamicContext::root(Arc::new(EngineConfig::default()));
//! let mut iterator = build(&expr)?;
//! let items = iterator.materialize(context)?;
//! ```

pub mod ast;
pub mod config;
pub mod context;
pub mod distributed;
pub mod driver;
pub mod error;
pub mod flwor;
pub mod item;
pub mod iterator;
pub mod registry;
pub mod tuple;

pub use error::{JResult, JsoniqError};
pub use item::{Item, Sequence};

//! core::state
//!
//! The branch-graph store: schema and persistence.
//!
//! # Modules
//!
//! - [`schema`] - wire format, strict parsing, invariant validation
//! - [`store`] - locked store with atomic batch updates
//!
//! The store is the single source of truth for the branch graph. The
//! repository itself is only ever *observed*; nothing about the graph is
//! inferred back from git state.

pub mod schema;
pub mod store;

pub use schema::{BranchRecord, SchemaError, StateV1, Violation};
pub use store::{StateStore, StateUpdate, StoreError};

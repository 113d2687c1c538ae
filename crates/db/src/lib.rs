//! Document store contract for Alicia Libros.
//!
//! The hosted document database is an external collaborator; this crate
//! models only what the application relies on: keyed documents grouped in
//! collections, equality/range queries, and transactional read-modify-write
//! with optimistic version checks. [`MemoryStore`] is the in-process backend
//! used for local deployments and tests.

pub mod collection;
pub mod document;
pub mod error;
pub mod memory;
pub mod query;
pub mod store;
pub mod transaction;

pub use collection::Collection;
pub use document::{Document, Entity};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use query::{Direction, Filter, FilterOp, OrderBy, Query};
pub use store::{new_id, Commit, DocumentStore, Precondition, Write};
pub use transaction::{run_transaction, Transaction};

//! Document store layer
//!
//! The [`store::DocumentStore`] trait is the only seam to the remote
//! database; [`mongo::MongoStore`] is the production implementation and
//! [`memory::MemoryStore`] backs tests and dev mode.

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{Condition, DocumentStore, FieldOp, Update};

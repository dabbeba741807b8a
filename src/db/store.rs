//! Remote document store contract
//!
//! The engines only ever talk to the store through this trait. It models
//! the primitives a hosted document database actually offers: lookups by
//! id or field, full-document writes, and partial field updates composed
//! of sets, atomic numeric increments, and array appends. There is no
//! multi-document transaction; every grant sequence is a series of
//! independent writes against one document.

use async_trait::async_trait;
use serde_json::Value;

use crate::types::Result;

/// A single field mutation inside a partial update
#[derive(Debug, Clone)]
pub enum FieldOp {
    /// Overwrite the field at this path
    Set(Value),
    /// Atomically add to the numeric field at this path
    Increment(i64),
    /// Append a value to the array at this path
    AppendToArray(Value),
}

/// A partial update: an ordered list of (dotted path, operation) pairs
///
/// Built fluently, applied as one store call:
///
/// ```ignore
/// Update::new()
///     .set("demos.hello-escrow.status", json!("completed"))
///     .inc("profile.total_points", 80)
/// ```
#[derive(Debug, Clone, Default)]
pub struct Update {
    ops: Vec<(String, FieldOp)>,
}

impl Update {
    /// Create an empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field at `path`
    pub fn set(mut self, path: impl Into<String>, value: Value) -> Self {
        self.ops.push((path.into(), FieldOp::Set(value)));
        self
    }

    /// Atomically increment the numeric field at `path`
    pub fn inc(mut self, path: impl Into<String>, amount: i64) -> Self {
        self.ops.push((path.into(), FieldOp::Increment(amount)));
        self
    }

    /// Append `value` to the array at `path`
    pub fn push(mut self, path: impl Into<String>, value: Value) -> Self {
        self.ops.push((path.into(), FieldOp::AppendToArray(value)));
        self
    }

    /// Whether the update carries no operations
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The operations in insertion order
    pub fn ops(&self) -> &[(String, FieldOp)] {
        &self.ops
    }
}

/// A predicate on a single field path, used for conditional updates
/// and queries
///
/// On paths that traverse an array, `Eq` matches when any element
/// matches and `Ne` only when no element does, mirroring how document
/// databases evaluate dotted paths.
#[derive(Debug, Clone)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
}

/// Minimal contract required from the remote document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by its id
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Fetch the first document whose field at `path` equals `value`
    async fn get_by_field(&self, collection: &str, path: &str, value: &Value)
        -> Result<Option<Value>>;

    /// Create a document, or replace it wholesale if the id exists
    async fn create_or_replace(&self, collection: &str, id: &str, document: Value) -> Result<()>;

    /// Create a document only if the id is free; returns whether it was
    /// created. The claim either lands or it does not - there is no
    /// partial outcome.
    async fn create_if_absent(&self, collection: &str, id: &str, document: Value) -> Result<bool>;

    /// Apply a partial update to the document with this id
    async fn partial_update(&self, collection: &str, id: &str, update: Update) -> Result<()>;

    /// Apply a partial update only if every condition holds; returns
    /// whether the document matched. Conditions and update are evaluated
    /// against the same document state in one store operation.
    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        conditions: &[(String, Condition)],
        update: Update,
    ) -> Result<bool>;

    /// Fetch every document matching the filter (empty filter = all)
    async fn query(&self, collection: &str, filter: &[(String, Condition)])
        -> Result<Vec<Value>>;
}

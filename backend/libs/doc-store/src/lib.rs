//! Nova document store contract
//!
//! Path-addressed, ordered document store used by the social feed layer:
//! - Single-path reads and writes, each individually atomic
//! - Ordered range queries over one field with inclusive bounds
//! - Continuous child listeners with owned, cancellable subscriptions
//! - Metrics labelled by collection
//!
//! There is no multi-path transaction primitive. Callers that need two
//! writes to agree must compensate themselves.

mod error;
mod listener;
mod memory;
mod metrics;
mod path;
mod query;

pub use error::{StoreError, StoreResult};
pub use listener::{ChildEvent, EventKind, Subscription};
pub use memory::{FaultOp, MemoryStore};
pub use metrics::StoreMetrics;
pub use path::StorePath;
pub use query::{Bound, Limit, OrderBy, OrderValue, Query, Snapshot};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Shared handle to a store implementation
pub type SharedStore = Arc<dyn DocumentStore>;

/// Core store operations
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Generate a fresh, opaque child key
    fn generate_key(&self) -> Uuid;

    /// Read the document (or assembled subtree) at a path
    async fn get(&self, path: &StorePath) -> StoreResult<Option<Value>>;

    /// Write a document, replacing anything at or beneath the path
    async fn set(&self, path: &StorePath, value: Value) -> StoreResult<()>;

    /// Remove the document and everything beneath it; absent paths are a no-op
    async fn remove(&self, path: &StorePath) -> StoreResult<()>;

    /// Ordered, bounded read of the direct children of a path
    async fn query(&self, path: &StorePath, query: &Query) -> StoreResult<Vec<Snapshot>>;

    /// Listen for child changes under a path.
    ///
    /// Existing children matching the query are delivered first as
    /// `Added`; afterwards every write to a direct child inside the query
    /// bounds is delivered. Removals of direct children are delivered
    /// regardless of bounds. Limits only shape the initial delivery.
    async fn observe(&self, path: &StorePath, query: &Query) -> StoreResult<Subscription>;

    /// Existence probe
    async fn exists(&self, path: &StorePath) -> StoreResult<bool> {
        Ok(self.get(path).await?.is_some())
    }
}

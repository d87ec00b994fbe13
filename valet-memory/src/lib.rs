//! VALET Memory - Shared Key-Value Store
//!
//! The `MemoryStore` trait is the persistence seam every agent writes
//! through. The in-memory backend here is what tests and the default
//! service wiring use; file or database backings substitute behind the
//! same trait.

pub mod in_memory;
pub mod keys;

pub use in_memory::InMemoryStore;

use ::async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use valet_core::{Timestamp, ValetResult};

/// A stored value together with its key and last update time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Full key the entry is stored under
    pub key: String,
    /// Arbitrary JSON payload
    pub value: Value,
    /// When the entry was last written
    pub updated_at: Timestamp,
}

impl MemoryEntry {
    /// Create an entry stamped with the current time.
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            updated_at: Utc::now(),
        }
    }
}

/// Shared memory store contract.
///
/// Upserts are last-write-wins. Implementations must be safe for
/// concurrent use by every agent in the system.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Store a value under a key, replacing any previous value.
    async fn store(&self, key: &str, value: Value) -> ValetResult<()>;

    /// Get the entry for a key. Fails with `MemoryError::NotFound` when absent.
    async fn get(&self, key: &str) -> ValetResult<MemoryEntry>;

    /// Get entries for several keys at once.
    ///
    /// Missing keys are simply absent from the returned map, never an error.
    async fn get_multiple(&self, keys: &[String]) -> ValetResult<HashMap<String, MemoryEntry>>;

    /// List up to `limit` keys with the given prefix, in lexicographic order.
    async fn list(&self, prefix: &str, limit: usize) -> ValetResult<Vec<String>>;

    /// Search stored values for the query, best matches first.
    ///
    /// Ranking is an implementation detail; entries that match nothing are
    /// never returned.
    async fn search(&self, query: &str, limit: usize) -> ValetResult<Vec<MemoryEntry>>;
}

//! In-memory `MemoryStore` backend.

use crate::{MemoryEntry, MemoryStore};
use ::async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use valet_core::{MemoryError, ValetError, ValetResult};

/// Map-backed store used by tests and the default service wiring.
///
/// A `BTreeMap` keeps keys sorted, which gives `list` its stable
/// lexicographic order without a separate index.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, MemoryEntry>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Lowercased alphanumeric tokens of a query string.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// How many query tokens appear in the serialized value.
fn overlap_score(query_tokens: &[String], text: &str) -> usize {
    query_tokens
        .iter()
        .filter(|token| text.contains(token.as_str()))
        .count()
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn store(&self, key: &str, value: Value) -> ValetResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), MemoryEntry::new(key, value));
        Ok(())
    }

    async fn get(&self, key: &str) -> ValetResult<MemoryEntry> {
        self.entries.read().await.get(key).cloned().ok_or_else(|| {
            ValetError::Memory(MemoryError::NotFound {
                key: key.to_string(),
            })
        })
    }

    async fn get_multiple(&self, keys: &[String]) -> ValetResult<HashMap<String, MemoryEntry>> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(key).map(|e| (key.clone(), e.clone())))
            .collect())
    }

    async fn list(&self, prefix: &str, limit: usize) -> ValetResult<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn search(&self, query: &str, limit: usize) -> ValetResult<Vec<MemoryEntry>> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.entries.read().await;
        let mut scored: Vec<(usize, &MemoryEntry)> = entries
            .values()
            .filter_map(|entry| {
                let text = entry.value.to_string().to_lowercase();
                let score = overlap_score(&query_tokens, &text);
                (score > 0).then_some((score, entry))
            })
            .collect();

        // Best score first; key order breaks ties so results are stable.
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.key.cmp(&b.1.key)));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

//! Parsed-call cache keyed by source identifier and placeholder context.

use crate::call::Call;
use crate::error::Result;
use crate::placeholder::Placeholders;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Identifies one parse: the same source under different placeholder values is
/// a different entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source_id: String,
    context: String,
}

impl CacheKey {
    pub fn new(source_id: &str, placeholders: &Placeholders) -> Self {
        let context = Value::Object(
            placeholders
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
        .to_string();
        Self {
            source_id: source_id.to_string(),
            context,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }
}

/// Shared cache of parsed calls with compute-if-absent semantics.
///
/// A miss parses outside the lock; concurrent misses on one key may both
/// parse, and the last insert wins.
#[derive(Debug, Default)]
pub struct CallCache {
    entries: RwLock<HashMap<CacheKey, Arc<Call>>>,
}

impl CallCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached call for `key`, parsing it with `parse` on a miss.
    pub fn get_or_parse<F>(&self, key: &CacheKey, parse: F) -> Result<Arc<Call>>
    where
        F: FnOnce() -> Result<Call>,
    {
        if let Some(call) = self.entries.read().get(key) {
            debug!(source_id = %key.source_id, "Call cache hit");
            return Ok(Arc::clone(call));
        }

        debug!(source_id = %key.source_id, "Call cache miss");
        let call = Arc::new(parse()?);
        self.entries.write().insert(key.clone(), Arc::clone(&call));
        Ok(call)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Call>> {
        self.entries.read().get(key).cloned()
    }

    /// Remove an entry, returning it if present.
    pub fn evict(&self, key: &CacheKey) -> Option<Arc<Call>> {
        self.entries.write().remove(key)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

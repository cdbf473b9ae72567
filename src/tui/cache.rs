use std::collections::HashMap;

use bytes::Bytes;

/// Identifies one browsing session's writes to the cache.
pub type Generation = u64;

/// Display key to raw payload store for the current browsing session.
///
/// Only the UI loop mutates the cache. Background ingestion hands its pages
/// over as events tagged with the generation they were started under, and
/// pages from an older generation are dropped.
#[derive(Debug, Default)]
pub struct RecordCache {
    generation: Generation,
    entries: HashMap<String, Bytes>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites. Returns `true` if the key was not present.
    pub fn put(&mut self, key: String, payload: Bytes) -> bool {
        self.entries.insert(key, payload).is_none()
    }

    pub fn get(&self, key: &str) -> Option<&Bytes> {
        self.entries.get(key)
    }

    /// Drops every entry and starts a new generation.
    pub fn reset(&mut self) -> Generation {
        self.entries.clear();
        self.generation += 1;
        self.generation
    }

    #[cfg(test)]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

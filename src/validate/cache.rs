//! Image cache collaborator.
//!
//! Persistent image storage lives outside this crate; the validator only asks
//! whether an image is already known and records the ones it fetched.

use std::sync::Arc;

use dashmap::DashMap;

/// Cache of image bytes keyed by URL.
pub trait ImageCache: Send + Sync {
    fn contains(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<Arc<Vec<u8>>>;

    fn store(&self, key: &str, bytes: Vec<u8>);
}

/// In-process cache, shared between concurrent probes.
#[derive(Debug, Default)]
pub struct MemoryImageCache {
    entries: DashMap<String, Arc<Vec<u8>>>,
}

impl MemoryImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ImageCache for MemoryImageCache {
    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    fn store(&self, key: &str, bytes: Vec<u8>) {
        self.entries.insert(key.to_string(), Arc::new(bytes));
    }
}

use log::trace;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::error::Result;
use crate::tree::{MerkleBuilder, MerkleResult, TxHashInput};

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Memoizes built trees by their (non-empty) input sequence.
/// Failed builds are not stored.
pub struct MerkleCache {
    builder: MerkleBuilder,
    entries: Mutex<LruCache<Vec<String>, Arc<MerkleResult>>>,
}

impl MerkleCache {
    pub fn new(capacity: NonZeroUsize, builder: MerkleBuilder) -> Self {
        Self {
            builder,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn builder(&self) -> &MerkleBuilder {
        &self.builder
    }

    pub fn get_or_build<T: TxHashInput>(&self, tx_hashes: &[T]) -> Result<Arc<MerkleResult>> {
        let key: Vec<String> = tx_hashes
            .iter()
            .filter_map(|entry| entry.tx_hash().map(str::to_string))
            .collect();

        if let Some(hit) = self.entries.lock().get(&key) {
            trace!("Merkle cache hit ({} transactions)", key.len());
            return Ok(Arc::clone(hit));
        }

        // built outside the lock; a racing insert for the same key is harmless
        let result = Arc::new(self.builder.build(tx_hashes)?);
        self.entries.lock().put(key, Arc::clone(&result));
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for MerkleCache {
    fn default() -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self::new(capacity, MerkleBuilder::default())
    }
}

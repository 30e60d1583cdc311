use crate::types::AIAnalysisResult;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry {
    inserted: Instant,
    result: AIAnalysisResult,
}

/// Size- and time-bounded LRU cache of real-call results, keyed by image
/// fingerprint.
///
/// A poisoned lock is treated as a miss; the cache never panics.
pub struct ResultCache {
    entries: Option<Mutex<LruCache<String, CacheEntry>>>,
    ttl: Duration,
}

impl ResultCache {
    /// `capacity == 0` or a zero `ttl` disables caching.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let entries = NonZeroUsize::new(capacity)
            .filter(|_| !ttl.is_zero())
            .map(|cap| Mutex::new(LruCache::new(cap)));
        Self { entries, ttl }
    }

    /// Fresh result for `key`, if any. Expired entries are dropped on read.
    pub fn get(&self, key: &str) -> Option<AIAnalysisResult> {
        let entries = self.entries.as_ref()?;
        match entries.lock() {
            Ok(mut cache) => {
                let expired = cache.peek(key)?.inserted.elapsed() >= self.ttl;
                if expired {
                    cache.pop(key);
                    return None;
                }
                cache.get(key).map(|entry| entry.result.clone())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Result cache mutex poisoned, treating as miss");
                None
            }
        }
    }

    /// Store a result. Last writer wins; at capacity the least recently
    /// used entry is evicted.
    pub fn insert(&self, key: String, result: AIAnalysisResult) {
        let Some(entries) = self.entries.as_ref() else {
            return;
        };
        match entries.lock() {
            Ok(mut cache) => {
                cache.put(
                    key,
                    CacheEntry {
                        inserted: Instant::now(),
                        result,
                    },
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Result cache mutex poisoned, skipping insert");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .and_then(|entries| entries.lock().ok().map(|cache| cache.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hex SHA-256 of the encoded image.
pub fn fingerprint(image_b64: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_b64.as_bytes());
    format!("{:x}", hasher.finalize())
}

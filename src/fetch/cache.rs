//! Short-lived cache of rendered HTML.
//!
//! Keys are the exact render request URL. Entries expire after a fixed TTL
//! and the least recently accessed entry is evicted when the cache is full.
//! All mutation happens inside one short critical section; the lock is never
//! held across an await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry {
    html: Arc<str>,
    inserted: Instant,
    last_access: Instant,
}

/// TTL + LRU cache of rendered pages, safe to share between requests.
#[derive(Debug)]
pub struct HtmlCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl HtmlCache {
    /// Cache holding at most `capacity` entries for `ttl` each.
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    // A panic while holding the lock leaves the map consistent, so a poisoned
    // lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached HTML for `key`, refreshing its last-access time.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        let now = Instant::now();
        let mut entries = self.lock();
        let expired = match entries.get_mut(key) {
            Some(entry) if now.duration_since(entry.inserted) < self.ttl => {
                entry.last_access = now;
                return Some(Arc::clone(&entry.html));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    /// Store `html` under `key`, evicting expired entries first and then the
    /// least recently used ones until the cache fits.
    pub fn insert(&self, key: impl Into<String>, html: impl Into<Arc<str>>) {
        if self.capacity == 0 {
            return;
        }
        let now = Instant::now();
        let mut entries = self.lock();
        entries.retain(|_, e| now.duration_since(e.inserted) < self.ttl);

        let key = key.into();
        while entries.len() >= self.capacity && !entries.contains_key(&key) {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            entries.remove(&oldest);
        }

        entries.insert(
            key,
            Entry {
                html: html.into(),
                inserted: now,
                last_access: now,
            },
        );
    }

    /// Number of live and not yet purged entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss() {
        let cache = HtmlCache::new(Duration::from_secs(60), 4);
        cache.insert("a", "<p>a</p>");
        assert_eq!(cache.get("a").as_deref(), Some("<p>a</p>"));
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_evicts_least_recently_accessed() {
        let cache = HtmlCache::new(Duration::from_secs(60), 2);
        cache.insert("a", "A");
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b", "B");
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get("a").is_some());
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("c", "C");

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = HtmlCache::new(Duration::from_millis(5), 4);
        cache.insert("a", "A");
        std::thread::sleep(Duration::from_millis(15));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reinsert_same_key_does_not_evict() {
        let cache = HtmlCache::new(Duration::from_secs(60), 1);
        cache.insert("a", "A");
        cache.insert("a", "A2");
        assert_eq!(cache.get("a").as_deref(), Some("A2"));
    }
}

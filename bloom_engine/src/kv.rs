//! An in-process keyed store with per-entry expiry.
//!
//! Guest carts (and other ephemeral session state) live here instead of in a module-level singleton, so the
//! lifecycle is owned by whoever constructs the cache and tests can build their own instances.
use std::{collections::HashMap, hash::Hash, sync::Arc, time::Duration};

use log::*;
use tokio::{sync::RwLock, task::JoinHandle, time::Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A clonable, async keyed store. Entries expire `ttl` after their last write; a background sweep task evicts
/// expired entries so the map does not grow without bound.
pub struct ExpiringCache<K, V> {
    entries: Arc<RwLock<HashMap<K, Entry<V>>>>,
    ttl: Duration,
}

impl<K, V> Clone for ExpiringCache<K, V> {
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries), ttl: self.ttl }
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Arc::new(RwLock::new(HashMap::new())), ttl }
    }

    /// Spawns the sweep task. Dropping the returned handle does not stop the sweep; abort it for a clean shutdown.
    pub fn start_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                timer.tick().await;
                let now = Instant::now();
                let mut map = entries.write().await;
                let before = map.len();
                map.retain(|_, e| e.expires_at > now);
                let evicted = before - map.len();
                if evicted > 0 {
                    debug!("🧹️ Session sweep evicted {evicted} expired entries");
                }
            }
        })
    }

    pub async fn insert(&self, key: K, value: V) {
        let entry = Entry { value, expires_at: Instant::now() + self.ttl };
        self.entries.write().await.insert(key, entry);
    }

    /// Fetches a live entry. Expired entries are treated as absent even if the sweeper has not run yet.
    pub async fn get(&self, key: &K) -> Option<V> {
        let map = self.entries.read().await;
        map.get(key).filter(|e| e.expires_at > Instant::now()).map(|e| e.value.clone())
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        self.entries.write().await.remove(key).map(|e| e.value)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn insert_get_remove() {
        let cache = ExpiringCache::new(Duration::from_secs(60));
        cache.insert("s1".to_string(), 42u32).await;
        assert_eq!(cache.get(&"s1".to_string()).await, Some(42));
        assert_eq!(cache.remove(&"s1".to_string()).await, Some(42));
        assert!(cache.get(&"s1".to_string()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_without_the_sweeper() {
        let cache = ExpiringCache::new(Duration::from_secs(10));
        cache.insert("s1".to_string(), 1u32).await;
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cache.get(&"s1".to_string()).await.is_none());
        // still physically present until a sweep or overwrite
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_expired_entries() {
        let cache = ExpiringCache::new(Duration::from_secs(10));
        let sweeper = cache.start_sweeper(Duration::from_secs(5));
        cache.insert("s1".to_string(), 1u32).await;
        cache.insert("s2".to_string(), 2u32).await;
        tokio::time::advance(Duration::from_secs(16)).await;
        tokio::task::yield_now().await;
        assert!(cache.is_empty().await);
        sweeper.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn rewriting_refreshes_the_ttl() {
        let cache = ExpiringCache::new(Duration::from_secs(10));
        cache.insert("s1".to_string(), 1u32).await;
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert("s1".to_string(), 2u32).await;
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get(&"s1".to_string()).await, Some(2));
    }
}

// In-process expiring store on the tokio clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use super::{CacheError, CacheStore};

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
    reads_fail: AtomicBool,
    writes_fail: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent reads report the store as unavailable.
    pub fn set_reads_fail(&self, fail: bool) {
        self.reads_fail.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail.
    pub fn set_writes_fail(&self, fail: bool) {
        self.writes_fail.store(fail, Ordering::SeqCst);
    }

    /// Live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.value().1 > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable {
                message: "memory cache reads disabled".into(),
            });
        }
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.1 > now => return Ok(Some(entry.0.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, (_, deadline)| *deadline <= now);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, ttl: Duration, payload: String) -> Result<(), CacheError> {
        if self.writes_fail.load(Ordering::SeqCst) {
            return Err(CacheError::WriteFailed {
                key: key.to_owned(),
                message: "memory cache writes disabled".into(),
            });
        }
        self.entries
            .insert(key.to_owned(), (payload, Instant::now() + ttl));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_without_sliding() {
        let cache = MemoryCache::new();
        cache
            .set("k", Duration::from_secs(300), "v".into())
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(200)).await;
        assert!(cache.get("k").await.unwrap().is_some());

        // A read does not extend the deadline.
        tokio::time::advance(Duration::from_secs(99)).await;
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn injected_failures() {
        let cache = MemoryCache::new();
        cache.set_writes_fail(true);
        assert!(matches!(
            cache.set("k", Duration::from_secs(1), "v".into()).await,
            Err(CacheError::WriteFailed { .. })
        ));
        cache.set_reads_fail(true);
        assert!(matches!(
            cache.get("k").await,
            Err(CacheError::Unavailable { .. })
        ));
    }
}

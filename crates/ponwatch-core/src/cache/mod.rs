// ── Cache layer ──
//
// An opaque key/value store with per-entry expiry. The acquisition
// service reads through it before touching the device and writes back
// after a live fetch; every failure here degrades to a live fetch.

mod memory;
mod redis_cache;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::model::PortCoordinate;

pub use self::memory::MemoryCache;
pub use self::redis_cache::{RedisCache, RedisSettings};

/// Failure talking to the cache store.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {message}")]
    Unavailable { message: String },

    #[error("cache write to {key} failed: {message}")]
    WriteFailed { key: String, message: String },

    #[error("cache payload for {key} could not be (de)serialized: {message}")]
    Codec { key: String, message: String },
}

/// Expiring string key/value store.
pub trait CacheStore: Send + Sync + 'static {
    /// `Ok(None)` on a miss or an expired entry.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, CacheError>> + Send;

    /// Write `payload` under `key`, expiring `ttl` after the write.
    fn set(
        &self,
        key: &str,
        ttl: Duration,
        payload: String,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;
}

/// Read and decode a JSON payload.
pub async fn get_json<C, T>(store: &C, key: &str) -> Result<Option<T>, CacheError>
where
    C: CacheStore,
    T: DeserializeOwned,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| CacheError::Codec {
            key: key.to_owned(),
            message: e.to_string(),
        })
}

/// Encode `value` as JSON and write it.
pub async fn set_json<C, T>(store: &C, key: &str, ttl: Duration, value: &T) -> Result<(), CacheError>
where
    C: CacheStore,
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_string(value).map_err(|e| CacheError::Codec {
        key: key.to_owned(),
        message: e.to_string(),
    })?;
    store.set(key, ttl, payload).await
}

// ── Keys ────────────────────────────────────────────────────────────

/// `<entity>_board_<b>_pon_<p>[_<suffix>]`
pub fn cache_key(entity: &str, port: PortCoordinate, suffix: Option<&str>) -> String {
    let mut key = format!("{entity}_board_{}_pon_{}", port.board, port.pon);
    if let Some(suffix) = suffix {
        key.push('_');
        key.push_str(suffix);
    }
    key
}

pub fn port_listing_key(port: PortCoordinate) -> String {
    cache_key("onu", port, None)
}

pub fn free_slots_key(port: PortCoordinate) -> String {
    cache_key("onu", port, Some("empty_onu_id"))
}

// ── Backend selection ───────────────────────────────────────────────

/// The store chosen at startup.
pub enum CacheBackend {
    Redis(RedisCache),
    Memory(MemoryCache),
}

impl CacheBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }
}

impl CacheStore for CacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self {
            Self::Redis(c) => c.get(key).await,
            Self::Memory(c) => c.get(key).await,
        }
    }

    async fn set(&self, key: &str, ttl: Duration, payload: String) -> Result<(), CacheError> {
        match self {
            Self::Redis(c) => c.set(key, ttl, payload).await,
            Self::Memory(c) => c.set(key, ttl, payload).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keys_follow_entity_board_pon_layout() {
        let port = PortCoordinate::new(2, 16);
        assert_eq!(port_listing_key(port), "onu_board_2_pon_16");
        assert_eq!(free_slots_key(port), "onu_board_2_pon_16_empty_onu_id");
    }

    #[tokio::test]
    async fn json_helpers_round_trip_through_the_store() {
        let cache = MemoryCache::new();
        set_json(&cache, "k", Duration::from_secs(60), &vec![1u32, 2, 3])
            .await
            .unwrap();
        let back: Option<Vec<u32>> = get_json(&cache, "k").await.unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn garbage_payload_is_a_codec_error() {
        let cache = MemoryCache::new();
        cache
            .set("k", Duration::from_secs(60), "not json".into())
            .await
            .unwrap();
        let err = get_json::<_, Vec<u32>>(&cache, "k").await.unwrap_err();
        assert!(matches!(err, CacheError::Codec { .. }));
    }

    #[tokio::test]
    async fn backend_delegates_to_memory() {
        let backend = CacheBackend::Memory(MemoryCache::new());
        assert_eq!(backend.kind(), "memory");
        backend
            .set("k", Duration::from_secs(5), "v".into())
            .await
            .unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
    }
}

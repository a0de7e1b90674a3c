// Redis-backed store.
//
// One multiplexed `ConnectionManager` is shared by every caller and
// reconnects on its own; each operation clones the handle.

use std::fmt;
use std::time::Duration;

use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use super::{CacheError, CacheStore};

/// Where the Redis server lives and how long to wait for it.
#[derive(Clone)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<SecretString>,
    pub db: i64,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 6379,
            password: None,
            db: 0,
            connect_timeout: Duration::from_secs(3),
            response_timeout: Duration::from_secs(3),
        }
    }
}

impl fmt::Debug for RedisSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("db", &self.db)
            .field("connect_timeout", &self.connect_timeout)
            .field("response_timeout", &self.response_timeout)
            .finish()
    }
}

impl RedisSettings {
    /// `redis://[:password@]host:port/db`
    pub fn url(&self) -> Result<Url, CacheError> {
        let invalid = |message: String| CacheError::Unavailable { message };
        let mut url = Url::parse(&format!("redis://{}:{}/{}", self.host, self.port, self.db))
            .map_err(|e| invalid(format!("invalid redis address {}: {e}", self.host)))?;
        if let Some(password) = &self.password {
            url.set_password(Some(password.expose_secret()))
                .map_err(|()| invalid("redis URL cannot carry a password".into()))?;
        }
        Ok(url)
    }
}

#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connect and verify the server answers. Fails fast so the caller can
    /// fall back to another store.
    pub async fn connect(settings: &RedisSettings) -> Result<Self, CacheError> {
        let unavailable = |e: redis::RedisError| CacheError::Unavailable {
            message: e.to_string(),
        };
        let url = settings.url()?;
        let client = Client::open(url.as_str()).map_err(unavailable)?;
        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(settings.connect_timeout)
            .set_response_timeout(settings.response_timeout);
        let mut manager = ConnectionManager::new_with_config(client, config)
            .await
            .map_err(unavailable)?;
        redis::cmd("PING")
            .query_async::<String>(&mut manager)
            .await
            .map_err(unavailable)?;
        debug!(host = %settings.host, port = settings.port, db = settings.db, "redis connected");
        Ok(Self { manager })
    }
}

impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| CacheError::Unavailable {
                message: e.to_string(),
            })
    }

    async fn set(&self, key: &str, ttl: Duration, payload: String) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, payload, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::WriteFailed {
                key: key.to_owned(),
                message: e.to_string(),
            })
    }
}

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur with session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Session store timed out after {0:?}")]
    Timeout(Duration),

    #[error("Corrupt session value for {key}: {value}")]
    Corrupt { key: String, value: String },
}

/// Per-browser-session key/value storage
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError>;

    async fn set(&self, session_id: &str, key: &str, value: &str) -> Result<(), SessionError>;

    async fn clear(&self, session_id: &str, key: &str) -> Result<(), SessionError>;
}

/// A store bound to one browser session
#[derive(Clone, Copy)]
pub struct Session<'a> {
    store: &'a dyn SessionStore,
    id: &'a str,
}

impl<'a> Session<'a> {
    pub fn new(store: &'a dyn SessionStore, id: &'a str) -> Self {
        Self { store, id }
    }

    pub fn id(&self) -> &str {
        self.id
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        self.store.get(self.id, key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.store.set(self.id, key, value).await
    }

    pub async fn clear(&self, key: &str) -> Result<(), SessionError> {
        self.store.clear(self.id, key).await
    }

    /// Read a stored numeric id
    pub async fn get_id(&self, key: &str) -> Result<Option<i64>, SessionError> {
        match self.get(key).await? {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| SessionError::Corrupt { key: key.to_string(), value }),
        }
    }
}

/// Session store shared across instances through Redis.
///
/// Each session is a hash at `session:{id}` whose expiry is refreshed on
/// every write.
pub struct RedisSessionStore {
    redis: ConnectionManager,
    ttl_secs: u64,
    timeout: Duration,
}

impl RedisSessionStore {
    pub async fn new(redis_url: &str, ttl_secs: u64, timeout: Duration) -> Result<Self, SessionError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        Ok(Self {
            redis,
            ttl_secs,
            timeout,
        })
    }

    fn key(session_id: &str) -> String {
        format!("session:{}", session_id)
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, SessionError>
    where
        F: std::future::Future<Output = Result<T, redis::RedisError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| SessionError::Timeout(self.timeout))?
            .map_err(Into::into)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError> {
        let mut conn = self.redis.clone();
        let cmd = redis::cmd("HGET").arg(Self::key(session_id)).arg(key).to_owned();
        self.bounded(async move { cmd.query_async(&mut conn).await }).await
    }

    async fn set(&self, session_id: &str, key: &str, value: &str) -> Result<(), SessionError> {
        let mut conn = self.redis.clone();
        let redis_key = Self::key(session_id);
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("HSET").arg(&redis_key).arg(key).arg(value).ignore()
            .cmd("EXPIRE").arg(&redis_key).arg(self.ttl_secs).ignore();

        self.bounded::<(), _>(async move { pipe.query_async(&mut conn).await })
            .await?;
        tracing::trace!("Session {} set {}", session_id, key);
        Ok(())
    }

    async fn clear(&self, session_id: &str, key: &str) -> Result<(), SessionError> {
        let mut conn = self.redis.clone();
        let cmd = redis::cmd("HDEL").arg(Self::key(session_id)).arg(key).to_owned();
        let _removed: i64 = self.bounded(async move { cmd.query_async(&mut conn).await }).await?;
        Ok(())
    }
}

/// In-process session store with idle expiry, for single-instance
/// deployments and tests
pub struct MemorySessionStore {
    entries: moka::future::Cache<String, String>,
}

impl MemorySessionStore {
    pub fn new(capacity: u64, ttl_secs: u64) -> Self {
        let entries = moka::future::CacheBuilder::new(capacity)
            .time_to_idle(Duration::from_secs(ttl_secs))
            .build();

        Self { entries }
    }

    fn key(session_id: &str, key: &str) -> String {
        format!("{}:{}", session_id, key)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.entries.get(&Self::key(session_id, key)).await)
    }

    async fn set(&self, session_id: &str, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries
            .insert(Self::key(session_id, key), value.to_string())
            .await;
        Ok(())
    }

    async fn clear(&self, session_id: &str, key: &str) -> Result<(), SessionError> {
        self.entries.invalidate(&Self::key(session_id, key)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_session_set_get_clear() {
        let store = MemorySessionStore::new(100, 60);
        let session = Session::new(&store, "abc");

        assert_eq!(session.get("reset_user_id").await.unwrap(), None);

        session.set("reset_user_id", "42").await.unwrap();
        assert_eq!(session.get_id("reset_user_id").await.unwrap(), Some(42));

        session.clear("reset_user_id").await.unwrap();
        assert_eq!(session.get("reset_user_id").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = MemorySessionStore::new(100, 60);
        Session::new(&store, "one").set("k", "1").await.unwrap();

        assert_eq!(Session::new(&store, "two").get("k").await.unwrap(), None);
    }

    #[test]
    fn test_non_numeric_marker_is_session_error() {
        let store = MemorySessionStore::new(100, 60);
        let session = Session::new(&store, "abc");

        tokio_test::block_on(async {
            session.set("reset_user_id", "not-a-number").await.unwrap();
            assert!(session.get_id("reset_user_id").await.is_err());
        });
    }

    #[tokio::test]
    async fn test_corrupt_id_value() {
        let store = MemorySessionStore::new(100, 60);
        let session = Session::new(&store, "abc");
        session.set("reset_user_id", "not-a-number").await.unwrap();

        assert!(matches!(
            session.get_id("reset_user_id").await,
            Err(SessionError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_redis_session_roundtrip() {
        let store = RedisSessionStore::new("redis://127.0.0.1:6379", 60, Duration::from_secs(2))
            .await
            .expect("Failed to connect to Redis");
        let session = Session::new(&store, "redis-test");

        session.set("verified_user_id", "7").await.unwrap();
        assert_eq!(session.get_id("verified_user_id").await.unwrap(), Some(7));
        session.clear("verified_user_id").await.unwrap();
        assert_eq!(session.get("verified_user_id").await.unwrap(), None);
    }
}

//! Redis-backed session store

use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use super::sessions::{SessionStore, VisitCounter};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
    ttl_seconds: i64,
}

impl RedisService {
    /// Create a new Redis service; session hashes expire after `ttl_seconds` idle
    pub async fn new(url: &str, ttl_seconds: u64) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Session(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Session(format!("Redis connection test failed: {}", e)))?;

        Ok(Self {
            client,
            ttl_seconds: ttl_seconds as i64,
        })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to get Redis connection: {}", e)))
    }

    fn key(session_id: &str) -> String {
        format!("session:{}", session_id)
    }
}

#[async_trait]
impl SessionStore for RedisService {
    async fn next_visit(&self, session_id: &str, counter: VisitCounter) -> AppResult<i64> {
        let mut conn = self.connection().await?;
        let key = Self::key(session_id);

        let current: i64 = conn
            .hincr(&key, counter.key(), 1)
            .await
            .map_err(|e| AppError::Session(format!("Failed to increment visit counter: {}", e)))?;
        conn.expire::<_, ()>(&key, self.ttl_seconds)
            .await
            .map_err(|e| AppError::Session(format!("Failed to refresh session expiry: {}", e)))?;

        Ok(current - 1)
    }

    async fn flush(&self, session_id: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(Self::key(session_id))
            .await
            .map_err(|e| AppError::Session(format!("Failed to delete session: {}", e)))?;
        Ok(())
    }
}

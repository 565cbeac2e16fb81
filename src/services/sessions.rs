//! Per-session visit counters

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use utoipa::ToSchema;

use crate::error::AppResult;

/// Counters kept in a visitor's session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub enum VisitCounter {
    /// Home page visits
    Index,
    /// Maintenance page visits
    Maintenance,
}

impl VisitCounter {
    pub fn key(&self) -> &'static str {
        match self {
            VisitCounter::Index => "num_visits",
            VisitCounter::Maintenance => "num_visits_2",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Increment a counter, returning its value before this visit (0 on first)
    async fn next_visit(&self, session_id: &str, counter: VisitCounter) -> AppResult<i64>;

    /// Drop every value held for a session
    async fn flush(&self, session_id: &str) -> AppResult<()>;
}

/// Session store living in process memory; sessions never expire
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, HashMap<&'static str, i64>>>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn next_visit(&self, session_id: &str, counter: VisitCounter) -> AppResult<i64> {
        let mut sessions = self.sessions.lock().await;
        let value = sessions
            .entry(session_id.to_string())
            .or_default()
            .entry(counter.key())
            .or_insert(0);
        let previous = *value;
        *value += 1;
        Ok(previous)
    }

    async fn flush(&self, session_id: &str) -> AppResult<()> {
        self.sessions.lock().await.remove(session_id);
        Ok(())
    }
}

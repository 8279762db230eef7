//! Session persistence.
//!
//! One key-value contract over session records, with two interchangeable
//! backends: a local in-process map and a shared Redis store. The
//! contract is asynchronous even for the local backend, and callers must
//! not assume atomicity across a get/mutate/set sequence; concurrent
//! events against one session resolve last-write-wins.
//!
//! Backends degrade rather than raise: a transport or serialization
//! failure is logged and surfaces as "value absent" on reads or `false`
//! on writes, never as an error up the caller chain.

pub mod memory;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StoreBackend, StoreConfig};
use crate::session::Session;

pub use self::redis::RedisStore;
pub use memory::MemoryStore;

/// Key-value store of live sessions, keyed by session ID.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session, or `None` if absent (or unreadable).
    async fn get(&self, id: &str) -> Option<Session>;

    /// Persist a session. Returns whether the write took effect.
    async fn set(&self, id: &str, session: &Session) -> bool;

    /// Delete a session. Returns whether it existed.
    async fn delete(&self, id: &str) -> bool;

    /// Check whether a session exists.
    async fn has(&self, id: &str) -> bool;

    /// All live session IDs.
    async fn keys(&self) -> Vec<String>;

    /// Apply `f` to every live entry. Mutation still goes through a
    /// get/mutate/set bracket, never through this closure.
    async fn for_each(&self, f: &mut (dyn for<'a> FnMut(&'a Session, &'a str) + Send));
}

/// Build the configured store.
///
/// If the Redis backend cannot establish a connection at startup, falls
/// back to the in-memory store instead of failing to start, trading
/// strict consistency for availability in degraded environments.
pub async fn create_store(config: &StoreConfig) -> Arc<dyn SessionStore> {
    match &config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Redis { url } => match RedisStore::connect(url).await {
            Ok(store) => {
                tracing::info!(%url, "using redis session store");
                Arc::new(store)
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "redis unavailable, using in-memory session store");
                Arc::new(MemoryStore::new())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_store_memory() {
        let store = create_store(&StoreConfig::default()).await;
        assert!(store.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_store_falls_back_when_redis_unreachable() {
        // Nothing listens on this port; startup must still yield a store.
        let config = StoreConfig::redis("redis://127.0.0.1:1");
        let store = create_store(&config).await;

        let session = Session::new("a1b2c3d4".to_string(), None);
        assert!(store.set(&session.id, &session).await);
        assert!(store.has(&session.id).await);
    }
}

//! Store configuration.
//!
//! Backend selection is a construction-time choice made by the embedding
//! server; reading it from the environment is the bootstrap's job, not
//! this crate's.

/// Which persistence backend to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process map; state lives for the process lifetime.
    Memory,
    /// Shared Redis endpoint.
    Redis { url: String },
}

/// Configuration for [`create_store`](crate::store::create_store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::memory()
    }
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
        }
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Redis { url: url.into() },
        }
    }
}

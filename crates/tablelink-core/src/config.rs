//! Configuration surface consumed by the core.
//!
//! The core never reads configuration on its own beyond the lazy env-backed
//! default table name at the composition root; everything else is injected.

use std::{env, sync::OnceLock, time::Duration};

/// Default shard-bucket count for sharded writes.
pub const DEFAULT_MAX_SHARD: u32 = 100;

/// Sort key assigned alongside an auto-generated primary identifier.
pub const GENERATED_SORT_KEY: &str = "default";

/// Environment variable consulted for the process-wide table name.
pub const TABLE_NAME_ENV: &str = "TABLE_NAME";

///
/// TableConfig
///

#[derive(Clone, Debug)]
pub struct TableConfig {
    /// Table targeted when neither the row nor the entity overrides it.
    pub table_name: String,
    /// Shard-bucket count used for entities that opt into sharding.
    pub max_shard: u32,
    /// Default TTL applied by the cache facade. `None` caches forever.
    pub cache_ttl: Option<Duration>,
}

impl TableConfig {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            max_shard: DEFAULT_MAX_SHARD,
            cache_ttl: None,
        }
    }

    /// Build from the process environment (`TABLE_NAME`).
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(default_table_name())
    }

    #[must_use]
    pub const fn with_max_shard(mut self, max_shard: u32) -> Self {
        self.max_shard = max_shard;
        self
    }

    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }
}

/// Lazily resolved process-wide table name.
///
/// Reads `TABLE_NAME` once; falls back to `"tablelink"` so local tooling
/// works without environment plumbing.
pub fn default_table_name() -> &'static str {
    static NAME: OnceLock<String> = OnceLock::new();
    NAME.get_or_init(|| env::var(TABLE_NAME_ENV).unwrap_or_else(|_| "tablelink".to_string()))
}

///
/// TESTS
///

//! tablelink — single-table link modeling for partition/sort keyed stores.
//!
//! This is the public meta-crate. Downstream users depend on **tablelink**
//! only; it re-exports the stable API from `tablelink-core`.

pub use tablelink_core as core;

pub use tablelink_core::{
    Error,
    batch::{TaskOutcome, batch_apply},
    cache::{CacheBackend, CacheError, CachedTable, MemoryCache, cache_key},
    codec,
    config::{DEFAULT_MAX_SHARD, GENERATED_SORT_KEY, TableConfig, default_table_name},
    entity::{Entity, EntityIdentity},
    key::{EntitySlot, Gsi, KeyError, KeyPair, MAX_GSI, wrap_partition_key},
    link::{DiLink, EntityTuple, Link, LinkCheck, LinkRecord, MonoLink, TriLink},
    message::Message,
    row::Row,
    segment::{self, SegmentError, SegmentLabel},
    store::{AttrValue, Item, StoreClient, StoreError, memory::MemoryStore},
    table::{QueryRecord, Table},
};

/// Crate version of the underlying core.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use tablelink_core::prelude::*;
}

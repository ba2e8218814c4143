//! Single-table modeling core: composite keys, entity identity, link rows,
//! and the row lifecycle over a pluggable partition/sort-key store.
//!
//! Keys are built from labeled `/label(value)` segments ([`segment`]), every
//! stored partition key is wrapped with its entity type ([`key`]), and
//! relationships are ordinary rows whose keys are composed from the linked
//! entities' identities ([`link`]). [`table::Table`] ties it together over
//! the [`store::StoreClient`] boundary.

pub mod batch;
pub mod cache;
pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod key;
pub mod link;
pub mod message;
pub mod row;
pub mod segment;
pub mod store;
pub mod table;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::Error;

pub mod prelude {
    pub use crate::{
        batch::TaskOutcome,
        cache::{CacheBackend, CachedTable, MemoryCache},
        config::TableConfig,
        entity::{Entity, EntityIdentity},
        error::Error,
        key::{EntitySlot, Gsi, KeyPair},
        link::{DiLink, EntityTuple, Link, LinkCheck, MonoLink, TriLink},
        message::Message,
        row::Row,
        store::{StoreClient, memory::MemoryStore},
        table::Table,
    };
}

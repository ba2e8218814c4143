//! Storage engine boundary.
//!
//! Point get/put/delete plus a range query, keyed by
//! `(table, partitionKey, sortKey[, indexName])`. Items are flat string-keyed
//! maps of typed values. Absence is a distinguishable `Ok(None)`, never an
//! error; the row lifecycle re-surfaces it as a typed not-found error.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error as ThisError;

/// A stored item: attribute name to typed value.
pub type Item = HashMap<String, AttrValue>;

///
/// AttrValue
///
/// The engine's attribute representation. Scalars plus the two nesting
/// shapes every mainstream key-value engine supports.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum AttrValue {
    /// String scalar.
    S(String),
    /// Numeric scalar, transported as its decimal text form.
    N(String),
    /// Boolean scalar.
    Bool(bool),
    /// Binary payload.
    B(Vec<u8>),
    /// Explicit null.
    Null,
    /// Ordered list.
    L(Vec<AttrValue>),
    /// Nested map.
    M(HashMap<String, AttrValue>),
}

impl AttrValue {
    pub fn s(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    pub fn n(value: impl ToString) -> Self {
        Self::N(value.to_string())
    }

    /// String payload, if this is a string attribute.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

///
/// StoreError
///
/// Transport-level failures from the engine client. Passed through
/// unmodified; retry/backoff is the client's concern, not this crate's.
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("unknown index: {0}")]
    UnknownIndex(String),

    #[error("storage engine failure: {0}")]
    Transport(String),
}

///
/// QueryRequest
///
/// A single range query: exact match on the partition attribute, optional
/// begins-with condition on the sort attribute, optional type-tag filter,
/// and a pagination cursor.
///

#[derive(Clone, Debug, Default)]
pub struct QueryRequest {
    pub table: String,
    pub index_name: Option<String>,
    /// Attribute name and exact value for the partition condition.
    pub partition: (String, String),
    /// Attribute name and prefix for the sort-key condition.
    pub sort_prefix: Option<(String, String)>,
    /// Restrict results to rows whose type-tag attribute equals this value.
    pub type_filter: Option<String>,
    pub exclusive_start_key: Option<KeyCursor>,
    pub limit: Option<u32>,
}

/// Pagination cursor: the storage key of the last row already returned.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyCursor {
    pub pk: String,
    pub sk: String,
}

///
/// QueryPage
///

#[derive(Clone, Debug, Default)]
pub struct QueryPage {
    pub items: Vec<Item>,
    pub last_evaluated_key: Option<KeyCursor>,
}

///
/// StoreClient
///
/// The point-operation client. Shared, reentrant, and connection-pooling:
/// safe for concurrent use by any number of tasks without locking.
///

#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Point read. `Ok(None)` when no item matches the key.
    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError>;

    /// Write an item, returning the previous item stored under its key.
    async fn put_item(&self, table: &str, item: Item) -> Result<Option<Item>, StoreError>;

    /// Delete by key, returning the previous item if one existed.
    async fn delete_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError>;

    /// Range query against the primary index or a named GSI.
    async fn query(&self, request: QueryRequest) -> Result<QueryPage, StoreError>;
}

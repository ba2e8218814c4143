//! In-process storage engine.
//!
//! Faithful enough for tests and demos: point ops return the previous item,
//! queries emulate GSI access by matching the named key attributes, and
//! pagination follows the sort order of the queried index.

use crate::store::{AttrValue, Item, KeyCursor, QueryPage, QueryRequest, StoreClient, StoreError};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

type TableRows = HashMap<(String, String), Item>;

///
/// MemoryStore
///
/// Tables are created on first write. All state lives behind one mutex;
/// the critical sections never await.
///

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<String, TableRows>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items currently stored in `table`.
    #[must_use]
    pub fn len(&self, table: &str) -> usize {
        self.tables
            .lock()
            .expect("memory store poisoned")
            .get(table)
            .map_or(0, HashMap::len)
    }

    #[must_use]
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    fn storage_key(key: &Item) -> Result<(String, String), StoreError> {
        let pk = key
            .get("pk")
            .and_then(AttrValue::as_s)
            .ok_or_else(|| StoreError::Transport("key is missing pk".to_string()))?;
        let sk = key
            .get("sk")
            .and_then(AttrValue::as_s)
            .ok_or_else(|| StoreError::Transport("key is missing sk".to_string()))?;
        Ok((pk.to_string(), sk.to_string()))
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError> {
        let storage_key = Self::storage_key(&key)?;
        let tables = self.tables.lock().expect("memory store poisoned");
        Ok(tables
            .get(table)
            .and_then(|rows| rows.get(&storage_key))
            .cloned())
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<Option<Item>, StoreError> {
        let storage_key = Self::storage_key(&item)?;
        let mut tables = self.tables.lock().expect("memory store poisoned");
        let rows = tables.entry(table.to_string()).or_default();
        Ok(rows.insert(storage_key, item))
    }

    async fn delete_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError> {
        let storage_key = Self::storage_key(&key)?;
        let mut tables = self.tables.lock().expect("memory store poisoned");
        Ok(tables
            .get_mut(table)
            .and_then(|rows| rows.remove(&storage_key)))
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryPage, StoreError> {
        let (pk_attr, pk_value) = &request.partition;
        let tables = self.tables.lock().expect("memory store poisoned");
        let Some(rows) = tables.get(&request.table) else {
            return Ok(QueryPage::default());
        };

        let sort_attr = request
            .sort_prefix
            .as_ref()
            .map_or("sk", |(attr, _)| attr.as_str());

        let mut matches: Vec<&Item> = rows
            .values()
            .filter(|item| item.get(pk_attr).and_then(AttrValue::as_s) == Some(pk_value))
            .filter(|item| match &request.sort_prefix {
                Some((attr, prefix)) => item
                    .get(attr)
                    .and_then(AttrValue::as_s)
                    .is_some_and(|sk| sk.starts_with(prefix.as_str())),
                None => true,
            })
            .filter(|item| match &request.type_filter {
                Some(expected) => {
                    item.get("type").and_then(AttrValue::as_s) == Some(expected.as_str())
                }
                None => true,
            })
            .collect();

        matches.sort_by_key(|item| {
            item.get(sort_attr)
                .and_then(AttrValue::as_s)
                .unwrap_or_default()
                .to_string()
        });

        // Resume after the cursor row, matching on the primary storage key.
        let start = match &request.exclusive_start_key {
            Some(cursor) => matches
                .iter()
                .position(|item| {
                    item.get("pk").and_then(AttrValue::as_s) == Some(cursor.pk.as_str())
                        && item.get("sk").and_then(AttrValue::as_s) == Some(cursor.sk.as_str())
                })
                .map_or(0, |pos| pos + 1),
            None => 0,
        };
        let remaining = &matches[start.min(matches.len())..];

        let limit = request.limit.map_or(remaining.len(), |n| n as usize);
        let page: Vec<Item> = remaining.iter().take(limit).map(|item| (*item).clone()).collect();

        let last_evaluated_key = if page.len() < remaining.len() {
            page.last().and_then(|item| {
                Some(KeyCursor {
                    pk: item.get("pk")?.as_s()?.to_string(),
                    sk: item.get("sk")?.as_s()?.to_string(),
                })
            })
        } else {
            None
        };

        Ok(QueryPage {
            items: page,
            last_evaluated_key,
        })
    }
}

///
/// TESTS
///

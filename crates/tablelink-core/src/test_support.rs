//! Fixtures shared by the in-crate tests.

use crate::{
    config::TableConfig,
    entity::{Entity, EntityIdentity},
    key::{Gsi, KeyError, KeyPair},
    store::memory::MemoryStore,
    table::Table,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A table over a fresh in-memory store.
pub fn test_table() -> Table {
    Table::new(Arc::new(MemoryStore::new()), TableConfig::new("test-table"))
}

///
/// User
///
/// Fixed sort key, plus an email lookup on gsi 1.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    table: Option<String>,
    #[serde(skip)]
    gsi1_broken: bool,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn in_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Make gsi 1 answer with a partition key but no sort key.
    pub fn break_gsi1_sort_key(&mut self) {
        self.gsi1_broken = true;
    }
}

impl EntityIdentity for User {
    fn entity_type(&self) -> &str {
        "user"
    }

    fn keys(&self, index: Gsi) -> Result<KeyPair, KeyError> {
        Ok(match index.index() {
            0 => KeyPair::new(self.id.clone(), "info"),
            1 => {
                let sk = if self.gsi1_broken { "" } else { "user" };
                KeyPair::new(self.email.clone(), sk)
            }
            _ => KeyPair::default(),
        })
    }

    fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }
}

impl Entity for User {}

///
/// Car
///
/// Model year as the sort key.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Car {
    pub id: String,
    pub year: String,
}

impl Car {
    pub fn new(id: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            year: year.into(),
        }
    }
}

impl EntityIdentity for Car {
    fn entity_type(&self) -> &str {
        "car"
    }

    fn keys(&self, index: Gsi) -> Result<KeyPair, KeyError> {
        Ok(if index.is_primary() {
            KeyPair::new(self.id.clone(), self.year.clone())
        } else {
            KeyPair::default()
        })
    }
}

impl Entity for Car {}

///
/// Event
///
/// Opts into shard-bucket writes.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Event {
    pub id: String,
    pub day: String,
}

impl Event {
    pub fn new(id: impl Into<String>, day: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            day: day.into(),
        }
    }
}

impl EntityIdentity for Event {
    fn entity_type(&self) -> &str {
        "event"
    }

    fn keys(&self, index: Gsi) -> Result<KeyPair, KeyError> {
        Ok(if index.is_primary() {
            KeyPair::new(self.id.clone(), self.day.clone())
        } else {
            KeyPair::default()
        })
    }

    fn sharded(&self) -> bool {
        true
    }
}

impl Entity for Event {}

///
/// Draft
///
/// Starts without an identifier and accepts the generated one.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Draft {
    pub id: String,
    pub sk: String,
    pub note: String,
}

impl Draft {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sk: "info".to_string(),
            note: String::new(),
        }
    }
}

impl EntityIdentity for Draft {
    fn entity_type(&self) -> &str {
        "draft"
    }

    fn keys(&self, index: Gsi) -> Result<KeyPair, KeyError> {
        Ok(if index.is_primary() {
            KeyPair::new(self.id.clone(), self.sk.clone())
        } else {
            KeyPair::default()
        })
    }

    fn assign_generated_key(&mut self, key: KeyPair) {
        self.id = key.pk;
        self.sk = key.sk;
    }
}

impl Entity for Draft {}

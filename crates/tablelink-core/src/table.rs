//! Row lifecycle and reverse lookup against one physical table.
//!
//! `Table` is the composition root: the storage client and configuration
//! are injected, never pulled from process-wide singletons. It is cheap to
//! clone and safe to share across tasks; the only mutable state is the
//! issued-query log behind a mutex.

use crate::{
    codec,
    config::TableConfig,
    entity::{Entity, EntityIdentity},
    error::Error,
    key::{EntitySlot, Gsi, KeyPair, wrap_partition_key},
    row::Row,
    segment::{self, SegmentLabel},
    store::{AttrValue, Item, KeyCursor, QueryRequest, StoreClient},
};
use rand::Rng;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Attribute carrying the type discriminator on every stored row.
pub const TYPE_ATTRIBUTE: &str = "type";

/// Attribute carrying the random shard bucket on sharded writes.
pub const SHARD_ATTRIBUTE: &str = "shard";

///
/// QueryRecord
///
/// One issued reverse-lookup query, kept for pagination bookkeeping.
///

#[derive(Clone, Debug)]
pub struct QueryRecord {
    pub index_name: String,
    pub partition: String,
    pub last_evaluated_key: Option<KeyCursor>,
}

///
/// Table
///

#[derive(Clone)]
pub struct Table {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn StoreClient>,
    config: TableConfig,
    issued: Mutex<Vec<QueryRecord>>,
}

impl Table {
    pub fn new(client: Arc<dyn StoreClient>, config: TableConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                config,
                issued: Mutex::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TableConfig {
        &self.inner.config
    }

    /// Snapshot of every reverse-lookup query issued through this handle.
    #[must_use]
    pub fn issued_queries(&self) -> Vec<QueryRecord> {
        self.inner
            .issued
            .lock()
            .expect("query log poisoned")
            .clone()
    }

    /// Point read into the row's object.
    ///
    /// Absence fails with `EntityNotFound`; a found row must carry a
    /// matching type tag. The raw attribute image is retained on the row.
    pub async fn get<T: Entity>(&self, row: &mut Row<T>) -> Result<(), Error> {
        let table = row.table_name(&self.inner.config).to_string();
        let expected = row.object().entity_type().to_string();
        let wrapped = self.wrapped_primary(row.object())?;

        let item = self.point_read(&table, &expected, &wrapped).await?;
        debug!(entity_type = %expected, table = %table, "row fetched");

        row.object_mut().unmarshal_item(&item)?;
        row.set_read_image(item);
        Ok(())
    }

    /// Write the row, returning the previously stored object if any.
    pub async fn put<T: Entity>(&self, row: &mut Row<T>) -> Result<Option<T>, Error> {
        let table = row.table_name(&self.inner.config).to_string();
        let keys = row.materialize_keys()?;
        let entity_type = row.object().entity_type().to_string();

        let mut item = row.object().marshal_item()?;
        item.insert("pk".to_string(), AttrValue::s(&keys.wrapped_primary.pk));
        item.insert("sk".to_string(), AttrValue::s(&keys.wrapped_primary.sk));
        for (gsi, pair) in &keys.auxiliary {
            let (pk_attr, sk_attr) = gsi.attribute_names();
            item.insert(pk_attr, AttrValue::s(&pair.pk));
            item.insert(sk_attr, AttrValue::s(&pair.sk));
        }
        item.insert(TYPE_ATTRIBUTE.to_string(), AttrValue::s(&entity_type));
        if row.object().sharded() && self.inner.config.max_shard > 0 {
            let bucket = rand::rng().random_range(0..self.inner.config.max_shard);
            item.insert(SHARD_ATTRIBUTE.to_string(), AttrValue::n(bucket));
        }

        let old = self.inner.client.put_item(&table, item).await?;
        debug!(
            entity_type = %entity_type,
            table = %table,
            pk = %keys.raw_primary.pk,
            replaced = old.is_some(),
            "row written"
        );

        let previous = old.as_ref().map(codec::from_item).transpose()?;
        row.set_old_image(old);
        Ok(previous)
    }

    /// Delete the row, returning the previously stored object if any.
    pub async fn delete<T: Entity>(&self, row: &mut Row<T>) -> Result<Option<T>, Error> {
        let table = row.table_name(&self.inner.config).to_string();
        let entity_type = row.object().entity_type().to_string();
        let wrapped = self.wrapped_primary(row.object())?;

        let old = self
            .inner
            .client
            .delete_item(&table, key_item(&wrapped))
            .await?;
        debug!(entity_type = %entity_type, table = %table, existed = old.is_some(), "row deleted");

        let previous = old.as_ref().map(codec::from_item).transpose()?;
        row.set_old_image(old);
        Ok(previous)
    }

    /// Point read directly into an entity, without image capture.
    pub async fn get_entity<T: Entity>(&self, entity: &mut T) -> Result<(), Error> {
        let table = entity
            .table_name()
            .unwrap_or(&self.inner.config.table_name)
            .to_string();
        let expected = entity.entity_type().to_string();
        let wrapped = self.wrapped_primary(entity)?;

        let item = self.point_read(&table, &expected, &wrapped).await?;
        entity.unmarshal_item(&item)?;
        Ok(())
    }

    /// All links of `link_type` referencing `entity` through `slot`.
    ///
    /// Queries the slot's dedicated GSI with the entity's row-wrapper
    /// pointer, draining every page. No matching rows is an empty result,
    /// not an error. Rows whose type tag fails validation are skipped.
    pub async fn find_links<E, L>(
        &self,
        entity: &E,
        slot: EntitySlot,
        link_type: &str,
    ) -> Result<Vec<L>, Error>
    where
        E: EntityIdentity + ?Sized,
        L: Entity,
    {
        let raw = entity.keys(Gsi::PRIMARY)?;
        let pointer_pk = wrap_partition_key(entity.entity_type(), &raw.pk)?;
        let table = entity
            .table_name()
            .unwrap_or(&self.inner.config.table_name)
            .to_string();

        let mut links = Vec::new();
        let mut cursor: Option<KeyCursor> = None;
        loop {
            let page = self
                .inner
                .client
                .query(QueryRequest {
                    table: table.clone(),
                    index_name: Some(slot.index_name().to_string()),
                    partition: (slot.pk_attribute().to_string(), pointer_pk.clone()),
                    sort_prefix: Some((slot.sk_attribute().to_string(), raw.sk.clone())),
                    type_filter: Some(link_type.to_string()),
                    exclusive_start_key: cursor.clone(),
                    limit: None,
                })
                .await?;

            self.record_query(QueryRecord {
                index_name: slot.index_name().to_string(),
                partition: pointer_pk.clone(),
                last_evaluated_key: page.last_evaluated_key.clone(),
            });

            for item in &page.items {
                if let Err(err) = validate_type_tag(item, link_type) {
                    warn!(link_type = %link_type, %err, "skipping link row with foreign type tag");
                    continue;
                }
                links.push(codec::from_item(item)?);
            }

            match page.last_evaluated_key {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(link_type = %link_type, slot = %slot, count = links.len(), "reverse lookup complete");
        Ok(links)
    }

    /// Point read at an already-wrapped storage key, with type validation.
    pub(crate) async fn point_read(
        &self,
        table: &str,
        expected_type: &str,
        wrapped: &KeyPair,
    ) -> Result<Item, Error> {
        let item = self
            .inner
            .client
            .get_item(table, key_item(wrapped))
            .await?;

        let Some(item) = item else {
            let raw_pk = segment::decode(SegmentLabel::RowPk, &wrapped.pk)
                .unwrap_or(&wrapped.pk)
                .to_string();
            return Err(Error::EntityNotFound {
                entity_type: expected_type.to_string(),
                pk: raw_pk,
                sk: wrapped.sk.clone(),
            });
        };

        validate_type_tag(&item, expected_type)?;
        Ok(item)
    }

    fn wrapped_primary<E: EntityIdentity + ?Sized>(&self, entity: &E) -> Result<KeyPair, Error> {
        let raw = entity.keys(Gsi::PRIMARY)?;
        let entity_type = entity.entity_type().to_string();
        if raw.pk.is_empty() {
            return Err(Error::PartitionKeyRequired {
                index: 0,
                entity_type,
            });
        }
        if raw.sk.is_empty() {
            return Err(Error::SortKeyRequired {
                index: 0,
                entity_type,
            });
        }
        Ok(KeyPair::new(
            wrap_partition_key(&entity_type, &raw.pk)?,
            raw.sk,
        ))
    }

    fn record_query(&self, record: QueryRecord) {
        self.inner
            .issued
            .lock()
            .expect("query log poisoned")
            .push(record);
    }
}

/// Validate the type-tag attribute on a found row.
pub(crate) fn validate_type_tag(item: &Item, expected: &str) -> Result<(), Error> {
    let found = item
        .get(TYPE_ATTRIBUTE)
        .and_then(AttrValue::as_s)
        .unwrap_or_default();
    if found == expected {
        Ok(())
    } else {
        Err(Error::LinkTypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

/// Build the two-attribute key item for a point operation.
pub(crate) fn key_item(key: &KeyPair) -> Item {
    Item::from([
        ("pk".to_string(), AttrValue::s(&key.pk)),
        ("sk".to_string(), AttrValue::s(&key.sk)),
    ])
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::memory::MemoryStore,
        test_support::{Draft, Event, User, test_table},
    };

    async fn stored_item(store: &MemoryStore, table: &str, wrapped: &KeyPair) -> Item {
        store
            .get_item(table, key_item(wrapped))
            .await
            .unwrap()
            .expect("item stored")
    }

    #[tokio::test]
    async fn get_on_missing_row_is_entity_not_found() {
        let table = test_table();
        let mut row = Row::new(User::new("ghost", "ghost@example.com"));

        let err = table.get(&mut row).await.unwrap_err();
        assert!(err.is_not_found());
        match err {
            Error::EntityNotFound { entity_type, pk, sk } => {
                assert_eq!(entity_type, "user");
                assert_eq!(pk, "ghost");
                assert_eq!(sk, "info");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let table = test_table();
        let mut row = Row::new(User::new("u1", "u1@example.com"));
        assert!(table.put(&mut row).await.unwrap().is_none());

        let mut fetched = Row::new(User::new("u1", ""));
        table.get(&mut fetched).await.unwrap();
        assert_eq!(fetched.object().email, "u1@example.com");
        assert!(fetched.read_image().is_some());
    }

    #[tokio::test]
    async fn put_exposes_the_previous_value() {
        let table = test_table();
        let mut row = Row::new(User::new("u1", "old@example.com"));
        table.put(&mut row).await.unwrap();

        let mut updated = Row::new(User::new("u1", "new@example.com"));
        let previous = table.put(&mut updated).await.unwrap().expect("old value");
        assert_eq!(previous.email, "old@example.com");
        assert!(updated.old_image().is_some());
    }

    #[tokio::test]
    async fn delete_returns_the_removed_object() {
        let table = test_table();
        let mut row = Row::new(User::new("u1", "u1@example.com"));
        table.put(&mut row).await.unwrap();

        let removed = table.delete(&mut row).await.unwrap().expect("removed");
        assert_eq!(removed.id, "u1");

        let mut gone = Row::new(User::new("u1", ""));
        assert!(table.get(&mut gone).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn same_raw_keys_different_types_never_collide() {
        let table = test_table();
        // A user and a "draft" sharing raw pk/sk must land on distinct
        // storage keys thanks to the row wrapper.
        let mut user = Row::new(User::new("shared", "user@example.com"));
        table.put(&mut user).await.unwrap();

        let mut draft = Row::new(Draft::with_id("shared"));
        table.put(&mut draft).await.unwrap();

        let mut fetched = Row::new(User::new("shared", ""));
        table.get(&mut fetched).await.unwrap();
        assert_eq!(fetched.object().email, "user@example.com");
    }

    #[tokio::test]
    async fn sharded_writes_carry_a_bucket_within_the_configured_range() {
        let store = Arc::new(MemoryStore::new());
        let config = TableConfig::new("test-table").with_max_shard(4);
        let table = Table::new(store.clone(), config);

        table
            .put(&mut Row::new(Event::new("e1", "2026-08-23")))
            .await
            .unwrap();

        let wrapped = KeyPair::new("/rowType(event)/rowPk(e1)", "2026-08-23");
        let item = stored_item(&store, "test-table", &wrapped).await;
        let Some(AttrValue::N(bucket)) = item.get(SHARD_ATTRIBUTE) else {
            panic!("shard attribute missing");
        };
        assert!(bucket.parse::<u32>().unwrap() < 4);
    }

    #[tokio::test]
    async fn zero_shard_count_and_unsharded_entities_skip_the_bucket() {
        let store = Arc::new(MemoryStore::new());
        let config = TableConfig::new("test-table").with_max_shard(0);
        let table = Table::new(store.clone(), config);

        table
            .put(&mut Row::new(Event::new("e1", "2026-08-23")))
            .await
            .unwrap();
        let wrapped = KeyPair::new("/rowType(event)/rowPk(e1)", "2026-08-23");
        let item = stored_item(&store, "test-table", &wrapped).await;
        assert!(item.get(SHARD_ATTRIBUTE).is_none());

        // Entities that never opt in stay shard-free at any count.
        let store = Arc::new(MemoryStore::new());
        let table = Table::new(store.clone(), TableConfig::new("test-table"));
        table
            .put(&mut Row::new(User::new("u1", "u1@example.com")))
            .await
            .unwrap();
        let wrapped = KeyPair::new("/rowType(user)/rowPk(u1)", "info");
        let item = stored_item(&store, "test-table", &wrapped).await;
        assert!(item.get(SHARD_ATTRIBUTE).is_none());
    }

    #[tokio::test]
    async fn type_tag_mismatch_is_surfaced() {
        let item = Item::from([(TYPE_ATTRIBUTE.to_string(), AttrValue::s("car"))]);
        assert!(matches!(
            validate_type_tag(&item, "user"),
            Err(Error::LinkTypeMismatch { .. })
        ));
        assert!(validate_type_tag(&item, "car").is_ok());
    }
}

//! The lifecycle wrapper around a storable object.
//!
//! `Row` carries the object together with the raw attribute images captured
//! by the last read and the last mutating write. The images are ordinary
//! fields, always present on the wrapper, so callers can diff old and new
//! state without any runtime field discovery.

use crate::{
    config::{GENERATED_SORT_KEY, TableConfig},
    entity::Entity,
    error::Error,
    key::{Gsi, KeyPair, wrap_partition_key},
    store::Item,
};
use ulid::Ulid;

///
/// Row
///

#[derive(Debug)]
pub struct Row<T: Entity> {
    object: T,
    table_override: Option<String>,
    read_image: Option<Item>,
    old_image: Option<Item>,
}

impl<T: Entity> Row<T> {
    pub fn new(object: T) -> Self {
        Self {
            object,
            table_override: None,
            read_image: None,
            old_image: None,
        }
    }

    /// Route this row to a specific table, overriding both the entity's
    /// override and the configured default.
    #[must_use]
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_override = Some(table_name.into());
        self
    }

    #[must_use]
    pub const fn object(&self) -> &T {
        &self.object
    }

    pub const fn object_mut(&mut self) -> &mut T {
        &mut self.object
    }

    #[must_use]
    pub fn into_object(self) -> T {
        self.object
    }

    /// Raw attributes returned by the last successful point read.
    #[must_use]
    pub const fn read_image(&self) -> Option<&Item> {
        self.read_image.as_ref()
    }

    /// Raw previous attributes returned by the last put or delete.
    #[must_use]
    pub const fn old_image(&self) -> Option<&Item> {
        self.old_image.as_ref()
    }

    pub(crate) fn set_read_image(&mut self, image: Item) {
        self.read_image = Some(image);
    }

    pub(crate) fn set_old_image(&mut self, image: Option<Item>) {
        self.old_image = image;
    }

    /// Table precedence: row override, then entity override, then config.
    pub(crate) fn table_name<'a>(&'a self, config: &'a TableConfig) -> &'a str {
        self.table_override
            .as_deref()
            .or_else(|| self.object.table_name())
            .unwrap_or(&config.table_name)
    }

    /// Materialize every index key for a write.
    ///
    /// The primary pair is row-wrapped; auxiliary pairs are written raw.
    /// A vacant primary pair triggers the auto-identifier fallback, which
    /// is persisted back onto the object. Partial auxiliary pairs fail
    /// before any I/O happens.
    pub(crate) fn materialize_keys(&mut self) -> Result<MaterializedKeys, Error> {
        let mut primary = self.object.keys(Gsi::PRIMARY)?;
        if primary.is_vacant() {
            primary = KeyPair::new(Ulid::new().to_string(), GENERATED_SORT_KEY);
            self.object.assign_generated_key(primary.clone());
        }

        let entity_type = self.object.entity_type().to_string();
        if primary.pk.is_empty() {
            return Err(Error::PartitionKeyRequired {
                index: 0,
                entity_type,
            });
        }
        if primary.sk.is_empty() {
            return Err(Error::SortKeyRequired {
                index: 0,
                entity_type,
            });
        }

        let wrapped = KeyPair::new(
            wrap_partition_key(&entity_type, &primary.pk)?,
            primary.sk.clone(),
        );

        let mut auxiliary = Vec::new();
        for gsi in Gsi::all().skip(1) {
            let pair = self.object.keys(gsi)?;
            if pair.is_vacant() {
                continue;
            }
            if pair.pk.is_empty() {
                return Err(Error::PartitionKeyRequired {
                    index: gsi.index(),
                    entity_type,
                });
            }
            if pair.sk.is_empty() {
                return Err(Error::SortKeyRequired {
                    index: gsi.index(),
                    entity_type,
                });
            }
            auxiliary.push((gsi, pair));
        }

        Ok(MaterializedKeys {
            raw_primary: primary,
            wrapped_primary: wrapped,
            auxiliary,
        })
    }
}

///
/// MaterializedKeys
///
/// Every key attribute a write will carry.
///

#[derive(Debug)]
pub(crate) struct MaterializedKeys {
    pub raw_primary: KeyPair,
    pub wrapped_primary: KeyPair,
    pub auxiliary: Vec<(Gsi, KeyPair)>,
}

///
/// TESTS
///

//! Link rows: relationships stored as ordinary rows in the same table.
//!
//! A link references one to three entities. Its primary key is composed
//! from the referenced identities (type + raw pk segments in the partition
//! key, raw sk segments in the sort key), so composing the same entities
//! always lands on the same storage key: writes are idempotent and two
//! different entity sets can never collide.
//!
//! Each referenced entity additionally gets a pointer pair (`e{n}pk`,
//! `e{n}sk`) projected into its slot's dedicated GSI, which is what makes
//! reverse lookup possible without touching the link's composite key.

use crate::{
    codec,
    entity::{Entity, EntityIdentity},
    error::Error,
    key::{EntitySlot, Gsi, KeyError, KeyPair, wrap_partition_key},
    segment::{self, SegmentLabel},
    table::Table,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A link referencing a single entity.
pub type MonoLink<E0> = Link<(Option<E0>,)>;

/// A link relating two entities.
pub type DiLink<E0, E1> = Link<(Option<E0>, Option<E1>)>;

/// A link relating three entities.
pub type TriLink<E0, E1, E2> = Link<(Option<E0>, Option<E1>, Option<E2>)>;

///
/// LinkRecord
///
/// The stored shape of a link row: the composed primary pair, the per-slot
/// pointer pairs, and the link-type discriminator. This is what serde sees;
/// the live entity references never leave the process.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct LinkRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pk: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sk: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub e0pk: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub e0sk: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub e1pk: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub e1sk: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub e2pk: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub e2sk: String,

    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub link_type: String,
}

impl LinkRecord {
    fn slot_pointer(&self, slot: EntitySlot) -> (&str, &str) {
        match slot {
            EntitySlot::Entity0 => (&self.e0pk, &self.e0sk),
            EntitySlot::Entity1 => (&self.e1pk, &self.e1sk),
            EntitySlot::Entity2 => (&self.e2pk, &self.e2sk),
        }
    }

    fn set_slot_pointer(&mut self, slot: EntitySlot, pointer: KeyPair) {
        let (pk, sk) = match slot {
            EntitySlot::Entity0 => (&mut self.e0pk, &mut self.e0sk),
            EntitySlot::Entity1 => (&mut self.e1pk, &mut self.e1sk),
            EntitySlot::Entity2 => (&mut self.e2pk, &mut self.e2sk),
        };
        *pk = pointer.pk;
        *sk = pointer.sk;
    }
}

///
/// EntityTuple
///
/// The slot layout of a link: how many entities it references and how to
/// view each occupied slot as an identity. Implemented for option tuples of
/// one, two, and three entities.
///

pub trait EntityTuple: Send + Sync {
    const ARITY: usize;

    /// All slots unoccupied, the state after deserializing a stored row.
    fn vacant() -> Self;

    /// Identity view of the entity in `slot`, when present.
    fn identity(&self, slot: usize) -> Option<&dyn EntityIdentity>;
}

impl<E0: Entity> EntityTuple for (Option<E0>,) {
    const ARITY: usize = 1;

    fn vacant() -> Self {
        (None,)
    }

    fn identity(&self, slot: usize) -> Option<&dyn EntityIdentity> {
        match slot {
            0 => self.0.as_ref().map(|e| e as &dyn EntityIdentity),
            _ => None,
        }
    }
}

impl<E0: Entity, E1: Entity> EntityTuple for (Option<E0>, Option<E1>) {
    const ARITY: usize = 2;

    fn vacant() -> Self {
        (None, None)
    }

    fn identity(&self, slot: usize) -> Option<&dyn EntityIdentity> {
        match slot {
            0 => self.0.as_ref().map(|e| e as &dyn EntityIdentity),
            1 => self.1.as_ref().map(|e| e as &dyn EntityIdentity),
            _ => None,
        }
    }
}

impl<E0: Entity, E1: Entity, E2: Entity> EntityTuple for (Option<E0>, Option<E1>, Option<E2>) {
    const ARITY: usize = 3;

    fn vacant() -> Self {
        (None, None, None)
    }

    fn identity(&self, slot: usize) -> Option<&dyn EntityIdentity> {
        match slot {
            0 => self.0.as_ref().map(|e| e as &dyn EntityIdentity),
            1 => self.1.as_ref().map(|e| e as &dyn EntityIdentity),
            2 => self.2.as_ref().map(|e| e as &dyn EntityIdentity),
            _ => None,
        }
    }
}

/// Default type discriminator per arity.
const fn default_link_type(arity: usize) -> &'static str {
    match arity {
        1 => "monolink",
        2 => "dilink",
        _ => "trilink",
    }
}

///
/// LinkCheck
///
/// Outcome of a relationship check: the two referenced entities can exist
/// without the link row, and a missing entity is distinct from both.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkCheck {
    /// Both entities exist and the link row is present.
    Linked,
    /// Both entities exist but no link row relates them.
    Unlinked,
    /// A referenced entity is itself absent from the table.
    MissingEntity { slot: usize },
}

///
/// Link
///

pub struct Link<T: EntityTuple> {
    entities: T,
    record: LinkRecord,
    table_override: Option<String>,
}

/// Resolved identity of one slot: type discriminator plus raw key pair.
struct SlotSource {
    entity_type: String,
    pk: String,
    sk: String,
}

impl<T: EntityTuple> Link<T> {
    fn from_entities(entities: T) -> Self {
        Self {
            entities,
            record: LinkRecord {
                link_type: default_link_type(T::ARITY).to_string(),
                ..LinkRecord::default()
            },
            table_override: None,
        }
    }

    /// Override the type discriminator, allowing several distinct
    /// relationships between the same entity types.
    #[must_use]
    pub fn with_link_type(mut self, link_type: impl Into<String>) -> Self {
        self.record.link_type = link_type.into();
        self
    }

    /// Route this link to a specific table.
    #[must_use]
    pub fn in_table(mut self, table_name: impl Into<String>) -> Self {
        self.table_override = Some(table_name.into());
        self
    }

    #[must_use]
    pub const fn record(&self) -> &LinkRecord {
        &self.record
    }

    /// Compose the primary pair and slot pointers into the stored record.
    ///
    /// Composition is deterministic, so recomposing the same entities is a
    /// no-op. Serialization composes on the fly; calling this explicitly is
    /// only needed to inspect the record before a write.
    pub fn compose(&mut self) -> Result<(), Error> {
        self.record = self.composed_record()?;
        Ok(())
    }

    /// The pointer pair written into `slot`'s GSI.
    pub fn entity_keys(&self, slot: EntitySlot) -> Result<KeyPair, Error> {
        let source = self.slot_source(slot)?;
        Ok(KeyPair::new(
            wrap_partition_key(&source.entity_type, &source.pk)?,
            source.sk,
        ))
    }

    /// Resolve one slot's identity, in falling priority:
    /// a live entity reference, the stored pointer pair, and finally the
    /// slot's segments inside the stored primary pair.
    fn slot_source(&self, slot: EntitySlot) -> Result<SlotSource, Error> {
        let index = slot.index();

        if let Some(identity) = self.entities.identity(index) {
            let raw = identity.keys(Gsi::PRIMARY)?;
            if !raw.is_vacant() {
                let entity_type = identity.entity_type().to_string();
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
                return Ok(SlotSource {
                    entity_type,
                    pk: raw.pk,
                    sk: raw.sk,
                });
            }
        }

        let (pointer_pk, pointer_sk) = self.record.slot_pointer(slot);
        if !pointer_pk.is_empty() && !pointer_sk.is_empty() {
            // The pointer partition key is the entity's row wrapper, so the
            // type and raw pk are recoverable from it directly.
            if let (Some(entity_type), Some(pk)) = (
                segment::decode(SegmentLabel::RowType, pointer_pk),
                segment::decode(SegmentLabel::RowPk, pointer_pk),
            ) {
                return Ok(SlotSource {
                    entity_type: entity_type.to_string(),
                    pk: pk.to_string(),
                    sk: pointer_sk.to_string(),
                });
            }
        }

        if let (Some(entity_type), Some(pk), Some(sk)) = (
            segment::decode(slot.type_label(), &self.record.pk),
            segment::decode(slot.pk_label(), &self.record.pk),
            segment::decode(slot.sk_label(), &self.record.sk),
        ) {
            return Ok(SlotSource {
                entity_type: entity_type.to_string(),
                pk: pk.to_string(),
                sk: sk.to_string(),
            });
        }

        Err(Error::VacantEntitySlot { slot: index })
    }

    /// Pure composition: record with composite pair and pointers filled in.
    fn composed_record(&self) -> Result<LinkRecord, Error> {
        let mut record = self.record.clone();
        let mut pk = String::new();
        let mut sk = String::new();

        for slot in EntitySlot::ALL.into_iter().take(T::ARITY) {
            let source = self.slot_source(slot)?;
            pk.push_str(&segment::encode(slot.type_label(), &source.entity_type)?);
            pk.push_str(&segment::encode(slot.pk_label(), &source.pk)?);
            sk.push_str(&segment::encode(slot.sk_label(), &source.sk)?);

            record.set_slot_pointer(
                slot,
                KeyPair::new(
                    wrap_partition_key(&source.entity_type, &source.pk)?,
                    source.sk,
                ),
            );
        }

        record.pk = pk;
        record.sk = sk;
        Ok(record)
    }

    fn resolve_table<'a>(&'a self, table: &'a Table) -> &'a str {
        self.table_override
            .as_deref()
            .unwrap_or(&table.config().table_name)
    }

    /// Load the entity referenced by `slot` into its tuple position,
    /// writing through `apply`. `Ok(false)` means the referenced row no
    /// longer exists; callers skip and continue.
    async fn load_slot<E, F>(&mut self, table: &Table, slot: EntitySlot, apply: F) -> Result<bool, Error>
    where
        E: Entity,
        F: FnOnce(&mut T, E),
    {
        let source = self.slot_source(slot)?;
        let table_name = self.resolve_table(table).to_string();
        let wrapped = KeyPair::new(
            wrap_partition_key(&source.entity_type, &source.pk)?,
            source.sk.clone(),
        );

        match table
            .point_read(&table_name, &source.entity_type, &wrapped)
            .await
        {
            Ok(item) => {
                apply(&mut self.entities, codec::from_item(&item)?);
                Ok(true)
            }
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Fetch this link's stored row into the record.
    ///
    /// Absence is `LinkNotFound`: the relationship does not exist, which is
    /// distinct from a referenced entity being absent (see [`LinkCheck`]).
    pub async fn load(&mut self, table: &Table) -> Result<(), Error> {
        let composed = self.composed_record()?;
        let expected = self.entity_type().to_string();
        let table_name = self.resolve_table(table).to_string();
        let wrapped = KeyPair::new(wrap_partition_key(&expected, &composed.pk)?, composed.sk);

        match table.point_read(&table_name, &expected, &wrapped).await {
            Ok(item) => {
                self.record = codec::from_item(&item)?;
                Ok(())
            }
            Err(Error::EntityNotFound { .. }) => Err(Error::LinkNotFound),
            Err(err) => Err(err),
        }
    }

    /// True when the entity referenced by `slot` currently exists.
    async fn slot_entity_exists(&self, table: &Table, slot: EntitySlot) -> Result<bool, Error> {
        let source = self.slot_source(slot)?;
        let wrapped = KeyPair::new(
            wrap_partition_key(&source.entity_type, &source.pk)?,
            source.sk.clone(),
        );
        match table
            .point_read(self.resolve_table(table), &source.entity_type, &wrapped)
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// True when the link row itself is stored.
    async fn row_exists(&self, table: &Table) -> Result<bool, Error> {
        let composed = self.composed_record()?;
        let wrapped = KeyPair::new(
            wrap_partition_key(self.entity_type(), &composed.pk)?,
            composed.sk,
        );
        match table
            .point_read(self.resolve_table(table), self.entity_type(), &wrapped)
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl<E0: Entity> MonoLink<E0> {
    pub fn new(entity0: E0) -> Self {
        Self::from_entities((Some(entity0),))
    }

    #[must_use]
    pub const fn entity0(&self) -> Option<&E0> {
        self.entities.0.as_ref()
    }

    pub async fn load_entity0(&mut self, table: &Table) -> Result<bool, Error> {
        self.load_slot(table, EntitySlot::Entity0, |t, e| t.0 = Some(e))
            .await
    }

    /// Load every referenced entity, skipping ones that no longer exist.
    /// Returns how many were loaded.
    pub async fn load_entities(&mut self, table: &Table) -> Result<usize, Error> {
        Ok(usize::from(self.load_entity0(table).await?))
    }
}

impl<E0: Entity, E1: Entity> DiLink<E0, E1> {
    pub fn new(entity0: E0, entity1: E1) -> Self {
        Self::from_entities((Some(entity0), Some(entity1)))
    }

    #[must_use]
    pub const fn entity0(&self) -> Option<&E0> {
        self.entities.0.as_ref()
    }

    #[must_use]
    pub const fn entity1(&self) -> Option<&E1> {
        self.entities.1.as_ref()
    }

    pub async fn load_entity0(&mut self, table: &Table) -> Result<bool, Error> {
        self.load_slot(table, EntitySlot::Entity0, |t, e| t.0 = Some(e))
            .await
    }

    pub async fn load_entity1(&mut self, table: &Table) -> Result<bool, Error> {
        self.load_slot(table, EntitySlot::Entity1, |t, e| t.1 = Some(e))
            .await
    }

    /// Load every referenced entity, skipping ones that no longer exist.
    /// Returns how many were loaded.
    pub async fn load_entities(&mut self, table: &Table) -> Result<usize, Error> {
        let mut loaded = 0;
        loaded += usize::from(self.load_entity0(table).await?);
        loaded += usize::from(self.load_entity1(table).await?);
        Ok(loaded)
    }

    /// Check whether the relationship holds between two existing entities.
    pub async fn check(&self, table: &Table) -> Result<LinkCheck, Error> {
        for slot in [EntitySlot::Entity0, EntitySlot::Entity1] {
            if !self.slot_entity_exists(table, slot).await? {
                return Ok(LinkCheck::MissingEntity { slot: slot.index() });
            }
        }
        if self.row_exists(table).await? {
            Ok(LinkCheck::Linked)
        } else {
            Ok(LinkCheck::Unlinked)
        }
    }
}

impl<E0: Entity, E1: Entity, E2: Entity> TriLink<E0, E1, E2> {
    pub fn new(entity0: E0, entity1: E1, entity2: E2) -> Self {
        Self::from_entities((Some(entity0), Some(entity1), Some(entity2)))
    }

    #[must_use]
    pub const fn entity0(&self) -> Option<&E0> {
        self.entities.0.as_ref()
    }

    #[must_use]
    pub const fn entity1(&self) -> Option<&E1> {
        self.entities.1.as_ref()
    }

    #[must_use]
    pub const fn entity2(&self) -> Option<&E2> {
        self.entities.2.as_ref()
    }

    pub async fn load_entity0(&mut self, table: &Table) -> Result<bool, Error> {
        self.load_slot(table, EntitySlot::Entity0, |t, e| t.0 = Some(e))
            .await
    }

    pub async fn load_entity1(&mut self, table: &Table) -> Result<bool, Error> {
        self.load_slot(table, EntitySlot::Entity1, |t, e| t.1 = Some(e))
            .await
    }

    pub async fn load_entity2(&mut self, table: &Table) -> Result<bool, Error> {
        self.load_slot(table, EntitySlot::Entity2, |t, e| t.2 = Some(e))
            .await
    }

    /// Load every referenced entity, skipping ones that no longer exist.
    /// Returns how many were loaded.
    pub async fn load_entities(&mut self, table: &Table) -> Result<usize, Error> {
        let mut loaded = 0;
        loaded += usize::from(self.load_entity0(table).await?);
        loaded += usize::from(self.load_entity1(table).await?);
        loaded += usize::from(self.load_entity2(table).await?);
        Ok(loaded)
    }

    /// Check whether the relationship holds between three existing entities.
    pub async fn check(&self, table: &Table) -> Result<LinkCheck, Error> {
        for slot in EntitySlot::ALL {
            if !self.slot_entity_exists(table, slot).await? {
                return Ok(LinkCheck::MissingEntity { slot: slot.index() });
            }
        }
        if self.row_exists(table).await? {
            Ok(LinkCheck::Linked)
        } else {
            Ok(LinkCheck::Unlinked)
        }
    }
}

impl<T: EntityTuple> EntityIdentity for Link<T> {
    fn entity_type(&self) -> &str {
        if self.record.link_type.is_empty() {
            default_link_type(T::ARITY)
        } else {
            &self.record.link_type
        }
    }

    fn keys(&self, index: Gsi) -> Result<KeyPair, KeyError> {
        if index.is_primary() {
            let record = self
                .composed_record()
                .map_err(|err| KeyError::Composition(err.to_string()))?;
            Ok(KeyPair::new(record.pk, record.sk))
        } else {
            // Links carry slot pointers instead of numbered GSI pairs.
            Ok(KeyPair::default())
        }
    }

    fn table_name(&self) -> Option<&str> {
        self.table_override.as_deref()
    }
}

impl<T: EntityTuple> Entity for Link<T> {}

impl<T: EntityTuple> Serialize for Link<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Compose on the fly so a write never ships stale pointers; a link
        // deserialized from storage composes from its own record.
        match self.composed_record() {
            Ok(record) => record.serialize(serializer),
            Err(_) => self.record.serialize(serializer),
        }
    }
}

impl<'de, T: EntityTuple> Deserialize<'de> for Link<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = LinkRecord::deserialize(deserializer)?;
        Ok(Self {
            entities: T::vacant(),
            record,
            table_override: None,
        })
    }
}

impl<T: EntityTuple> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("record", &self.record)
            .field("arity", &T::ARITY)
            .finish_non_exhaustive()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        row::Row,
        test_support::{Car, User, test_table},
    };

    fn user() -> User {
        User::new("u1", "u1@example.com")
    }

    fn car() -> Car {
        Car::new("c1", "2020")
    }

    #[test]
    fn composes_the_documented_key_shape() {
        let mut link = DiLink::new(user(), car());
        link.compose().unwrap();

        assert_eq!(
            link.record().pk,
            "/entity0Type(user)/entity0pk(u1)/entity1Type(car)/entity1pk(c1)"
        );
        assert_eq!(link.record().sk, "/entity0sk(info)/entity1sk(2020)");
        assert_eq!(link.record().e0pk, "/rowType(user)/rowPk(u1)");
        assert_eq!(link.record().e0sk, "info");
        assert_eq!(link.record().e1pk, "/rowType(car)/rowPk(c1)");
        assert_eq!(link.record().e1sk, "2020");
        assert_eq!(link.record().link_type, "dilink");
    }

    #[test]
    fn composition_is_idempotent() {
        let mut link = DiLink::new(user(), car());
        link.compose().unwrap();
        let first = link.record().clone();
        link.compose().unwrap();
        assert_eq!(link.record(), &first);
    }

    #[test]
    fn distinct_entity_sets_never_share_a_key() {
        let mut a = DiLink::new(user(), Car::new("c1", "2020"));
        let mut b = DiLink::new(user(), Car::new("c2", "2020"));
        a.compose().unwrap();
        b.compose().unwrap();
        assert_ne!(a.record().pk, b.record().pk);
    }

    #[test]
    fn slot_order_is_part_of_the_identity() {
        let mut forward = DiLink::new(user(), car());
        forward.compose().unwrap();
        // Same entities, swapped slots: a different relationship row.
        let mut reversed = DiLink::new(car(), user());
        reversed.compose().unwrap();
        assert_ne!(forward.record().pk, reversed.record().pk);
    }

    #[test]
    fn vacant_slot_without_any_fallback_fails() {
        let mut link = MonoLink::<User>::from_entities((None,));
        assert!(matches!(
            link.compose().unwrap_err(),
            Error::VacantEntitySlot { slot: 0 }
        ));
    }

    #[test]
    fn recomposes_from_stored_pointers_alone() {
        let mut original = DiLink::new(user(), car());
        original.compose().unwrap();

        // Round-trip through the record, dropping the live entities.
        let mut revived: DiLink<User, Car> = DiLink::from_entities((None, None));
        revived.record = original.record().clone();
        revived.compose().unwrap();
        assert_eq!(revived.record(), original.record());
    }

    #[test]
    fn recomposes_from_composite_segments_when_pointers_are_gone() {
        let mut original = DiLink::new(user(), car());
        original.compose().unwrap();

        let mut record = original.record().clone();
        record.e0pk.clear();
        record.e0sk.clear();
        record.e1pk.clear();
        record.e1sk.clear();

        let mut revived: DiLink<User, Car> = DiLink::from_entities((None, None));
        revived.record = record;
        revived.compose().unwrap();
        assert_eq!(revived.record(), original.record());
    }

    #[test]
    fn custom_link_type_changes_only_the_discriminator() {
        let mut owns = DiLink::new(user(), car()).with_link_type("owns");
        let mut rents = DiLink::new(user(), car()).with_link_type("rents");
        owns.compose().unwrap();
        rents.compose().unwrap();

        assert_eq!(owns.entity_type(), "owns");
        assert_eq!(rents.entity_type(), "rents");
        // The composite pair is identical; the row wrapper keeps the two
        // relationships on distinct storage keys.
        assert_eq!(owns.record().pk, rents.record().pk);
    }

    #[test]
    fn entity_keys_returns_the_slot_pointer() {
        let link = DiLink::new(user(), car());
        let pointer = link.entity_keys(EntitySlot::Entity1).unwrap();
        assert_eq!(pointer, KeyPair::new("/rowType(car)/rowPk(c1)", "2020"));
    }

    #[tokio::test]
    async fn stored_link_round_trips_and_loads_entities() {
        let table = test_table();
        table.put(&mut Row::new(user())).await.unwrap();
        table.put(&mut Row::new(car())).await.unwrap();
        table
            .put(&mut Row::new(DiLink::new(user(), car())))
            .await
            .unwrap();

        // Fetch the link back through its composed key, entities vacant.
        let mut fetched = Row::new(DiLink::<User, Car>::from_entities((None, None)));
        fetched.object_mut().record = {
            let mut link = DiLink::new(user(), car());
            link.compose().unwrap();
            link.record().clone()
        };
        table.get(&mut fetched).await.unwrap();

        let link = fetched.object_mut();
        assert_eq!(link.load_entities(&table).await.unwrap(), 2);
        assert_eq!(link.entity0().unwrap().email, "u1@example.com");
        assert_eq!(link.entity1().unwrap().year, "2020");
    }

    #[tokio::test]
    async fn loading_a_deleted_entity_skips_and_continues() {
        let table = test_table();
        table.put(&mut Row::new(user())).await.unwrap();
        // The car is never stored.
        table
            .put(&mut Row::new(DiLink::new(user(), car())))
            .await
            .unwrap();

        let mut link = DiLink::new(user(), car());
        assert_eq!(link.load_entities(&table).await.unwrap(), 1);
        assert!(!link.load_entity1(&table).await.unwrap());
    }

    #[tokio::test]
    async fn load_is_link_not_found_for_an_absent_relationship() {
        let table = test_table();
        let mut link = DiLink::new(user(), car());
        assert!(matches!(
            link.load(&table).await.unwrap_err(),
            Error::LinkNotFound
        ));

        table
            .put(&mut Row::new(DiLink::new(user(), car())))
            .await
            .unwrap();
        link.load(&table).await.unwrap();
        assert_eq!(link.record().e1pk, "/rowType(car)/rowPk(c1)");
    }

    #[tokio::test]
    async fn check_distinguishes_all_three_outcomes() {
        let table = test_table();
        let link = DiLink::new(user(), car());

        assert_eq!(
            link.check(&table).await.unwrap(),
            LinkCheck::MissingEntity { slot: 0 }
        );

        table.put(&mut Row::new(user())).await.unwrap();
        assert_eq!(
            link.check(&table).await.unwrap(),
            LinkCheck::MissingEntity { slot: 1 }
        );

        table.put(&mut Row::new(car())).await.unwrap();
        assert_eq!(link.check(&table).await.unwrap(), LinkCheck::Unlinked);

        table
            .put(&mut Row::new(DiLink::new(user(), car())))
            .await
            .unwrap();
        assert_eq!(link.check(&table).await.unwrap(), LinkCheck::Linked);
    }

    #[tokio::test]
    async fn reverse_lookup_finds_links_by_either_entity() {
        let table = test_table();
        table.put(&mut Row::new(user())).await.unwrap();
        table.put(&mut Row::new(Car::new("c1", "2020"))).await.unwrap();
        table.put(&mut Row::new(Car::new("c2", "2021"))).await.unwrap();
        table
            .put(&mut Row::new(DiLink::new(user(), Car::new("c1", "2020"))))
            .await
            .unwrap();
        table
            .put(&mut Row::new(DiLink::new(user(), Car::new("c2", "2021"))))
            .await
            .unwrap();

        let by_user: Vec<DiLink<User, Car>> = table
            .find_links(&user(), EntitySlot::Entity0, "dilink")
            .await
            .unwrap();
        assert_eq!(by_user.len(), 2);

        let by_car: Vec<DiLink<User, Car>> = table
            .find_links(&Car::new("c2", "2021"), EntitySlot::Entity1, "dilink")
            .await
            .unwrap();
        assert_eq!(by_car.len(), 1);
        assert_eq!(
            segment::decode(SegmentLabel::Entity1Pk, &by_car[0].record().pk),
            Some("c2")
        );
    }

    #[tokio::test]
    async fn reverse_lookup_filters_by_link_type() {
        let table = test_table();
        table
            .put(&mut Row::new(
                DiLink::new(user(), car()).with_link_type("owns"),
            ))
            .await
            .unwrap();
        table
            .put(&mut Row::new(
                DiLink::new(user(), car()).with_link_type("rents"),
            ))
            .await
            .unwrap();

        let owns: Vec<DiLink<User, Car>> = table
            .find_links(&user(), EntitySlot::Entity0, "owns")
            .await
            .unwrap();
        assert_eq!(owns.len(), 1);
        assert_eq!(owns[0].entity_type(), "owns");

        let none: Vec<DiLink<User, Car>> = table
            .find_links(&user(), EntitySlot::Entity0, "leases")
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn trilink_check_walks_all_three_slots() {
        let table = test_table();
        let other = User::new("u2", "u2@example.com");
        let link = TriLink::new(user(), car(), other.clone());

        assert_eq!(
            link.check(&table).await.unwrap(),
            LinkCheck::MissingEntity { slot: 0 }
        );

        table.put(&mut Row::new(user())).await.unwrap();
        table.put(&mut Row::new(car())).await.unwrap();
        assert_eq!(
            link.check(&table).await.unwrap(),
            LinkCheck::MissingEntity { slot: 2 }
        );

        table.put(&mut Row::new(other.clone())).await.unwrap();
        assert_eq!(link.check(&table).await.unwrap(), LinkCheck::Unlinked);

        table
            .put(&mut Row::new(TriLink::new(user(), car(), other)))
            .await
            .unwrap();
        assert_eq!(link.check(&table).await.unwrap(), LinkCheck::Linked);
    }

    #[tokio::test]
    async fn trilink_composes_and_queries_the_third_slot() {
        let table = test_table();
        let other = User::new("u2", "u2@example.com");
        let mut link = TriLink::new(user(), car(), other.clone());
        link.compose().unwrap();
        assert_eq!(
            segment::decode(SegmentLabel::Entity2Pk, &link.record().pk),
            Some("u2")
        );

        table.put(&mut Row::new(link)).await.unwrap();
        let by_third: Vec<TriLink<User, Car, User>> = table
            .find_links(&other, EntitySlot::Entity2, "trilink")
            .await
            .unwrap();
        assert_eq!(by_third.len(), 1);
    }
}

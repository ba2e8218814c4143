//! The identity contract every storable value satisfies.

use crate::{
    codec::{self, MarshalError},
    key::{Gsi, KeyError, KeyPair},
    store::Item,
};
use serde::{Serialize, de::DeserializeOwned};

///
/// EntityIdentity
///
/// The capability set persistence relies on: derive keys for an index
/// number, report a type discriminator, and optionally override the table.
/// Object safe; link composition walks slots through `&dyn EntityIdentity`.
///

pub trait EntityIdentity {
    /// Type discriminator written to the type-tag attribute and into the
    /// row-wrapper key. Must be stable for the lifetime of the data.
    fn entity_type(&self) -> &str;

    /// Keys for the given index. Index 0 must be answerable regardless of
    /// persistence state: either from caller-set fields or deterministically.
    /// The only sanctioned empty answer is a vacant primary pair, which
    /// opts in to the auto-identifier fallback.
    fn keys(&self, index: Gsi) -> Result<KeyPair, KeyError>;

    /// Per-instance table override. `None` uses the configured default.
    fn table_name(&self) -> Option<&str> {
        None
    }

    /// Whether writes should carry a random shard-bucket attribute.
    fn sharded(&self) -> bool {
        false
    }

    /// Receives the generated primary key when the auto-identifier fallback
    /// fires, so later `keys(0)` calls answer identically. Entities that
    /// never rely on the fallback can keep the default no-op.
    fn assign_generated_key(&mut self, key: KeyPair) {
        let _ = key;
    }
}

///
/// Entity
///
/// A storable value: identity plus serde. Implementations are usually the
/// empty `impl Entity for T {}`; override the marshal hooks only for
/// bespoke encodings (the custom-marshaller seam).
///

pub trait Entity: EntityIdentity + Serialize + DeserializeOwned + Send + Sync {
    /// Marshal this entity into its attribute map.
    fn marshal_item(&self) -> Result<Item, MarshalError> {
        codec::to_item(self)
    }

    /// Replace this entity's state from a stored attribute map. Attributes
    /// without a matching field (keys, type tag, shard bucket) are ignored.
    fn unmarshal_item(&mut self, item: &Item) -> Result<(), MarshalError> {
        *self = codec::from_item(item)?;
        Ok(())
    }
}

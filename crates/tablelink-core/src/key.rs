//! Key pairs, index selectors, and the row-wrapper key.
//!
//! Invariants:
//! - Index 0 is the primary index; 1..=6 address the auxiliary GSIs.
//! - The storage partition key is always the row-wrapped form
//!   `rowType(type)+rowPk(rawPk)`; the sort key is stored raw. Two entity
//!   types can therefore never collide even with equal raw keys.

use crate::segment::{self, SegmentError, SegmentLabel};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Highest supported auxiliary GSI number.
pub const MAX_GSI: u8 = 6;

///
/// KeyPair
///
/// A (partition key, sort key) pair. Raw or wrapped depending on context;
/// the type does not distinguish, callers do.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct KeyPair {
    pub pk: String,
    pub sk: String,
}

impl KeyPair {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// Both components unset. Only the primary index may answer this way,
    /// and only for entities relying on the auto-identifier fallback.
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        self.pk.is_empty() && self.sk.is_empty()
    }
}

///
/// KeyError
///
/// Failures while deriving keys from an entity. Entities fail loudly on
/// missing required fields instead of returning empty strings.
///

#[derive(Debug, ThisError, Clone, Eq, PartialEq)]
pub enum KeyError {
    #[error("unsupported index number: {0}")]
    InvalidGsi(u8),

    #[error("missing required field for {entity_type} key: {field}")]
    MissingField { entity_type: String, field: String },

    #[error("link composition failed: {0}")]
    Composition(String),
}

///
/// Gsi
///
/// Validated index selector: 0 = primary, 1..=6 = auxiliary GSIs.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[display("{_0}")]
pub struct Gsi(u8);

impl Gsi {
    pub const PRIMARY: Self = Self(0);

    pub const fn new(index: u8) -> Result<Self, KeyError> {
        if index <= MAX_GSI {
            Ok(Self(index))
        } else {
            Err(KeyError::InvalidGsi(index))
        }
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_primary(self) -> bool {
        self.0 == 0
    }

    /// Attribute names holding this index's keys (`pk`/`sk`, `pk1`/`sk1`, ...).
    #[must_use]
    pub fn attribute_names(self) -> (String, String) {
        if self.is_primary() {
            ("pk".to_string(), "sk".to_string())
        } else {
            (format!("pk{}", self.0), format!("sk{}", self.0))
        }
    }

    /// Index name for the auxiliary GSI, `None` for the primary index.
    #[must_use]
    pub fn index_name(self) -> Option<String> {
        if self.is_primary() {
            None
        } else {
            Some(format!("pk{n}-sk{n}-index", n = self.0))
        }
    }

    /// All selectors, primary first.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=MAX_GSI).map(Self)
    }
}

///
/// EntitySlot
///
/// Which linked entity a reverse lookup pivots on. Each slot owns one
/// dedicated GSI keyed by the entity's row-wrapper pointer.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum EntitySlot {
    #[display("entity0")]
    Entity0,
    #[display("entity1")]
    Entity1,
    #[display("entity2")]
    Entity2,
}

impl EntitySlot {
    pub const ALL: [Self; 3] = [Self::Entity0, Self::Entity1, Self::Entity2];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Entity0 => 0,
            Self::Entity1 => 1,
            Self::Entity2 => 2,
        }
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Entity0),
            1 => Some(Self::Entity1),
            2 => Some(Self::Entity2),
            _ => None,
        }
    }

    /// Name of the GSI holding this slot's pointer keys.
    #[must_use]
    pub const fn index_name(self) -> &'static str {
        match self {
            Self::Entity0 => "e0pk-e0sk-index",
            Self::Entity1 => "e1pk-e1sk-index",
            Self::Entity2 => "e2pk-e2sk-index",
        }
    }

    /// Attribute holding the slot's pointer partition key.
    #[must_use]
    pub const fn pk_attribute(self) -> &'static str {
        match self {
            Self::Entity0 => "e0pk",
            Self::Entity1 => "e1pk",
            Self::Entity2 => "e2pk",
        }
    }

    /// Attribute holding the slot's pointer sort key.
    #[must_use]
    pub const fn sk_attribute(self) -> &'static str {
        match self {
            Self::Entity0 => "e0sk",
            Self::Entity1 => "e1sk",
            Self::Entity2 => "e2sk",
        }
    }

    #[must_use]
    pub const fn pk_label(self) -> SegmentLabel {
        match self {
            Self::Entity0 => SegmentLabel::Entity0Pk,
            Self::Entity1 => SegmentLabel::Entity1Pk,
            Self::Entity2 => SegmentLabel::Entity2Pk,
        }
    }

    #[must_use]
    pub const fn sk_label(self) -> SegmentLabel {
        match self {
            Self::Entity0 => SegmentLabel::Entity0Sk,
            Self::Entity1 => SegmentLabel::Entity1Sk,
            Self::Entity2 => SegmentLabel::Entity2Sk,
        }
    }

    #[must_use]
    pub const fn type_label(self) -> SegmentLabel {
        match self {
            Self::Entity0 => SegmentLabel::Entity0Type,
            Self::Entity1 => SegmentLabel::Entity1Type,
            Self::Entity2 => SegmentLabel::Entity2Type,
        }
    }
}

/// Build the row-wrapper partition key: `rowType(type)+rowPk(rawPk)`.
///
/// Applied identically on every read and write so the wrapped form is the
/// only partition key that ever reaches storage.
pub fn wrap_partition_key(entity_type: &str, raw_pk: &str) -> Result<String, SegmentError> {
    let mut wrapped = segment::encode(SegmentLabel::RowType, entity_type)?;
    wrapped.push_str(&segment::encode(SegmentLabel::RowPk, raw_pk)?);
    Ok(wrapped)
}

///
/// TESTS
///

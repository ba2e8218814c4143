//! Crate-wide error taxonomy.
//!
//! Everything here is returned to the immediate caller, never swallowed.
//! The batch executor isolates these per item; transport errors pass
//! through from the storage boundary unmodified. Cache backend failures
//! never surface here: the cache facade degrades to the table instead.

use crate::{codec::MarshalError, key::KeyError, segment::SegmentError, store::StoreError};
use thiserror::Error as ThisError;

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error(transparent)]
    Key(#[from] KeyError),

    /// Point lookup returned no item. Expected and recoverable; callers
    /// branch on it via [`Error::is_not_found`].
    #[error("{entity_type} not found (pk: {pk}, sk: {sk})")]
    EntityNotFound {
        entity_type: String,
        pk: String,
        sk: String,
    },

    /// The link row is absent while its referenced entities exist:
    /// the relationship has not been established yet.
    #[error("link not found")]
    LinkNotFound,

    /// The type tag on a found row disagrees with the expectation. Either a
    /// key-space collision or a programmer error; surfaced, never retried.
    #[error("row type '{found}' does not match expected type '{expected}'")]
    LinkTypeMismatch { expected: String, found: String },

    #[error("partition key is required for gsi {index} of type {entity_type}")]
    PartitionKeyRequired { index: u8, entity_type: String },

    #[error("sort key is required for gsi {index} of type {entity_type}")]
    SortKeyRequired { index: u8, entity_type: String },

    /// A link slot has neither an entity reference nor a stored pointer to
    /// fall back to; composition cannot proceed.
    #[error("link slot {slot} has no entity reference or stored pointer")]
    VacantEntitySlot { slot: usize },

    #[error("message body is empty")]
    MessageBodyEmpty,

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A batch task was cancelled or panicked before publishing a result.
    #[error("batch task failed: {0}")]
    Task(String),
}

impl Error {
    /// True for the two expected absence outcomes.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound { .. } | Self::LinkNotFound)
    }
}

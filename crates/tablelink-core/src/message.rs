//! Hydrating rows from transport messages.
//!
//! Queue and stream payloads arrive as JSON bodies carrying at least the
//! key fields of an entity. The body seeds the row's object, then the
//! authoritative state is fetched from the table, so a stale payload can
//! never overwrite what is actually stored.

use crate::{codec::MarshalError, entity::Entity, error::Error, row::Row, table::Table};

///
/// Message
///
/// The transport-agnostic shape of an inbound message: an optional body.
/// Delivery metadata stays with the transport.
///

#[derive(Clone, Debug, Default)]
pub struct Message {
    pub body: Option<String>,
}

impl Message {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }

    /// Body text, if present and non-empty.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref().filter(|body| !body.is_empty())
    }
}

impl Table {
    /// Parse the message body into the row's object and fetch the stored
    /// state for its key.
    ///
    /// An absent or empty body fails before any parsing or I/O.
    pub async fn load_from_message<T: Entity>(
        &self,
        message: &Message,
        row: &mut Row<T>,
    ) -> Result<(), Error> {
        let body = message.body().ok_or(Error::MessageBodyEmpty)?;
        *row.object_mut() = serde_json::from_str(body).map_err(MarshalError::Json)?;
        self.get(row).await
    }
}

///
/// TESTS
///

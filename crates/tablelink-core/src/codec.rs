//! Serialization boundary: entity ⇄ attribute-map marshalling.
//!
//! Serde-backed, bridging through `serde_json::Value`. Entities needing
//! bespoke encodings override the marshal hooks on [`crate::entity::Entity`]
//! instead of replacing this module.

use crate::store::{AttrValue, Item};
use serde::{Serialize, de::DeserializeOwned};
use std::str::FromStr;
use thiserror::Error as ThisError;

///
/// MarshalError
///

#[derive(Debug, ThisError)]
pub enum MarshalError {
    #[error("entity did not serialize to a map")]
    NotAMap,

    #[error("numeric attribute is not a valid number: {value}")]
    InvalidNumber { value: String },

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Marshal a value into an attribute map.
pub fn to_item<T: Serialize>(value: &T) -> Result<Item, MarshalError> {
    let json = serde_json::to_value(value)?;
    let serde_json::Value::Object(fields) = json else {
        return Err(MarshalError::NotAMap);
    };

    let mut item = Item::with_capacity(fields.len());
    for (name, field) in fields {
        item.insert(name, value_to_attr(field));
    }
    Ok(item)
}

/// Unmarshal an attribute map into a value.
pub fn from_item<T: DeserializeOwned>(item: &Item) -> Result<T, MarshalError> {
    let mut fields = serde_json::Map::with_capacity(item.len());
    for (name, attr) in item {
        fields.insert(name.clone(), attr_to_value(attr)?);
    }
    Ok(serde_json::from_value(serde_json::Value::Object(fields))?)
}

fn value_to_attr(value: serde_json::Value) -> AttrValue {
    match value {
        serde_json::Value::Null => AttrValue::Null,
        serde_json::Value::Bool(b) => AttrValue::Bool(b),
        serde_json::Value::Number(n) => AttrValue::N(n.to_string()),
        serde_json::Value::String(s) => AttrValue::S(s),
        serde_json::Value::Array(items) => {
            AttrValue::L(items.into_iter().map(value_to_attr).collect())
        }
        serde_json::Value::Object(fields) => AttrValue::M(fields
            .into_iter()
            .map(|(name, field)| (name, value_to_attr(field)))
            .collect()),
    }
}

fn attr_to_value(attr: &AttrValue) -> Result<serde_json::Value, MarshalError> {
    Ok(match attr {
        AttrValue::Null => serde_json::Value::Null,
        AttrValue::Bool(b) => serde_json::Value::Bool(*b),
        AttrValue::S(s) => serde_json::Value::String(s.clone()),
        AttrValue::N(n) => {
            let number =
                serde_json::Number::from_str(n).map_err(|_| MarshalError::InvalidNumber {
                    value: n.clone(),
                })?;
            serde_json::Value::Number(number)
        }
        AttrValue::B(bytes) => serde_json::Value::Array(
            bytes
                .iter()
                .map(|b| serde_json::Value::Number((*b).into()))
                .collect(),
        ),
        AttrValue::L(items) => serde_json::Value::Array(
            items
                .iter()
                .map(attr_to_value)
                .collect::<Result<_, _>>()?,
        ),
        AttrValue::M(fields) => {
            let mut map = serde_json::Map::with_capacity(fields.len());
            for (name, field) in fields {
                map.insert(name.clone(), attr_to_value(field)?);
            }
            serde_json::Value::Object(map)
        }
    })
}

///
/// TESTS
///

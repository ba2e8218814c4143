//! Labeled key-fragment codec.
//!
//! Composite keys are ordered concatenations of `/label(value)` segments.
//! Labels form a closed vocabulary (enforced by [`SegmentLabel`]); values are
//! validated at encode time. Extraction is label-scoped and position
//! independent, so segment order matters only for prefix queries and
//! readability, never for decoding.

use derive_more::Display;
use thiserror::Error as ThisError;

///
/// SegmentLabel
///
/// The closed label vocabulary. Every composite key fragment written by this
/// crate carries one of these labels; anything else never parses.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[display("{}", self.as_str())]
pub enum SegmentLabel {
    Pk,
    Sk,
    RowType,
    RowPk,
    RowSk,
    Entity0Pk,
    Entity0Sk,
    Entity0Type,
    Entity1Pk,
    Entity1Sk,
    Entity1Type,
    Entity2Pk,
    Entity2Sk,
    Entity2Type,
}

impl SegmentLabel {
    pub const ALL: [Self; 14] = [
        Self::Pk,
        Self::Sk,
        Self::RowType,
        Self::RowPk,
        Self::RowSk,
        Self::Entity0Pk,
        Self::Entity0Sk,
        Self::Entity0Type,
        Self::Entity1Pk,
        Self::Entity1Sk,
        Self::Entity1Type,
        Self::Entity2Pk,
        Self::Entity2Sk,
        Self::Entity2Type,
    ];

    /// The token written into composite keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pk => "pk",
            Self::Sk => "sk",
            Self::RowType => "rowType",
            Self::RowPk => "rowPk",
            Self::RowSk => "rowSk",
            Self::Entity0Pk => "entity0pk",
            Self::Entity0Sk => "entity0sk",
            Self::Entity0Type => "entity0Type",
            Self::Entity1Pk => "entity1pk",
            Self::Entity1Sk => "entity1sk",
            Self::Entity1Type => "entity1Type",
            Self::Entity2Pk => "entity2pk",
            Self::Entity2Sk => "entity2sk",
            Self::Entity2Type => "entity2Type",
        }
    }

    /// True when `value` textually equals a reserved label token.
    ///
    /// Such values are rejected at encode time to keep label and value
    /// unambiguous during extraction.
    #[must_use]
    pub fn is_reserved_token(value: &str) -> bool {
        Self::ALL.iter().any(|label| label.as_str() == value)
    }
}

///
/// SegmentError
///
/// Encoding failures. These are caller errors: fatal, never retried.
///

#[derive(Debug, ThisError, Clone, Eq, PartialEq)]
pub enum SegmentError {
    #[error("invalid key segment: {label}(): value is empty")]
    EmptyValue { label: SegmentLabel },

    #[error("invalid key segment: {label}({value}): value contains non-printable whitespace")]
    ObscureWhitespace { label: SegmentLabel, value: String },

    #[error("invalid key segment: {label}({value}): value matches a reserved label token")]
    ReservedToken { label: SegmentLabel, value: String },
}

/// Encode a single `/label(value)` segment.
pub fn encode(label: SegmentLabel, value: &str) -> Result<String, SegmentError> {
    if value.is_empty() {
        return Err(SegmentError::EmptyValue { label });
    }
    if contains_obscure_whitespace(value) {
        return Err(SegmentError::ObscureWhitespace {
            label,
            value: value.to_string(),
        });
    }
    if SegmentLabel::is_reserved_token(value) {
        return Err(SegmentError::ReservedToken {
            label,
            value: value.to_string(),
        });
    }

    Ok(format!("/{label}({value})"))
}

/// Extract the inner text of the first `/label(...)` occurrence.
///
/// Returns `None` when the label is absent. Extraction reads up to the first
/// closing parenthesis, which is exact for every entity-supplied value (those
/// never contain parentheses once encoded through this codec).
#[must_use]
pub fn decode(label: SegmentLabel, composite: &str) -> Option<&str> {
    let needle = format!("/{label}(");
    let start = composite.find(&needle)? + needle.len();
    let rest = &composite[start..];
    let end = rest.find(')')?;
    let inner = &rest[..end];

    if inner.is_empty() { None } else { Some(inner) }
}

/// Whitespace that would survive into a key unnoticed.
///
/// A plain ASCII space is printable and allowed; every other whitespace
/// character is rejected.
fn contains_obscure_whitespace(value: &str) -> bool {
    value.chars().any(|c| c.is_whitespace() && c != ' ')
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_label_and_value() {
        let seg = encode(SegmentLabel::Entity0Pk, "user@example.com").unwrap();
        assert_eq!(seg, "/entity0pk(user@example.com)");
    }

    #[test]
    fn decodes_what_it_encoded() {
        let seg = encode(SegmentLabel::Entity0Pk, "user@example.com").unwrap();
        assert_eq!(
            decode(SegmentLabel::Entity0Pk, &seg),
            Some("user@example.com")
        );
    }

    #[test]
    fn rejects_empty_value() {
        assert!(matches!(
            encode(SegmentLabel::RowPk, ""),
            Err(SegmentError::EmptyValue { .. })
        ));
    }

    #[test]
    fn rejects_obscure_whitespace() {
        for value in ["a\tb", "a\nb", "a\u{a0}b"] {
            assert!(matches!(
                encode(SegmentLabel::RowPk, value),
                Err(SegmentError::ObscureWhitespace { .. })
            ));
        }
        // Plain spaces are printable and fine.
        assert!(encode(SegmentLabel::RowPk, "a b").is_ok());
    }

    #[test]
    fn rejects_reserved_tokens_as_values() {
        for label in SegmentLabel::ALL {
            assert!(matches!(
                encode(SegmentLabel::RowType, label.as_str()),
                Err(SegmentError::ReservedToken { .. })
            ));
        }
    }

    #[test]
    fn decode_is_label_scoped_not_positional() {
        let composite = format!(
            "{}{}",
            encode(SegmentLabel::Entity0Type, "user").unwrap(),
            encode(SegmentLabel::Entity0Pk, "u1").unwrap(),
        );
        assert_eq!(decode(SegmentLabel::Entity0Pk, &composite), Some("u1"));
        assert_eq!(decode(SegmentLabel::Entity0Type, &composite), Some("user"));
        assert_eq!(decode(SegmentLabel::Entity1Pk, &composite), None);
    }

    #[test]
    fn decode_finds_first_occurrence_only() {
        let composite = "/rowPk(first)/rowPk(second)";
        assert_eq!(decode(SegmentLabel::RowPk, composite), Some("first"));
    }

    #[test]
    fn decode_survives_nested_composites() {
        // A link row's storage key wraps an entire composite inside rowPk.
        let inner = "/entity0Type(user)/entity0pk(u1)/entity1Type(car)/entity1pk(c1)";
        let wrapped = format!("/rowType(dilink)/rowPk({inner})");
        assert_eq!(decode(SegmentLabel::RowType, &wrapped), Some("dilink"));
        assert_eq!(decode(SegmentLabel::Entity0Pk, &wrapped), Some("u1"));
        assert_eq!(decode(SegmentLabel::Entity1Pk, &wrapped), Some("c1"));
    }

    proptest! {
        #[test]
        fn round_trips_all_valid_values(value in "[a-zA-Z0-9@:._ -]{1,64}") {
            prop_assume!(!SegmentLabel::is_reserved_token(&value));
            for label in SegmentLabel::ALL {
                let seg = encode(label, &value).unwrap();
                prop_assert_eq!(decode(label, &seg), Some(value.as_str()));
            }
        }

        #[test]
        fn distinct_values_never_collide(
            a in "[a-z0-9]{1,32}",
            b in "[a-z0-9]{1,32}",
        ) {
            prop_assume!(a != b);
            let sa = encode(SegmentLabel::RowPk, &a).unwrap();
            let sb = encode(SegmentLabel::RowPk, &b).unwrap();
            prop_assert_ne!(sa, sb);
        }
    }
}

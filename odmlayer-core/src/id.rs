//! Identifier normalization.
//!
//! Every document is addressed by a 12-byte [`ObjectId`]. At the API boundary identifiers may
//! arrive either as their textual form (24 lowercase hex characters) or already as an
//! [`ObjectId`]; [`normalize`] turns both into the canonical value.
//!
//! ```ignore
//! use odmlayer::id::{normalize, object_id};
//!
//! let id = object_id("507f1f77bcf86cd799439011")?;
//! assert_eq!(normalize(&id)?, id);
//! assert_eq!(normalize("507f1f77bcf86cd799439011")?, id);
//! ```

use bson::{Bson, oid::ObjectId};
use chrono::{DateTime, Utc};

use crate::error::{OdmError, OdmResult};

/// Length of the textual identifier form.
pub const HEX_LEN: usize = 24;

/// Conversion of identifier-like values into the canonical [`ObjectId`].
///
/// Implemented for text, for [`ObjectId`] itself and for [`Bson`] values holding either.
/// Rust types outside this set are rejected at compile time; BSON values of any other kind
/// are rejected at runtime with [`OdmError::UnsupportedIdentifierType`].
pub trait ToObjectId {
    /// Converts this value into an [`ObjectId`].
    ///
    /// # Errors
    ///
    /// [`OdmError::InvalidIdentifierFormat`] for malformed text,
    /// [`OdmError::UnsupportedIdentifierType`] for BSON values that cannot hold an identifier.
    fn to_object_id(&self) -> OdmResult<ObjectId>;
}

impl ToObjectId for ObjectId {
    fn to_object_id(&self) -> OdmResult<ObjectId> {
        Ok(*self)
    }
}

impl ToObjectId for str {
    fn to_object_id(&self) -> OdmResult<ObjectId> {
        parse_hex(self)
    }
}

impl ToObjectId for String {
    fn to_object_id(&self) -> OdmResult<ObjectId> {
        parse_hex(self)
    }
}

impl ToObjectId for Bson {
    fn to_object_id(&self) -> OdmResult<ObjectId> {
        match self {
            Bson::ObjectId(id) => Ok(*id),
            Bson::String(text) => parse_hex(text),
            other => Err(OdmError::UnsupportedIdentifierType(format!(
                "{:?}",
                other.element_type()
            ))),
        }
    }
}

impl<T: ToObjectId + ?Sized> ToObjectId for &T {
    fn to_object_id(&self) -> OdmResult<ObjectId> {
        (**self).to_object_id()
    }
}

/// Normalizes an identifier-like value into an [`ObjectId`].
///
/// Re-normalizing an [`ObjectId`] returns it unchanged.
///
/// # Errors
///
/// See [`ToObjectId::to_object_id`].
pub fn normalize<I: ToObjectId + ?Sized>(id: &I) -> OdmResult<ObjectId> {
    id.to_object_id()
}

/// Converts the textual form of an identifier into an [`ObjectId`].
///
/// # Errors
///
/// Returns [`OdmError::InvalidIdentifierFormat`] unless `hex` is exactly 24 lowercase hex
/// characters.
pub fn object_id(hex: &str) -> OdmResult<ObjectId> {
    parse_hex(hex)
}

/// Generates a fresh identifier.
pub fn generate() -> ObjectId {
    ObjectId::new()
}

/// The all-zero identifier, used as a placeholder before materialization.
pub fn nil() -> ObjectId {
    ObjectId::from_bytes([0u8; 12])
}

/// Returns the time embedded in an identifier, with second precision.
pub fn generation_time(id: &ObjectId) -> DateTime<Utc> {
    id.timestamp().to_chrono()
}

/// Returns `true` if every byte of the identifier is zero.
pub fn is_nil(id: &ObjectId) -> bool {
    id.bytes() == [0u8; 12]
}

fn parse_hex(text: &str) -> OdmResult<ObjectId> {
    // ObjectId::parse_str alone would also take upper-case digits.
    let well_formed = text.len() == HEX_LEN
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

    if !well_formed {
        return Err(OdmError::InvalidIdentifierFormat(text.to_string()));
    }

    ObjectId::parse_str(text).map_err(|_| OdmError::InvalidIdentifierFormat(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "507f1f77bcf86cd799439011";

    #[test]
    fn parses_lowercase_hex() {
        let id = object_id(HEX).unwrap();

        assert_eq!(id.to_hex(), HEX);
        assert_eq!(normalize(HEX).unwrap(), id);
        assert_eq!(normalize(&HEX.to_string()).unwrap(), id);
    }

    #[test]
    fn normalizing_twice_is_idempotent() {
        for _ in 0..16 {
            let hex = generate().to_hex();
            let once = normalize(hex.as_str()).unwrap();
            let twice = normalize(&once).unwrap();

            assert_eq!(once, twice);
            assert_eq!(twice.to_hex(), hex);
        }
    }

    #[test]
    fn rejects_malformed_text() {
        let bad = [
            "not-an-id",
            "",
            "507f1f77bcf86cd79943901",
            "507f1f77bcf86cd7994390111",
            "507F1F77BCF86CD799439011",
            "507f1f77bcf86cd79943901g",
            " 507f1f77bcf86cd799439011",
        ];

        for text in bad {
            match normalize(text) {
                Err(OdmError::InvalidIdentifierFormat(got)) => assert_eq!(got, text),
                other => panic!("expected InvalidIdentifierFormat for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn bson_values() {
        let id = object_id(HEX).unwrap();

        assert_eq!(normalize(&Bson::ObjectId(id)).unwrap(), id);
        assert_eq!(normalize(&Bson::String(HEX.into())).unwrap(), id);
        assert!(matches!(
            normalize(&Bson::String("xyz".into())),
            Err(OdmError::InvalidIdentifierFormat(_))
        ));
        assert!(matches!(
            normalize(&Bson::Int32(7)),
            Err(OdmError::UnsupportedIdentifierType(_))
        ));
        assert!(matches!(
            normalize(&Bson::Null),
            Err(OdmError::UnsupportedIdentifierType(_))
        ));
    }

    #[test]
    fn generated_ids_are_fresh_and_non_nil() {
        let a = generate();
        let b = generate();

        assert_ne!(a, b);
        assert!(!is_nil(&a));
        assert!(is_nil(&nil()));
    }

    #[test]
    fn generation_time_matches_embedded_seconds() {
        let id = object_id(HEX).unwrap();

        // 0x507f1f77 seconds since the epoch
        assert_eq!(generation_time(&id).timestamp(), 0x507f1f77);
    }
}

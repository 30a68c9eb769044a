//! Identifier types.
//!
//! Quotes are addressed by [`QuoteId`], a 12-byte object id rendered as 24 lowercase hexadecimal
//! characters (4-byte timestamp, 5 random bytes, 3-byte counter). This is the identifier format
//! of the reference document store, so ids minted by older deployments stay valid.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Length of a hex-encoded [`QuoteId`].
pub const QUOTE_ID_LEN: usize = 24;

/// Identifier of a stored quote.
///
/// Always holds a normalised (lowercase) 24 character hex string. Construct one with
/// [`QuoteId::generate`] or by parsing untrusted input with [`str::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuoteId(String);

/// Returned when a string is not a well-formed [`QuoteId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid quote id {0:?}: expected {QUOTE_ID_LEN} hexadecimal characters")]
pub struct InvalidQuoteId(pub String);

impl QuoteId {
    /// Mint a fresh identifier.
    pub fn generate() -> Self {
        Self(ObjectId::new().to_hex())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for QuoteId {
    type Err = InvalidQuoteId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ObjectId::parse_str also checks the decoded length, but the explicit length check keeps
        // odd inputs (e.g. 12 raw bytes) from being reinterpreted.
        if s.len() != QUOTE_ID_LEN {
            return Err(InvalidQuoteId(s.to_string()));
        }
        ObjectId::parse_str(s)
            .map(|oid| Self(oid.to_hex()))
            .map_err(|_| InvalidQuoteId(s.to_string()))
    }
}

impl TryFrom<String> for QuoteId {
    type Error = InvalidQuoteId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QuoteId> for String {
    fn from(id: QuoteId) -> Self {
        id.0
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Abbreviate an id to its last 8 characters for more readable logs and traces.
///
/// The trailing bytes of an object id hold the random part and counter, so they disambiguate
/// better than the leading timestamp.
pub fn abbrev_id(id: &QuoteId) -> &str {
    &id.0[QUOTE_ID_LEN - 8..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_well_formed_and_unique() {
        let ids: HashSet<QuoteId> = (0..100).map(|_| QuoteId::generate()).collect();
        assert_eq!(ids.len(), 100);

        for id in &ids {
            assert_eq!(id.as_str().len(), QUOTE_ID_LEN);
            assert!(id.as_str().chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
            assert_eq!(id.as_str().parse::<QuoteId>().as_ref(), Ok(id));
        }
    }

    #[test]
    fn test_parse_normalises_case() {
        let id: QuoteId = "65A1B2C3D4E5F60718293A4B".parse().unwrap();
        assert_eq!(id.as_str(), "65a1b2c3d4e5f60718293a4b");
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        for raw in [
            "",
            "not-a-real-id",
            "65a1b2c3d4e5f60718293a4",   // 23 chars
            "65a1b2c3d4e5f60718293a4b0", // 25 chars
            "65a1b2c3d4e5f60718293a4g",  // non-hex
            "abcdefghijkl",              // 12 raw bytes
        ] {
            assert!(raw.parse::<QuoteId>().is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_serde_round_trips_as_plain_string() {
        let id = QuoteId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        assert_eq!(serde_json::from_str::<QuoteId>(&json).unwrap(), id);
        assert!(serde_json::from_str::<QuoteId>("\"nope\"").is_err());
    }

    #[test]
    fn test_abbrev_id() {
        let id: QuoteId = "65a1b2c3d4e5f60718293a4b".parse().unwrap();
        assert_eq!(abbrev_id(&id), "18293a4b");
    }
}

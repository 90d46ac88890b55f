//! # Canonical Serialization: JCS Byte Production
//!
//! `CanonicalBytes` is the sole construction path for bytes that get signed,
//! MAC'd, or digested anywhere in the broker.
//!
//! ## Security Invariant
//!
//! The inner field is private. The only constructors run the value through
//! `serde_json::Value` and then RFC 8785 (JSON Canonicalization Scheme):
//! sorted object keys, compact separators, ECMAScript number formatting.
//! Two parties that hold the same logical JSON always produce the same
//! bytes, so a credential re-serialized by a verifier reproduces exactly
//! what its issuer signed. Any mutation of any field changes the bytes.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - Object keys are sorted lexicographically by UTF-16 code units.
/// - No insignificant whitespace.
/// - Numbers use the shortest round-trip representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON tree.
    ///
    /// Used when a field must be stripped before signing (the credential
    /// `proof`), which is easiest to do on the `Value`.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

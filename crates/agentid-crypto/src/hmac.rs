//! # HMAC-SHA256 Tags
//!
//! The symmetric credential scheme. The broker signs and verifies internal
//! agent credentials with one shared secret; anyone who can verify can
//! also mint, so this scheme never leaves the broker's trust boundary.
//!
//! ## Security Invariant
//!
//! - Tag comparison is constant time (`subtle::ConstantTimeEq`).
//! - The secret is zeroized on drop and redacted in `Debug`.
//! - Secrets shorter than [`MIN_SECRET_LEN`] bytes are rejected.

use agentid_core::{CanonicalBytes, CryptoError};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding;

type HmacSha256 = Hmac<Sha256>;

/// Minimum shared-secret length in bytes (the SHA-256 block output size).
pub const MIN_SECRET_LEN: usize = 32;

/// A shared HMAC-SHA256 secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct HmacKey {
    secret: Vec<u8>,
}

/// A 32-byte HMAC-SHA256 tag.
#[derive(Clone, PartialEq, Eq)]
pub struct HmacTag([u8; 32]);

impl HmacKey {
    /// Wrap a shared secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, CryptoError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(CryptoError::KeyError(format!(
                "HMAC secret must be at least {MIN_SECRET_LEN} bytes, got {}",
                secret.len()
            )));
        }
        Ok(Self { secret })
    }

    /// Generate a random 32-byte secret.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut secret = vec![0u8; MIN_SECRET_LEN];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        Self { secret }
    }

    /// Export the secret as base64. Only for writing key files.
    pub fn to_base64(&self) -> String {
        encoding::encode(&self.secret)
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length; new_from_slice cannot fail here.
        match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
        }
    }

    /// Compute the tag over canonical bytes.
    pub fn tag(&self, data: &CanonicalBytes) -> HmacTag {
        let mut mac = self.mac();
        mac.update(data.as_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&mac.finalize().into_bytes());
        HmacTag(out)
    }

    /// Recompute the tag and compare it to `presented` in constant time.
    pub fn verify(&self, data: &CanonicalBytes, presented: &[u8]) -> Result<(), CryptoError> {
        let expected = self.tag(data);
        // Length is public (always 32 for a well-formed tag); the content
        // comparison is what must not short-circuit.
        if presented.len() == expected.0.len() && bool::from(expected.0.ct_eq(presented)) {
            Ok(())
        } else {
            Err(CryptoError::VerificationFailed("HMAC tag mismatch".into()))
        }
    }
}

impl std::fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HmacKey(<redacted>)")
    }
}

impl HmacTag {
    /// Return the raw tag bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the tag as base64.
    pub fn to_base64(&self) -> String {
        encoding::encode(&self.0)
    }
}

impl std::fmt::Debug for HmacTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HmacTag({})", self.to_base64())
    }
}

//! # Proof and Key Encoding
//!
//! Proofs and configured key material travel as standard (padded) base64.

use agentid_core::CryptoError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Encode raw bytes as standard base64.
pub fn encode(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode standard base64.
pub fn decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64
        .decode(s.trim())
        .map_err(|e| CryptoError::Encoding(format!("invalid base64: {e}")))
}

/// Decode standard base64 into a fixed-size array.
pub fn decode_array<const N: usize>(s: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode(s)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::Encoding(format!("expected {N} bytes, got {}", bytes.len())))
}

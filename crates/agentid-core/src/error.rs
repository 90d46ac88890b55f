//! # Error Types
//!
//! Errors shared across the broker crates. All errors use `thiserror`.
//!
//! Cryptographic errors carry context for operators but are collapsed into
//! a single "invalid signature" outcome before they reach a caller, so no
//! structural information about a rejected proof leaks out.

use thiserror::Error;

/// Top-level error type for the broker foundations.
#[derive(Error, Debug)]
pub enum AgentIdError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Input failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The value could not be converted to a JSON tree or JCS output.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature or MAC verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key parsing or construction failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Encoded proof or key bytes could not be decoded.
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Validation failure on a domain value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The DID string is not of the form `did:<method>:<id>`.
    #[error("invalid DID: {0:?}")]
    InvalidDid(String),

    /// The timestamp string is not valid RFC 3339.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

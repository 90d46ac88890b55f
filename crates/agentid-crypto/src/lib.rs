//! # agentid-crypto: Cryptographic Primitives
//!
//! Provides the two signing schemes a credential proof can use:
//!
//! - **HMAC-SHA256** (`hmac.rs`) for internal agent credentials, where the
//!   broker itself is the only verifier and holds the shared secret.
//! - **Ed25519** (`ed25519.rs`) for delegation tokens that cross a trust
//!   boundary and must be verifiable with a public key alone.
//!
//! Both sit behind [`CredentialSigner`] / [`CredentialVerifier`]
//! (`scheme.rs`), selected once from configuration.
//!
//! ## Crate Policy
//!
//! - Depends only on `agentid-core` internally.
//! - Signing input is always `&CanonicalBytes`; raw byte slices cannot be signed.
//! - Secret key material never implements `Serialize` and redacts in `Debug`.
//! - No mocking of cryptographic operations in tests.

pub mod ed25519;
pub mod encoding;
pub mod hmac;
pub mod scheme;

pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use hmac::{HmacKey, HmacTag};
pub use scheme::{CredentialSigner, CredentialVerifier, ProofSigner, ProofVerifier, SigningScheme};

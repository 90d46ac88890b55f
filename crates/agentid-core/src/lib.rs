//! # agentid-core: Foundational Types for the Agent Identity Broker
//!
//! Every other crate in the workspace depends on `agentid-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every signature and every digest is
//!    computed over `CanonicalBytes`, produced only by RFC 8785 (JCS)
//!    serialization. A credential re-serialized by a verifier yields the
//!    exact byte sequence its issuer signed.
//!
//! 2. **UTC-only timestamps.** `Timestamp` renders as `YYYY-MM-DDTHH:MM:SSZ`
//!    with seconds precision, the fixed textual form stamped into
//!    `issuanceDate`.
//!
//! 3. **Newtype identifiers.** Agent DIDs are `Did`, not bare strings.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `agentid-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{AgentIdError, CanonicalizationError, CryptoError, ValidationError};
pub use identity::Did;
pub use temporal::Timestamp;

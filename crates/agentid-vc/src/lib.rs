//! # agentid-vc: Delegation Credentials
//!
//! The credential an agent presents when asking the broker to act:
//!
//! ```json
//! {
//!   "issuer": "did:example:broker",
//!   "issuanceDate": "2026-01-15T12:00:00Z",
//!   "credentialSubject": {
//!     "id": "did:example:7f3c...",
//!     "metadata": { "role": "data-fetcher", "token_ttl": 3600 }
//!   },
//!   "proof": "<base64 tag or signature>"
//! }
//! ```
//!
//! - [`credential`]: the model, issuance, and proof verification.
//! - [`trust`]: the exact-match trusted-issuer gate.
//! - [`validity`]: the `issuanceDate + token_ttl` expiry gate.
//!
//! Gates are independent functions; sequencing them is the job of
//! `agentid-authz`.

pub mod credential;
pub mod trust;
pub mod validity;

pub use credential::{Credential, CredentialMetadata, CredentialSubject, VcError};
pub use trust::{TrustedIssuers, UntrustedIssuer};
pub use validity::{check_ttl, check_ttl_at, TemporalError, MAX_TOKEN_TTL_SECS};

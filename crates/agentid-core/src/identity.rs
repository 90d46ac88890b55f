//! # Agent Identity
//!
//! Agents are identified by a DID. New agents receive a `did:example:<uuid>`
//! identifier at registration or delegation time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// DID method used for agents minted by the broker.
pub const AGENT_DID_METHOD: &str = "example";

/// A decentralized identifier of the form `did:<method>:<method-specific-id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Mint a fresh agent DID.
    pub fn generate() -> Self {
        Self(format!("did:{AGENT_DID_METHOD}:{}", Uuid::new_v4()))
    }

    /// Parse and validate a DID string.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let mut parts = s.splitn(3, ':');
        let scheme = parts.next();
        let method = parts.next();
        let id = parts.next();
        match (scheme, method, id) {
            (Some("did"), Some(m), Some(id))
                if !m.is_empty()
                    && m.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                    && !id.is_empty() =>
            {
                Ok(Self(s))
            }
            _ => Err(ValidationError::InvalidDid(s)),
        }
    }

    /// Borrow the DID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID method (`example` for broker-minted agents).
    pub fn method(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }
}

impl TryFrom<String> for Did {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//! # Issuer trust
//!
//! A credential is only honored if its `issuer` is byte-for-byte one of the
//! configured identities. No prefix, case-folding, or DID resolution.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::credential::Credential;

/// The issuer was not in the trusted set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("untrusted issuer: {0:?}")]
pub struct UntrustedIssuer(pub String);

/// Immutable set of trusted issuer identities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustedIssuers(BTreeSet<String>);

impl TrustedIssuers {
    pub fn new<I, S>(issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(issuers.into_iter().map(Into::into).collect())
    }

    /// Parse a comma-separated list, trimming whitespace and dropping empties.
    pub fn from_csv(list: &str) -> Self {
        Self::new(list.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }

    pub fn contains(&self, issuer: &str) -> bool {
        self.0.contains(issuer)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Reject credentials whose issuer is not trusted.
    pub fn check(&self, credential: &Credential) -> Result<(), UntrustedIssuer> {
        if self.contains(&credential.issuer) {
            Ok(())
        } else {
            Err(UntrustedIssuer(credential.issuer.clone()))
        }
    }
}

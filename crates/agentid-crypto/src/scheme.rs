//! # Signing Schemes
//!
//! One credential format, two ways to prove it. Callers sign and verify
//! through [`ProofSigner`] / [`ProofVerifier`] and never match on the
//! scheme themselves. A proof is the base64 encoding of either an
//! HMAC-SHA256 tag or an Ed25519 signature over the credential's canonical
//! signing input.

use std::str::FromStr;

use agentid_core::{CanonicalBytes, CryptoError};

use crate::ed25519::{self, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use crate::encoding;
use crate::hmac::HmacKey;

/// Which proof algorithm a broker instance uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningScheme {
    Hmac,
    Ed25519,
}

impl SigningScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hmac => "hmac",
            Self::Ed25519 => "ed25519",
        }
    }
}

impl std::fmt::Display for SigningScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningScheme {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hmac" | "hmac-sha256" => Ok(Self::Hmac),
            "ed25519" => Ok(Self::Ed25519),
            other => Err(CryptoError::KeyError(format!(
                "unknown signing scheme {other:?} (expected \"hmac\" or \"ed25519\")"
            ))),
        }
    }
}

/// Produces a proof string over canonical bytes.
pub trait ProofSigner {
    fn scheme(&self) -> SigningScheme;
    fn sign_proof(&self, data: &CanonicalBytes) -> String;
}

/// Checks a proof string against canonical bytes.
///
/// Any malformed proof (bad base64, wrong length) is a verification
/// failure, never a panic.
pub trait ProofVerifier {
    fn scheme(&self) -> SigningScheme;
    fn verify_proof(&self, data: &CanonicalBytes, proof: &str) -> Result<(), CryptoError>;
}

/// The broker's signing key for whichever scheme is configured.
#[derive(Debug)]
pub enum CredentialSigner {
    Hmac(HmacKey),
    Ed25519(Ed25519KeyPair),
}

/// The key material needed to check a proof.
#[derive(Debug, Clone)]
pub enum CredentialVerifier {
    Hmac(HmacKey),
    Ed25519(Ed25519PublicKey),
}

impl CredentialSigner {
    /// The verifier matching this signer.
    pub fn verifier(&self) -> CredentialVerifier {
        match self {
            Self::Hmac(key) => CredentialVerifier::Hmac(key.clone()),
            Self::Ed25519(kp) => CredentialVerifier::Ed25519(kp.public_key()),
        }
    }

    /// The public key, when the scheme has one.
    pub fn public_key(&self) -> Option<Ed25519PublicKey> {
        match self {
            Self::Hmac(_) => None,
            Self::Ed25519(kp) => Some(kp.public_key()),
        }
    }
}

impl ProofSigner for CredentialSigner {
    fn scheme(&self) -> SigningScheme {
        match self {
            Self::Hmac(_) => SigningScheme::Hmac,
            Self::Ed25519(_) => SigningScheme::Ed25519,
        }
    }

    fn sign_proof(&self, data: &CanonicalBytes) -> String {
        match self {
            Self::Hmac(key) => key.tag(data).to_base64(),
            Self::Ed25519(kp) => kp.sign(data).to_base64(),
        }
    }
}

impl ProofVerifier for CredentialVerifier {
    fn scheme(&self) -> SigningScheme {
        match self {
            Self::Hmac(_) => SigningScheme::Hmac,
            Self::Ed25519(_) => SigningScheme::Ed25519,
        }
    }

    fn verify_proof(&self, data: &CanonicalBytes, proof: &str) -> Result<(), CryptoError> {
        match self {
            Self::Hmac(key) => {
                let tag = encoding::decode(proof)?;
                key.verify(data, &tag)
            }
            Self::Ed25519(pk) => {
                let sig = Ed25519Signature::from_base64(proof)?;
                ed25519::verify(data, &sig, pk)
            }
        }
    }
}

//! # Credential structure, issuance, and proof verification
//!
//! ## Security Invariants
//!
//! - **Signing** serializes the credential to a JSON tree, removes `proof`,
//!   canonicalizes the rest with [`CanonicalBytes::from_value()`], and stores
//!   the encoded tag or signature in `proof`.
//!
//! - **Verification** rebuilds the same signing input from the presented
//!   credential and checks `proof` against it. Every failure, including an
//!   undecodable proof, is reported as [`VcError::InvalidSignature`].
//!
//! - The envelope and the subject metadata are closed: unknown keys are a
//!   decode error. `role` and `token_ttl` are kept as raw JSON so that a
//!   missing or mistyped value is detected by the gate responsible for it
//!   rather than collapsing into a generic decode failure.
//!
//! - `issuanceDate` is stored as text and never re-rendered, so the bytes a
//!   verifier canonicalizes are the bytes the issuer signed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use agentid_core::{CanonicalBytes, Timestamp};
use agentid_crypto::{ProofSigner, ProofVerifier};

use crate::validity::MAX_TOKEN_TTL_SECS;

/// Errors from credential issuance and verification.
#[derive(Error, Debug)]
pub enum VcError {
    /// Canonicalization of the credential body failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] agentid_core::CanonicalizationError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Issuance was asked to sign metadata without a usable role or TTL.
    #[error("invalid credential metadata: {0}")]
    InvalidMetadata(String),

    /// The proof does not verify against the credential body.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// Role and lifetime claims carried by a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_ttl: Option<Value>,
}

impl CredentialMetadata {
    /// Metadata with a string role and an integer TTL in seconds.
    pub fn new(role: impl Into<String>, token_ttl: i64) -> Self {
        Self {
            role: Some(Value::String(role.into())),
            token_ttl: Some(Value::from(token_ttl)),
        }
    }

    /// The role, when present as a non-empty string.
    pub fn role(&self) -> Option<&str> {
        match &self.role {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }
}

/// The agent a credential speaks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialSubject {
    pub id: String,
    pub metadata: CredentialMetadata,
}

/// A signed delegation credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credential {
    pub issuer: String,
    #[serde(rename = "issuanceDate")]
    pub issuance_date: String,
    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,
    /// Base64 proof. Empty until [`Credential::sign`] runs.
    #[serde(default)]
    pub proof: String,
}

impl Credential {
    /// Build a credential with an empty proof. Nothing is validated.
    pub fn new_unsigned(
        issuer: impl Into<String>,
        issuance_date: impl Into<String>,
        subject_id: impl Into<String>,
        metadata: CredentialMetadata,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            issuance_date: issuance_date.into(),
            credential_subject: CredentialSubject {
                id: subject_id.into(),
                metadata,
            },
            proof: String::new(),
        }
    }

    /// Issue a credential dated now.
    pub fn issue<S: ProofSigner + ?Sized>(
        issuer: &str,
        subject_id: &str,
        role: &str,
        token_ttl: i64,
        signer: &S,
    ) -> Result<Self, VcError> {
        Self::issue_at(issuer, subject_id, role, token_ttl, Timestamp::now(), signer)
    }

    /// Issue a credential dated `issued_at`.
    ///
    /// The role must be a non-empty string and the TTL a positive number of
    /// seconds. Whether the role is known to any policy is not checked here.
    pub fn issue_at<S: ProofSigner + ?Sized>(
        issuer: &str,
        subject_id: &str,
        role: &str,
        token_ttl: i64,
        issued_at: Timestamp,
        signer: &S,
    ) -> Result<Self, VcError> {
        if role.trim().is_empty() {
            return Err(VcError::InvalidMetadata("role must be a non-empty string".into()));
        }
        if token_ttl <= 0 {
            return Err(VcError::InvalidMetadata(format!(
                "token_ttl must be a positive number of seconds, got {token_ttl}"
            )));
        }
        if token_ttl > MAX_TOKEN_TTL_SECS {
            return Err(VcError::InvalidMetadata(format!(
                "token_ttl may not exceed {MAX_TOKEN_TTL_SECS} seconds, got {token_ttl}"
            )));
        }
        let mut credential = Self::new_unsigned(
            issuer,
            issued_at.to_iso8601(),
            subject_id,
            CredentialMetadata::new(role, token_ttl),
        );
        credential.sign(signer)?;
        Ok(credential)
    }

    /// Canonical bytes of every field except `proof`.
    pub fn signing_input(&self) -> Result<CanonicalBytes, VcError> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(ref mut map) = value {
            map.remove("proof");
        }
        Ok(CanonicalBytes::from_value(value)?)
    }

    /// Compute and attach the proof, replacing any existing one.
    pub fn sign<S: ProofSigner + ?Sized>(&mut self, signer: &S) -> Result<(), VcError> {
        let input = self.signing_input()?;
        self.proof = signer.sign_proof(&input);
        Ok(())
    }

    /// Check `proof` against the credential body.
    pub fn verify_signature<V: ProofVerifier + ?Sized>(&self, verifier: &V) -> Result<(), VcError> {
        if self.proof.is_empty() {
            return Err(VcError::InvalidSignature("credential has no proof".into()));
        }
        let input = self.signing_input()?;
        verifier
            .verify_proof(&input, &self.proof)
            .map_err(|e| VcError::InvalidSignature(e.to_string()))
    }

    pub fn subject_id(&self) -> &str {
        &self.credential_subject.id
    }

    pub fn metadata(&self) -> &CredentialMetadata {
        &self.credential_subject.metadata
    }

    /// The role claim, when present as a non-empty string.
    pub fn role(&self) -> Option<&str> {
        self.credential_subject.metadata.role()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentid_crypto::{CredentialSigner, Ed25519KeyPair, HmacKey};

    const ISSUER: &str = "did:example:broker";
    const SUBJECT: &str = "did:example:agent-1";

    fn hmac_signer() -> CredentialSigner {
        CredentialSigner::Hmac(HmacKey::new(vec![9u8; 32]).unwrap())
    }

    fn ed_signer() -> CredentialSigner {
        CredentialSigner::Ed25519(Ed25519KeyPair::from_seed(&[9u8; 32]))
    }

    fn issued_at() -> Timestamp {
        Timestamp::parse("2026-01-15T12:00:00Z").unwrap()
    }

    #[test]
    fn issue_produces_expected_shape() {
        let cred =
            Credential::issue_at(ISSUER, SUBJECT, "data-fetcher", 3600, issued_at(), &hmac_signer())
                .unwrap();
        let json = serde_json::to_value(&cred).unwrap();
        assert_eq!(json["issuer"], ISSUER);
        assert_eq!(json["issuanceDate"], "2026-01-15T12:00:00Z");
        assert_eq!(json["credentialSubject"]["id"], SUBJECT);
        assert_eq!(json["credentialSubject"]["metadata"]["role"], "data-fetcher");
        assert_eq!(json["credentialSubject"]["metadata"]["token_ttl"], 3600);
        assert!(!cred.proof.is_empty());
        assert_eq!(json.as_object().unwrap().len(), 4);
    }

    #[test]
    fn issue_then_verify_both_schemes() {
        for signer in [hmac_signer(), ed_signer()] {
            let cred = Credential::issue(ISSUER, SUBJECT, "notifier", 60, &signer).unwrap();
            cred.verify_signature(&signer.verifier()).unwrap();
        }
    }

    #[test]
    fn issue_rejects_empty_role_and_nonpositive_ttl() {
        let signer = hmac_signer();
        assert!(matches!(
            Credential::issue(ISSUER, SUBJECT, "  ", 60, &signer),
            Err(VcError::InvalidMetadata(_))
        ));
        assert!(matches!(
            Credential::issue(ISSUER, SUBJECT, "notifier", 0, &signer),
            Err(VcError::InvalidMetadata(_))
        ));
        assert!(matches!(
            Credential::issue(ISSUER, SUBJECT, "notifier", -5, &signer),
            Err(VcError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn issue_caps_token_ttl() {
        let signer = hmac_signer();
        assert!(Credential::issue(ISSUER, SUBJECT, "notifier", MAX_TOKEN_TTL_SECS, &signer).is_ok());
        for ttl in [MAX_TOKEN_TTL_SECS + 1, i64::MAX] {
            assert!(matches!(
                Credential::issue(ISSUER, SUBJECT, "notifier", ttl, &signer),
                Err(VcError::InvalidMetadata(_))
            ));
        }
    }

    #[test]
    fn unknown_role_is_still_issued() {
        let cred = Credential::issue(ISSUER, SUBJECT, "astronaut", 60, &hmac_signer()).unwrap();
        assert_eq!(cred.role(), Some("astronaut"));
    }

    #[test]
    fn signing_input_excludes_proof() {
        let mut cred =
            Credential::issue_at(ISSUER, SUBJECT, "transformer", 10, issued_at(), &hmac_signer())
                .unwrap();
        let before = cred.signing_input().unwrap();
        cred.proof = "something else".into();
        assert_eq!(before, cred.signing_input().unwrap());
        let text = std::str::from_utf8(before.as_bytes()).unwrap();
        assert!(!text.contains("proof"));
        assert!(text.starts_with("{\"credentialSubject\":"));
    }

    #[test]
    fn tampered_role_fails_verification() {
        let signer = ed_signer();
        let mut cred = Credential::issue(ISSUER, SUBJECT, "data-fetcher", 60, &signer).unwrap();
        cred.credential_subject.metadata.role = Some(Value::String("admin".into()));
        assert!(matches!(
            cred.verify_signature(&signer.verifier()),
            Err(VcError::InvalidSignature(_))
        ));
    }

    #[test]
    fn missing_or_garbage_proof_is_invalid_signature() {
        let signer = hmac_signer();
        let mut cred = Credential::issue(ISSUER, SUBJECT, "notifier", 60, &signer).unwrap();
        cred.proof.clear();
        assert!(matches!(
            cred.verify_signature(&signer.verifier()),
            Err(VcError::InvalidSignature(_))
        ));
        cred.proof = "%%% not base64".into();
        assert!(matches!(
            cred.verify_signature(&signer.verifier()),
            Err(VcError::InvalidSignature(_))
        ));
    }

    #[test]
    fn decode_rejects_unknown_metadata_keys() {
        let json = serde_json::json!({
            "issuer": ISSUER,
            "issuanceDate": "2026-01-15T12:00:00Z",
            "credentialSubject": {
                "id": SUBJECT,
                "metadata": {"role": "notifier", "token_ttl": 60, "admin": true}
            },
            "proof": "AAAA"
        });
        assert!(serde_json::from_value::<Credential>(json).is_err());
    }

    #[test]
    fn decode_rejects_unknown_envelope_keys() {
        let json = serde_json::json!({
            "issuer": ISSUER,
            "issuanceDate": "2026-01-15T12:00:00Z",
            "credentialSubject": {"id": SUBJECT, "metadata": {}},
            "proof": "AAAA",
            "extra": 1
        });
        assert!(serde_json::from_value::<Credential>(json).is_err());
    }

    #[test]
    fn decode_keeps_mistyped_claims_for_the_gates() {
        let json = serde_json::json!({
            "issuer": ISSUER,
            "issuanceDate": "2026-01-15T12:00:00Z",
            "credentialSubject": {
                "id": SUBJECT,
                "metadata": {"role": 42, "token_ttl": "soon"}
            },
            "proof": "AAAA"
        });
        let cred: Credential = serde_json::from_value(json).unwrap();
        assert_eq!(cred.role(), None);
        assert_eq!(cred.metadata().token_ttl, Some(Value::String("soon".into())));
    }

    #[test]
    fn json_roundtrip_preserves_verifiability() {
        let signer = ed_signer();
        let cred = Credential::issue(ISSUER, SUBJECT, "transformer", 60, &signer).unwrap();
        let text = serde_json::to_string_pretty(&cred).unwrap();
        let back: Credential = serde_json::from_str(&text).unwrap();
        back.verify_signature(&signer.verifier()).unwrap();
    }

    #[test]
    fn float_ttl_signs_and_verifies() {
        let signer = hmac_signer();
        let mut cred = Credential::new_unsigned(
            ISSUER,
            "2026-01-15T12:00:00Z",
            SUBJECT,
            CredentialMetadata {
                role: Some(Value::String("notifier".into())),
                token_ttl: Some(serde_json::json!(1.5)),
            },
        );
        cred.sign(&signer).unwrap();
        let back: Credential = serde_json::from_str(&serde_json::to_string(&cred).unwrap()).unwrap();
        back.verify_signature(&signer.verifier()).unwrap();
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use agentid_crypto::{CredentialSigner, Ed25519KeyPair, HmacKey};
    use proptest::prelude::*;

    fn signer(seed: u8, ed25519: bool) -> CredentialSigner {
        if ed25519 {
            CredentialSigner::Ed25519(Ed25519KeyPair::from_seed(&[seed; 32]))
        } else {
            CredentialSigner::Hmac(HmacKey::new(vec![seed; 32]).unwrap())
        }
    }

    proptest! {
        /// A freshly issued credential verifies under the issuing key.
        #[test]
        fn issued_credentials_verify(
            role in "[a-z][a-z-]{0,20}",
            ttl in 1i64..10_000_000,
            seed in any::<u8>(),
            ed25519 in any::<bool>(),
        ) {
            let s = signer(seed, ed25519);
            let cred = Credential::issue("did:example:broker", "did:example:a", &role, ttl, &s).unwrap();
            prop_assert!(cred.verify_signature(&s.verifier()).is_ok());
        }

        /// Changing any signed field after issuance breaks the proof.
        #[test]
        fn mutation_breaks_proof(
            field in 0usize..5,
            ttl in 1i64..10_000_000,
            ed25519 in any::<bool>(),
        ) {
            let s = signer(3, ed25519);
            let mut cred = Credential::issue("did:example:broker", "did:example:a", "notifier", ttl, &s).unwrap();
            match field {
                0 => cred.issuer.push('x'),
                1 => cred.issuance_date = "1999-01-01T00:00:00Z".into(),
                2 => cred.credential_subject.id.push('x'),
                3 => cred.credential_subject.metadata.role = Some(Value::String("admin".into())),
                _ => cred.credential_subject.metadata.token_ttl = Some(Value::from(ttl + 1)),
            }
            prop_assert!(cred.verify_signature(&s.verifier()).is_err());
        }

        /// A different key never accepts the proof.
        #[test]
        fn other_key_rejects(a in any::<u8>(), b in any::<u8>(), ed25519 in any::<bool>()) {
            prop_assume!(a != b);
            let issuing = signer(a, ed25519);
            let other = signer(b, ed25519);
            let cred = Credential::issue("did:example:broker", "did:example:a", "notifier", 60, &issuing).unwrap();
            prop_assert!(cred.verify_signature(&other.verifier()).is_err());
        }
    }
}

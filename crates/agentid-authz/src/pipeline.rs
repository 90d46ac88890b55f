//! # Authorization pipeline
//!
//! Turns an `/execute` request body into an allow/deny decision by running
//! the gates in a fixed order and stopping at the first failure:
//!
//! | # | Gate | Denial |
//! |---|------|--------|
//! | 1 | decode `{credential, task}` | `MalformedPayload` |
//! | 2 | proof verification | `InvalidSignature` |
//! | 3 | trusted issuer | `UntrustedIssuer` |
//! | 4 | `issuanceDate + token_ttl` | `Expired`, `MalformedTemporalData` |
//! | 5 | role claim | `MissingRole` |
//! | 6 | policy table | `ActionNotRecognized`, `RoleNotPermitted` |
//!
//! Every outcome is written to the audit trail and the execution log before
//! the caller sees it. A log write failure is reported through `tracing`
//! and never changes the decision. Nothing is executed: an allowed request
//! only means the caller may go ahead.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use agentid_core::Timestamp;
use agentid_crypto::CredentialVerifier;
use agentid_vc::{check_ttl_at, Credential, TemporalError, TrustedIssuers};

use crate::audit::{AuditEntry, AuditOutcome, AuditTrail};
use crate::execution_log::{ExecutionLog, ExecutionRecord, ExecutionStatus};
use crate::policy::{PolicyError, PolicyTable};

/// The action an agent asks to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Body of an `/execute` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub credential: Credential,
    pub task: Task,
}

/// The gate that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Decode,
    Signature,
    Trust,
    Ttl,
    Role,
    Policy,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Signature => "signature",
            Self::Trust => "trust",
            Self::Ttl => "ttl",
            Self::Role => "role",
            Self::Policy => "policy",
        }
    }
}

/// Why a request was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    #[error("invalid payload: {0}")]
    MalformedPayload(String),

    #[error("invalid credential signature")]
    InvalidSignature,

    #[error("untrusted issuer")]
    UntrustedIssuer,

    #[error("expired credential")]
    Expired,

    #[error("malformed temporal data: {0}")]
    MalformedTemporalData(String),

    #[error("missing role")]
    MissingRole,

    #[error("policy check failed: action not allowed")]
    ActionNotRecognized,

    #[error("policy check failed: role not permitted to perform action")]
    RoleNotPermitted,
}

impl Denial {
    /// Stable machine-readable reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPayload(_) => "malformed_payload",
            Self::InvalidSignature => "invalid_signature",
            Self::UntrustedIssuer => "untrusted_issuer",
            Self::Expired => "expired",
            Self::MalformedTemporalData(_) => "malformed_temporal_data",
            Self::MissingRole => "missing_role",
            Self::ActionNotRecognized => "action_not_recognized",
            Self::RoleNotPermitted => "role_not_permitted",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::MalformedPayload(_) => Stage::Decode,
            Self::InvalidSignature => Stage::Signature,
            Self::UntrustedIssuer => Stage::Trust,
            Self::Expired | Self::MalformedTemporalData(_) => Stage::Ttl,
            Self::MissingRole => Stage::Role,
            Self::ActionNotRecognized | Self::RoleNotPermitted => Stage::Policy,
        }
    }
}

impl From<TemporalError> for Denial {
    fn from(e: TemporalError) -> Self {
        match e {
            TemporalError::Expired { .. } => Self::Expired,
            TemporalError::Malformed(detail) => Self::MalformedTemporalData(detail),
        }
    }
}

impl From<PolicyError> for Denial {
    fn from(e: PolicyError) -> Self {
        match e {
            PolicyError::ActionNotRecognized { .. } => Self::ActionNotRecognized,
            PolicyError::RoleNotPermitted { .. } => Self::RoleNotPermitted,
        }
    }
}

/// A permitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub subject_id: String,
    pub role: String,
    pub action: String,
    pub message: String,
}

// What the pipeline has learned about the request so far.
#[derive(Default)]
struct Known {
    subject_id: Option<String>,
    role: Option<String>,
    action: Option<String>,
}

/// Run the credential gates (signature, issuer trust, TTL) in order.
///
/// Shared by the pipeline and offline verification so both reject a
/// credential for the same reason.
pub fn check_credential(
    credential: &Credential,
    verifier: &CredentialVerifier,
    trusted: &TrustedIssuers,
    now: DateTime<Utc>,
) -> Result<(), Denial> {
    credential.verify_signature(verifier).map_err(|e| {
        tracing::debug!(error = %e, "credential proof rejected");
        Denial::InvalidSignature
    })?;
    trusted.check(credential).map_err(|_| Denial::UntrustedIssuer)?;
    check_ttl_at(credential, now)?;
    Ok(())
}

/// Default number of decisions kept in memory.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// Verifies credentials and evaluates policy for `/execute` requests.
///
/// Key material, trusted issuers and the policy table are immutable; the
/// audit trail and execution log are the only mutable state.
pub struct AuthorizationPipeline {
    verifier: CredentialVerifier,
    trusted_issuers: Arc<TrustedIssuers>,
    policy: Arc<PolicyTable>,
    execution_log: Arc<dyn ExecutionLog>,
    audit: Mutex<AuditTrail>,
}

impl AuthorizationPipeline {
    pub fn new(
        verifier: CredentialVerifier,
        trusted_issuers: Arc<TrustedIssuers>,
        policy: Arc<PolicyTable>,
        execution_log: Arc<dyn ExecutionLog>,
    ) -> Self {
        Self {
            verifier,
            trusted_issuers,
            policy,
            execution_log,
            audit: Mutex::new(AuditTrail::new(DEFAULT_AUDIT_CAPACITY)),
        }
    }

    /// Replace the in-memory audit trail with one of `capacity` entries.
    pub fn with_audit_capacity(mut self, capacity: usize) -> Self {
        self.audit = Mutex::new(AuditTrail::new(capacity));
        self
    }

    pub fn trusted_issuers(&self) -> &TrustedIssuers {
        &self.trusted_issuers
    }

    /// Authorize a raw request body against the current clock.
    pub fn authorize(&self, body: &[u8]) -> Result<Authorization, Denial> {
        self.authorize_at(body, Utc::now())
    }

    /// Authorize a raw request body as of `now`.
    pub fn authorize_at(&self, body: &[u8], now: DateTime<Utc>) -> Result<Authorization, Denial> {
        let mut known = Known::default();
        let result = self.evaluate(body, now, &mut known);
        self.record(&known, &result, now);
        result
    }

    fn evaluate(
        &self,
        body: &[u8],
        now: DateTime<Utc>,
        known: &mut Known,
    ) -> Result<Authorization, Denial> {
        let request: ExecuteRequest = serde_json::from_slice(body)
            .map_err(|e| Denial::MalformedPayload(e.to_string()))?;
        let ExecuteRequest { credential, task } = request;

        known.subject_id = Some(credential.subject_id().to_string());
        known.action = Some(task.action.clone());

        let checked = check_credential(&credential, &self.verifier, &self.trusted_issuers, now);
        // An unsigned role claim is never recorded as the caller's role.
        if !matches!(checked, Err(Denial::InvalidSignature)) {
            known.role = credential.role().map(String::from);
        }
        checked?;

        let role = credential.role().ok_or(Denial::MissingRole)?;

        self.policy.validate(&task.action, role)?;

        Ok(Authorization {
            subject_id: credential.subject_id().to_string(),
            role: role.to_string(),
            message: format!("{} authorized for {role}", task.action),
            action: task.action,
        })
    }

    fn record(&self, known: &Known, result: &Result<Authorization, Denial>, now: DateTime<Utc>) {
        let (outcome, status, reason, message) = match result {
            Ok(auth) => (
                AuditOutcome::Allowed,
                ExecutionStatus::Success,
                "allowed",
                auth.message.clone(),
            ),
            Err(denial) => (
                AuditOutcome::Denied,
                ExecutionStatus::Failure,
                denial.code(),
                denial.to_string(),
            ),
        };

        metrics::counter!(
            "agentid_authorization_decisions_total",
            "outcome" => outcome.as_str(),
            "reason" => reason
        )
        .increment(1);

        let entry = AuditEntry {
            timestamp: now,
            outcome,
            reason: reason.to_string(),
            message: message.clone(),
            subject_id: known.subject_id.clone(),
            role: known.role.clone(),
            action: known.action.clone(),
        };
        entry.emit();
        self.audit.lock().append(entry);

        let record = ExecutionRecord {
            timestamp: Timestamp::from_utc(now).to_iso8601(),
            agent_did: known.subject_id.clone().unwrap_or_default(),
            role: known.role.clone().unwrap_or_default(),
            action: known.action.clone().unwrap_or_default(),
            status,
            message,
        };
        if let Err(e) = self.execution_log.append(&record) {
            metrics::counter!("agentid_execution_log_failures_total").increment(1);
            tracing::error!(error = %e, "execution log write failed");
        }
    }

    /// Copy of the most recent `n` audit entries, oldest first.
    pub fn recent_audit(&self, n: usize) -> Vec<AuditEntry> {
        self.audit.lock().last_n(n).to_vec()
    }

    pub fn audit_len(&self) -> usize {
        self.audit.lock().len()
    }
}

impl std::fmt::Debug for AuthorizationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationPipeline")
            .field("scheme", &agentid_crypto::ProofVerifier::scheme(&self.verifier))
            .field("trusted_issuers", &self.trusted_issuers.len())
            .field("audit", &*self.audit.lock())
            .finish()
    }
}

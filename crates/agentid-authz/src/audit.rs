//! # Authorization Audit Trail
//!
//! One entry per authorization decision, allowed or denied.
//!
//! ## Security Invariant
//!
//! Every audit entry is individually digestable via `CanonicalBytes` +
//! `sha256_digest`. The in-memory trail is bounded: when it exceeds its
//! capacity the oldest 10% of entries are dropped. The durable record of
//! each decision is the execution log; the trail serves recent-history
//! queries. Each emitted audit event carries the entry's digest so a log
//! shipper can detect edits to shipped events.

use agentid_core::{sha256_digest, CanonicalBytes, ContentDigest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracing target for audit events.
pub const AUDIT_TARGET: &str = "agentid::audit";

/// The decision recorded by an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Allowed,
    Denied,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
        }
    }
}

impl std::fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single authorization decision.
///
/// `subject_id`, `role` and `action` are present only when the pipeline got
/// far enough to learn them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub outcome: AuditOutcome,
    /// Stable machine-readable reason, e.g. `untrusted_issuer`.
    pub reason: String,
    pub message: String,
    pub subject_id: Option<String>,
    pub role: Option<String>,
    pub action: Option<String>,
}

impl AuditEntry {
    /// Compute the content-addressed digest of this audit entry.
    ///
    /// Returns `None` if canonicalization fails.
    pub fn digest(&self) -> Option<ContentDigest> {
        let canonical = match CanonicalBytes::new(self) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(reason = %self.reason, error = %e, "audit entry canonicalization failed, digest unavailable");
                return None;
            }
        };
        Some(sha256_digest(&canonical))
    }

    /// Emit this entry as a structured event on [`AUDIT_TARGET`].
    ///
    /// `digest` is empty when the entry does not canonicalize.
    pub fn emit(&self) {
        let digest = self.digest().map(|d| d.to_hex()).unwrap_or_default();
        tracing::info!(
            target: AUDIT_TARGET,
            digest = %digest,
            outcome = %self.outcome,
            reason = %self.reason,
            subject = self.subject_id.as_deref().unwrap_or(""),
            role = self.role.as_deref().unwrap_or(""),
            action = self.action.as_deref().unwrap_or(""),
            "{}",
            self.message
        );
    }
}

impl PartialEq for AuditEntry {
    fn eq(&self, other: &Self) -> bool {
        self.outcome == other.outcome
            && self.reason == other.reason
            && self.message == other.message
            && self.subject_id == other.subject_id
            && self.role == other.role
            && self.action == other.action
    }
}

impl Eq for AuditEntry {}

/// An append-only audit trail with a configurable capacity.
///
/// Not `Sync`; the pipeline keeps it behind a mutex.
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
    max_entries: usize,
}

impl AuditTrail {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Append an entry, trimming the oldest 10% when over capacity.
    pub fn append(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let trim_count = (self.max_entries / 10).max(1);
            self.entries.drain(..trim_count.min(self.entries.len()));
        }
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last N entries (or all entries if fewer than N exist).
    pub fn last_n(&self, n: usize) -> &[AuditEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("entries", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

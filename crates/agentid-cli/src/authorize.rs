//! # Authorize Subcommand
//!
//! Runs an `/execute` request body through the full authorization
//! pipeline without a running broker. Decisions go to an in-memory log
//! unless `--log` names a JSONL file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde_json::{json, Value};

use agentid_authz::{
    AuthorizationPipeline, ExecutionLog, JsonlExecutionLog, MemoryExecutionLog, PolicyTable,
};
use agentid_crypto::CredentialVerifier;
use agentid_vc::TrustedIssuers;

use crate::{load_config, read_input, resolve_instant, EXIT_REJECTED};

/// Arguments for `agentid authorize`.
#[derive(Args, Debug)]
pub struct AuthorizeArgs {
    /// Execute request JSON (`{"credential": ..., "task": ...}`), or `-` for standard input.
    pub request: PathBuf,

    /// Policy file. Defaults to `BROKER_POLICY_FILE`.
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Append the decision to this JSONL execution log.
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Evaluate expiry as of this instant (RFC 3339) instead of now.
    #[arg(long)]
    pub at: Option<String>,
}

pub fn run_authorize(args: &AuthorizeArgs, out: &mut impl Write) -> Result<u8> {
    let config = load_config()?;
    let policy_path = args.policy.as_deref().unwrap_or(&config.policy_file);
    let policy = PolicyTable::load(policy_path)
        .with_context(|| format!("cannot load policy {}", policy_path.display()))?;
    let body = read_input(&args.request)?;
    let now = resolve_instant(args.at.as_deref())?;

    let (code, decision) = authorize_request(
        &body,
        config.signer.verifier(),
        config.trusted_issuers,
        policy,
        args.log.as_deref(),
        now,
    );
    serde_json::to_writer_pretty(&mut *out, &decision)?;
    writeln!(out)?;
    Ok(code)
}

/// Evaluate one request body. Returns the exit code and the JSON report.
pub fn authorize_request(
    body: &[u8],
    verifier: CredentialVerifier,
    trusted: TrustedIssuers,
    policy: PolicyTable,
    log_path: Option<&Path>,
    now: DateTime<Utc>,
) -> (u8, Value) {
    let log: Arc<dyn ExecutionLog> = match log_path {
        Some(path) => Arc::new(JsonlExecutionLog::new(path)),
        None => Arc::new(MemoryExecutionLog::new()),
    };
    let pipeline =
        AuthorizationPipeline::new(verifier, Arc::new(trusted), Arc::new(policy), log);

    match pipeline.authorize_at(body, now) {
        Ok(auth) => (
            0,
            json!({
                "allowed": true,
                "subject": auth.subject_id,
                "role": auth.role,
                "action": auth.action,
                "message": auth.message,
            }),
        ),
        Err(denial) => (
            EXIT_REJECTED,
            json!({
                "allowed": false,
                "stage": denial.stage().as_str(),
                "reason": denial.code(),
                "message": denial.to_string(),
            }),
        ),
    }
}

//! # Verify Subcommand
//!
//! Checks a credential the way `/execute` does up to, but not including,
//! the role and policy gates.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use agentid_authz::check_credential;
use agentid_vc::Credential;

use crate::{load_config, read_input, resolve_instant, EXIT_REJECTED};

/// Arguments for `agentid verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Credential JSON file, or `-` for standard input.
    pub credential: PathBuf,

    /// Evaluate expiry as of this instant (RFC 3339) instead of now.
    #[arg(long)]
    pub at: Option<String>,
}

pub fn run_verify(args: &VerifyArgs, out: &mut impl Write) -> Result<u8> {
    let config = load_config()?;
    let bytes = read_input(&args.credential)?;
    let credential: Credential =
        serde_json::from_slice(&bytes).context("credential is not well-formed")?;
    let now = resolve_instant(args.at.as_deref())?;

    let report = match check_credential(
        &credential,
        &config.signer.verifier(),
        &config.trusted_issuers,
        now,
    ) {
        Ok(()) => json!({
            "valid": true,
            "subject": credential.subject_id(),
            "role": credential.role(),
        }),
        Err(denial) => json!({
            "valid": false,
            "reason": denial.code(),
            "message": denial.to_string(),
        }),
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;

    Ok(if report["valid"] == true { 0 } else { EXIT_REJECTED })
}

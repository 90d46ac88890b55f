//! # Issue Subcommand
//!
//! Signs a credential with the configured broker key and prints it as
//! JSON. No agent record is written.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

use agentid_core::{Did, Timestamp};
use agentid_crypto::CredentialSigner;
use agentid_vc::Credential;

use crate::load_config;

/// Arguments for `agentid issue`.
#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Role granted by the credential.
    #[arg(long)]
    pub role: String,

    /// Lifetime in seconds.
    #[arg(long)]
    pub ttl: i64,

    /// Subject DID. A new `did:example:` identifier is generated when omitted.
    #[arg(long)]
    pub subject: Option<String>,

    /// Issuance instant (RFC 3339). Defaults to now.
    #[arg(long)]
    pub issued_at: Option<String>,
}

pub fn run_issue(args: &IssueArgs, out: &mut impl Write) -> Result<u8> {
    let config = load_config()?;
    let credential = issue_credential(args, &config.issuer, &config.signer)?;
    serde_json::to_writer_pretty(&mut *out, &credential)?;
    writeln!(out)?;
    Ok(0)
}

pub fn issue_credential(
    args: &IssueArgs,
    issuer: &str,
    signer: &CredentialSigner,
) -> Result<Credential> {
    let subject = match &args.subject {
        Some(s) => Did::new(s.trim()).context("invalid --subject")?,
        None => Did::generate(),
    };
    let issued_at = match &args.issued_at {
        Some(s) => Timestamp::parse_lenient(s).context("invalid --issued-at")?,
        None => Timestamp::now(),
    };
    let credential = Credential::issue_at(
        issuer,
        subject.as_str(),
        &args.role,
        args.ttl,
        issued_at,
        signer,
    )?;
    tracing::info!(subject = %subject, role = %args.role, ttl = args.ttl, "credential issued");
    Ok(credential)
}

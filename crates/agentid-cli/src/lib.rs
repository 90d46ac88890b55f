//! # agentid-cli: Offline Tooling for the Agent Identity Broker
//!
//! Provides the `agentid` command-line interface. Every subcommand except
//! `keygen` reads the same `BROKER_*` environment the broker binary reads,
//! so a credential issued here verifies against a running broker and vice
//! versa.
//!
//! ## Subcommands
//!
//! - `agentid keygen`: Generate signing material for either scheme.
//! - `agentid issue`: Sign a credential with the configured key.
//! - `agentid verify`: Run the signature, issuer trust, and TTL gates on a credential.
//! - `agentid authorize`: Run the full authorization pipeline on an execute request.
//!
//! ## Exit Codes
//!
//! `0` success, `1` usage or configuration error, `2` credential or
//! request rejected.

pub mod authorize;
pub mod issue;
pub mod keygen;
pub mod verify;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use agentid_api::config::BrokerConfig;
use agentid_core::Timestamp;

/// Exit code for a rejected credential or request.
pub const EXIT_REJECTED: u8 = 2;

/// Load broker configuration from the process environment.
pub fn load_config() -> Result<BrokerConfig> {
    BrokerConfig::from_env().context("broker configuration incomplete")
}

/// Read a file, or standard input when the path is `-`.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read standard input")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Resolve an optional `--at` instant, defaulting to the current time.
pub fn resolve_instant(at: Option<&str>) -> Result<DateTime<Utc>> {
    match at {
        Some(s) => Ok(*Timestamp::parse_lenient(s)
            .with_context(|| format!("invalid timestamp {s:?}"))?
            .as_datetime()),
        None => Ok(Utc::now()),
    }
}

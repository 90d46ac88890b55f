//! # Broker configuration
//!
//! Read once from the environment at startup. Key material, trusted
//! issuers and the policy file have no defaults: a broker that cannot find
//! them refuses to start.
//!
//! | Variable | Required | Default |
//! |---|---|---|
//! | `BROKER_ISSUER` | yes | |
//! | `BROKER_SIGNING_SCHEME` | yes | |
//! | `BROKER_SIGNING_SECRET` | when scheme is `hmac` | |
//! | `BROKER_ED25519_PRIVATE_KEY` | when scheme is `ed25519` | |
//! | `BROKER_TRUSTED_ISSUERS` | yes | |
//! | `BROKER_POLICY_FILE` | yes | |
//! | `BROKER_OPERATOR_TOKEN` | no | operator auth disabled |
//! | `BROKER_PORT` | no | `8081` |
//! | `EXECUTION_LOG_PATH` | no | `data/execution.log` |
//! | `STORAGE_PATH` | no | `data/agents.json` |

use std::path::PathBuf;

use thiserror::Error;

use agentid_crypto::{CredentialSigner, Ed25519KeyPair, HmacKey, SigningScheme};
use agentid_vc::TrustedIssuers;

use crate::auth::SecretToken;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_EXECUTION_LOG_PATH: &str = "data/execution.log";
pub const DEFAULT_STORAGE_PATH: &str = "data/agents.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Everything the broker needs to start.
#[derive(Debug)]
pub struct BrokerConfig {
    pub issuer: String,
    pub signer: CredentialSigner,
    pub trusted_issuers: TrustedIssuers,
    pub policy_file: PathBuf,
    pub operator_token: Option<SecretToken>,
    pub port: u16,
    pub execution_log_path: PathBuf,
    pub storage_path: PathBuf,
}

impl BrokerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let issuer = require("BROKER_ISSUER")?.trim().to_string();

        let scheme: SigningScheme =
            require("BROKER_SIGNING_SCHEME")?
                .parse()
                .map_err(|e: agentid_core::CryptoError| ConfigError::Invalid {
                    var: "BROKER_SIGNING_SCHEME",
                    reason: e.to_string(),
                })?;

        let signer = match scheme {
            SigningScheme::Hmac => {
                let secret = require("BROKER_SIGNING_SECRET")?;
                HmacKey::new(secret.into_bytes())
                    .map(CredentialSigner::Hmac)
                    .map_err(|e| ConfigError::Invalid {
                        var: "BROKER_SIGNING_SECRET",
                        reason: e.to_string(),
                    })?
            }
            SigningScheme::Ed25519 => {
                let seed = require("BROKER_ED25519_PRIVATE_KEY")?;
                Ed25519KeyPair::from_base64_seed(&seed)
                    .map(CredentialSigner::Ed25519)
                    .map_err(|e| ConfigError::Invalid {
                        var: "BROKER_ED25519_PRIVATE_KEY",
                        reason: e.to_string(),
                    })?
            }
        };

        let trusted_issuers = TrustedIssuers::from_csv(&require("BROKER_TRUSTED_ISSUERS")?);
        if trusted_issuers.is_empty() {
            return Err(ConfigError::Invalid {
                var: "BROKER_TRUSTED_ISSUERS",
                reason: "no issuer identities listed".into(),
            });
        }

        let policy_file = PathBuf::from(require("BROKER_POLICY_FILE")?);

        let port = match get("BROKER_PORT") {
            Some(p) => p.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "BROKER_PORT",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            issuer,
            signer,
            trusted_issuers,
            policy_file,
            operator_token: get("BROKER_OPERATOR_TOKEN").map(SecretToken::new),
            port,
            execution_log_path: get("EXECUTION_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXECUTION_LOG_PATH)),
            storage_path: get("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH)),
        })
    }
}

//! # Keygen Subcommand
//!
//! Prints fresh signing material as `KEY=value` lines that can be pasted
//! into the broker's environment file. For Ed25519 the public key is
//! printed as a comment for distribution to delegatees.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use agentid_crypto::{Ed25519KeyPair, HmacKey, SigningScheme};

/// Arguments for `agentid keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Signing scheme: `hmac` or `ed25519`.
    #[arg(long, default_value = "ed25519")]
    pub scheme: SigningScheme,
}

pub fn run_keygen(args: &KeygenArgs, out: &mut impl Write) -> Result<u8> {
    writeln!(out, "BROKER_SIGNING_SCHEME={}", args.scheme)?;
    match args.scheme {
        SigningScheme::Hmac => {
            writeln!(out, "BROKER_SIGNING_SECRET={}", HmacKey::generate().to_base64())?;
        }
        SigningScheme::Ed25519 => {
            let keypair = Ed25519KeyPair::generate();
            writeln!(out, "BROKER_ED25519_PRIVATE_KEY={}", keypair.to_base64_seed())?;
            writeln!(out, "# public key: {}", keypair.public_key())?;
        }
    }
    tracing::info!(scheme = %args.scheme, "generated signing material");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentid_api::config::BrokerConfig;
    use std::collections::HashMap;

    fn generate(scheme: SigningScheme) -> HashMap<String, String> {
        let mut out = Vec::new();
        run_keygen(&KeygenArgs { scheme }, &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .filter_map(|l| l.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn accepted_by_broker(mut vars: HashMap<String, String>) -> BrokerConfig {
        vars.insert("BROKER_ISSUER".into(), "did:example:broker".into());
        vars.insert("BROKER_TRUSTED_ISSUERS".into(), "did:example:broker".into());
        vars.insert("BROKER_POLICY_FILE".into(), "policy.yaml".into());
        BrokerConfig::from_lookup(|k| vars.get(k).cloned()).unwrap()
    }

    #[test]
    fn hmac_output_configures_broker() {
        let vars = generate(SigningScheme::Hmac);
        assert_eq!(vars["BROKER_SIGNING_SCHEME"], "hmac");
        let cfg = accepted_by_broker(vars);
        assert!(cfg.signer.public_key().is_none());
    }

    #[test]
    fn ed25519_output_configures_broker() {
        let vars = generate(SigningScheme::Ed25519);
        assert_eq!(vars["BROKER_SIGNING_SCHEME"], "ed25519");
        let cfg = accepted_by_broker(vars);
        assert!(cfg.signer.public_key().is_some());
    }

    #[test]
    fn each_run_is_fresh() {
        let a = generate(SigningScheme::Ed25519);
        let b = generate(SigningScheme::Ed25519);
        assert_ne!(a["BROKER_ED25519_PRIVATE_KEY"], b["BROKER_ED25519_PRIVATE_KEY"]);
    }
}

//! # Application State
//!
//! Shared by every handler. Everything here is either immutable (issuer
//! identity, signing key, policy, trusted issuers) or internally
//! synchronized (audit trail, execution log, agent store), so cloning the
//! state is cheap and needs no outer lock.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;

use agentid_authz::{AuthorizationPipeline, JsonlExecutionLog, PolicyLoadError, PolicyTable};
use agentid_crypto::{CredentialSigner, Ed25519PublicKey, ProofSigner, SigningScheme};
use agentid_vc::{Credential, VcError};

use crate::auth::{OperatorAuthenticator, StaticTokenAuthenticator};
use crate::config::BrokerConfig;
use crate::store::{AgentStore, FileAgentStore, StoreError};

/// The broker's issuing identity and key.
#[derive(Debug)]
pub struct CredentialIssuer {
    issuer: String,
    signer: CredentialSigner,
}

impl CredentialIssuer {
    pub fn new(issuer: impl Into<String>, signer: CredentialSigner) -> Self {
        Self {
            issuer: issuer.into(),
            signer,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn scheme(&self) -> SigningScheme {
        self.signer.scheme()
    }

    pub fn public_key(&self) -> Option<Ed25519PublicKey> {
        self.signer.public_key()
    }

    /// Sign a credential for `subject_id` dated now.
    pub fn issue(&self, subject_id: &str, role: &str, token_ttl: i64) -> Result<Credential, VcError> {
        Credential::issue(&self.issuer, subject_id, role, token_ttl, &self.signer)
    }
}

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Policy(#[from] PolicyLoadError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<CredentialIssuer>,
    pub pipeline: Arc<AuthorizationPipeline>,
    pub store: Arc<dyn AgentStore>,
    pub operator_auth: Option<Arc<dyn OperatorAuthenticator>>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        issuer: CredentialIssuer,
        pipeline: AuthorizationPipeline,
        store: Arc<dyn AgentStore>,
    ) -> Self {
        Self {
            issuer: Arc::new(issuer),
            pipeline: Arc::new(pipeline),
            store,
            operator_auth: None,
            metrics: None,
        }
    }

    pub fn with_operator_auth(mut self, authenticator: Arc<dyn OperatorAuthenticator>) -> Self {
        self.operator_auth = Some(authenticator);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the state from configuration: load the policy file, open the
    /// agent store, and wire the execution log.
    pub fn from_config(config: BrokerConfig) -> Result<Self, BootstrapError> {
        let policy = PolicyTable::load(&config.policy_file)?;
        let store = FileAgentStore::open(&config.storage_path)?;

        let pipeline = AuthorizationPipeline::new(
            config.signer.verifier(),
            Arc::new(config.trusted_issuers),
            Arc::new(policy),
            Arc::new(JsonlExecutionLog::new(config.execution_log_path)),
        );

        let mut state = Self::new(
            CredentialIssuer::new(config.issuer, config.signer),
            pipeline,
            Arc::new(store),
        );

        match config.operator_token {
            Some(token) => {
                state = state.with_operator_auth(Arc::new(StaticTokenAuthenticator::new(token)));
            }
            None => {
                tracing::warn!(
                    "BROKER_OPERATOR_TOKEN not set: credential issuance endpoints are unauthenticated"
                );
            }
        }

        tracing::info!(
            issuer = %state.issuer.issuer(),
            scheme = %state.issuer.scheme(),
            trusted_issuers = state.pipeline.trusted_issuers().len(),
            "broker state initialized"
        );
        Ok(state)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("issuer", &self.issuer.issuer())
            .field("scheme", &self.issuer.scheme())
            .field("agents", &self.store.len())
            .field("operator_auth", &self.operator_auth.is_some())
            .finish()
    }
}

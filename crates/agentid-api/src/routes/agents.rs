//! Operator-only credential issuance.
//!
//! - `POST /register-agent` mints a DID for a new agent, issues its
//!   credential, and records `{did, owner, metadata, credential}` in the
//!   agent store. The store write runs on the blocking pool; a failure is
//!   logged and the credential is still returned.
//! - `POST /delegate` issues a credential for `delegatee_did` (or a fresh
//!   DID) without registering it.
//!
//! Both respond with `{"did": ..., "credential": ...}`.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use agentid_core::Did;
use agentid_vc::{Credential, VcError};

use crate::auth::OperatorIdentity;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::AgentRecord;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterAgentRequest {
    pub role: String,
    pub token_ttl: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelegateRequest {
    pub role: String,
    pub token_ttl: i64,
    #[serde(default)]
    pub delegatee_did: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IssuedCredential {
    pub did: String,
    pub credential: Credential,
}

/// Routes that require operator authentication.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register-agent", post(register_agent))
        .route("/delegate", post(delegate))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "rejecting issuance request body");
        AppError::BadRequest("invalid payload".into())
    })
}

fn issue(state: &AppState, did: &Did, role: &str, token_ttl: i64) -> Result<Credential, AppError> {
    state
        .issuer
        .issue(did.as_str(), role, token_ttl)
        .map_err(|e| match e {
            VcError::InvalidMetadata(reason) => AppError::BadRequest(reason),
            other => AppError::Internal(other.to_string()),
        })
}

async fn register_agent(
    State(state): State<AppState>,
    operator: OperatorIdentity,
    body: Bytes,
) -> Result<Json<IssuedCredential>, AppError> {
    let req: RegisterAgentRequest = parse_body(&body)?;
    let did = Did::generate();
    let credential = issue(&state, &did, &req.role, req.token_ttl)?;

    let record = AgentRecord {
        did: did.to_string(),
        owner: operator.subject.clone(),
        metadata: credential.metadata().clone(),
        credential: credential.clone(),
    };
    let store = state.store.clone();
    let saved = tokio::task::spawn_blocking(move || store.save(record))
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));
    if let Err(e) = saved {
        metrics::counter!("agentid_store_failures_total").increment(1);
        tracing::error!(%did, error = %e, "failed to persist agent record");
    }

    metrics::counter!("agentid_credentials_issued_total", "route" => "register-agent").increment(1);
    tracing::info!(%did, owner = %operator.subject, role = %req.role, "agent registered");

    Ok(Json(IssuedCredential {
        did: did.to_string(),
        credential,
    }))
}

async fn delegate(
    State(state): State<AppState>,
    operator: OperatorIdentity,
    body: Bytes,
) -> Result<Json<IssuedCredential>, AppError> {
    let req: DelegateRequest = parse_body(&body)?;
    let did = match req.delegatee_did {
        Some(ref s) => Did::new(s.trim()).map_err(|e| AppError::BadRequest(e.to_string()))?,
        None => Did::generate(),
    };
    let credential = issue(&state, &did, &req.role, req.token_ttl)?;

    metrics::counter!("agentid_credentials_issued_total", "route" => "delegate").increment(1);
    tracing::info!(%did, operator = %operator.subject, role = %req.role, "delegation issued");

    Ok(Json(IssuedCredential {
        did: did.to_string(),
        credential,
    }))
}

//! `GET /issuer-key`
//!
//! Publishes the Ed25519 public key so delegatees can verify tokens
//! offline. An HMAC broker has no public half and answers 404.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use agentid_crypto::Ed25519PublicKey;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IssuerKeyResponse {
    pub issuer: String,
    pub scheme: &'static str,
    pub public_key: Ed25519PublicKey,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/issuer-key", get(issuer_key))
}

async fn issuer_key(State(state): State<AppState>) -> Result<Json<IssuerKeyResponse>, AppError> {
    let public_key = state.issuer.public_key().ok_or_else(|| {
        AppError::NotFound("this broker signs with a shared secret; no public key".into())
    })?;
    Ok(Json(IssuerKeyResponse {
        issuer: state.issuer.issuer().to_string(),
        scheme: state.issuer.scheme().as_str(),
        public_key,
    }))
}

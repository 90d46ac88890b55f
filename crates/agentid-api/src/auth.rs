//! # Operator Authentication Middleware
//!
//! Credential issuance (`/register-agent`, `/delegate`) is reserved for
//! human operators. The middleware checks the `Authorization: Bearer …`
//! header through an [`OperatorAuthenticator`] and injects the resulting
//! [`OperatorIdentity`] into request extensions; handlers record its
//! subject as the owner of the agents they create.
//!
//! ## Token Format
//!
//! The bundled [`StaticTokenAuthenticator`] accepts:
//!
//! ```text
//! Bearer {secret}             : subject "operator"
//! Bearer {subject}:{secret}   : subject taken from the token
//! ```
//!
//! Deployments fronted by an identity provider plug in their own
//! authenticator; the middleware and handlers do not change.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::AppError;

/// Subject recorded when the bearer token carries no subject of its own.
pub const DEFAULT_OPERATOR_SUBJECT: &str = "operator";

/// Subject recorded when operator authentication is disabled.
pub const ANONYMOUS_OPERATOR_SUBJECT: &str = "anonymous";

// ── SecretToken ─────────────────────────────────────────────────────────────

/// A bearer secret. Zeroized on drop, redacted in `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken([REDACTED])")
    }
}

// ── OperatorIdentity ────────────────────────────────────────────────────────

/// The authenticated human operator behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorIdentity {
    pub subject: String,
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for OperatorIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OperatorIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no operator identity in request context".into()))
    }
}

// ── Authenticators ──────────────────────────────────────────────────────────

/// Verifies an operator bearer token.
pub trait OperatorAuthenticator: Send + Sync {
    fn authenticate(&self, bearer: &str) -> Result<OperatorIdentity, String>;
}

/// Checks bearer tokens against one configured secret.
#[derive(Debug, Clone)]
pub struct StaticTokenAuthenticator {
    secret: SecretToken,
}

impl StaticTokenAuthenticator {
    pub fn new(secret: SecretToken) -> Self {
        Self { secret }
    }
}

impl OperatorAuthenticator for StaticTokenAuthenticator {
    fn authenticate(&self, bearer: &str) -> Result<OperatorIdentity, String> {
        let expected = self.secret.expose();
        if constant_time_token_eq(bearer, expected) {
            return Ok(OperatorIdentity {
                subject: DEFAULT_OPERATOR_SUBJECT.to_string(),
            });
        }
        match bearer.rsplit_once(':') {
            Some((subject, secret))
                if !subject.is_empty() && constant_time_token_eq(secret, expected) =>
            {
                Ok(OperatorIdentity {
                    subject: subject.to_string(),
                })
            }
            _ => Err("invalid bearer token".into()),
        }
    }
}

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, performs a dummy comparison so the mismatch path
/// does the same work as the match path.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

// ── Middleware ──────────────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// `None` disables operator authentication.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub authenticator: Option<Arc<dyn OperatorAuthenticator>>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.authenticator.is_some())
            .finish()
    }
}

/// Authenticate the operator and inject [`OperatorIdentity`].
///
/// With authentication disabled every request proceeds as
/// [`ANONYMOUS_OPERATOR_SUBJECT`].
pub async fn operator_auth_middleware(mut request: Request, next: Next) -> Response {
    let authenticator = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.authenticator.clone());

    let Some(authenticator) = authenticator else {
        request.extensions_mut().insert(OperatorIdentity {
            subject: ANONYMOUS_OPERATOR_SUBJECT.to_string(),
        });
        return next.run(request).await;
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let identity = match auth_header {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(token) => authenticator.authenticate(token.trim()),
            None => Err("authorization header must use Bearer scheme".to_string()),
        },
        None => Err("missing authorization header".to_string()),
    };

    match identity {
        Ok(identity) => {
            tracing::debug!(subject = %identity.subject, "operator authenticated");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(reason) => {
            tracing::warn!(%reason, "operator authentication failed");
            AppError::Unauthorized(reason).into_response()
        }
    }
}

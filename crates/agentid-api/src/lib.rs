//! # agentid-api: HTTP Service for the Agent Identity Broker
//!
//! ## API Surface
//!
//! | Route | Auth | Module |
//! |---|---|---|
//! | `POST /register-agent` | operator | [`routes::agents`] |
//! | `POST /delegate` | operator | [`routes::agents`] |
//! | `POST /execute` | credential in body | [`routes::execute`] |
//! | `GET /issuer-key` | none | [`routes::issuer`] |
//! | `GET /health/liveness`, `GET /health/readiness` | none | here |
//! | `GET /metrics` | none | here |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → OperatorAuth (issuance routes only) → Handler
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;

use axum::extract::State;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        authenticator: state.operator_auth.clone(),
    };

    let operator = routes::agents::router()
        .route_layer(from_fn(auth::operator_auth_middleware))
        .layer(axum::Extension(auth_config));

    let public = Router::new()
        .merge(routes::execute::router())
        .merge(routes::issuer::router())
        .route("/metrics", get(render_metrics))
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new()
        .merge(operator)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe. Returns 200 while the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: state is fully built before the listener binds.
async fn readiness() -> &'static str {
    "ready"
}

async fn render_metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| AppError::NotFound("metrics exporter not installed".into()))
}

//! `POST /execute`
//!
//! ```json
//! {"credential": {...}, "task": {"action": "fetch_data", "params": {...}}}
//! ```
//!
//! The body is handed to the authorization pipeline untouched so a
//! malformed payload is recorded like any other denial. The pipeline does
//! synchronous file I/O and runs on the blocking pool.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub result: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/execute", post(execute))
}

async fn execute(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ExecuteResponse>, AppError> {
    let pipeline = state.pipeline.clone();
    let decision = tokio::task::spawn_blocking(move || pipeline.authorize(&body))
        .await
        .map_err(|e| AppError::Internal(format!("authorization task failed: {e}")))?;

    let authorization = decision?;
    tracing::info!(
        subject = %authorization.subject_id,
        role = %authorization.role,
        action = %authorization.action,
        "action authorized"
    );
    Ok(Json(ExecuteResponse { result: "ok" }))
}

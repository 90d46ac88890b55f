//! HTTP-level tests against the assembled router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use agentid_api::auth::{OperatorAuthenticator, SecretToken, StaticTokenAuthenticator};
use agentid_api::state::{AppState, CredentialIssuer};
use agentid_api::store::{AgentStore, FileAgentStore, MemoryAgentStore};
use agentid_authz::{AuthorizationPipeline, ExecutionStatus, MemoryExecutionLog, PolicyTable};
use agentid_core::Timestamp;
use agentid_crypto::{CredentialSigner, Ed25519KeyPair, HmacKey};
use agentid_vc::{Credential, CredentialMetadata, TrustedIssuers, MAX_TOKEN_TTL_SECS};

const BROKER: &str = "did:example:broker";
const OPERATOR_TOKEN: &str = "operator-secret-token";

const POLICY: &str = r#"
actions: [fetch_data, transform, notify]
roles:
  data-fetcher: [fetch_data]
  transformer: [transform]
  notifier: [notify]
"#;

struct Harness {
    app: Router,
    signer: CredentialSigner,
    log: Arc<MemoryExecutionLog>,
    store: Arc<MemoryAgentStore>,
}

fn hmac_signer() -> CredentialSigner {
    CredentialSigner::Hmac(HmacKey::new(b"fedcba9876543210fedcba9876543210".to_vec()).unwrap())
}

fn harness_with(signer: CredentialSigner, operator_token: Option<&str>) -> Harness {
    let log = Arc::new(MemoryExecutionLog::new());
    let store = Arc::new(MemoryAgentStore::new());
    let pipeline = AuthorizationPipeline::new(
        signer.verifier(),
        Arc::new(TrustedIssuers::new([BROKER])),
        Arc::new(PolicyTable::from_yaml_str(POLICY).unwrap()),
        log.clone(),
    );
    let issuer_signer = match &signer {
        CredentialSigner::Hmac(key) => CredentialSigner::Hmac(key.clone()),
        CredentialSigner::Ed25519(kp) => {
            CredentialSigner::Ed25519(Ed25519KeyPair::from_base64_seed(&kp.to_base64_seed()).unwrap())
        }
    };
    let mut state = AppState::new(
        CredentialIssuer::new(BROKER, issuer_signer),
        pipeline,
        store.clone(),
    );
    if let Some(token) = operator_token {
        let auth: Arc<dyn OperatorAuthenticator> =
            Arc::new(StaticTokenAuthenticator::new(SecretToken::new(token)));
        state = state.with_operator_auth(auth);
    }
    Harness {
        app: agentid_api::app(state),
        signer,
        log,
        store,
    }
}

fn harness() -> Harness {
    harness_with(hmac_signer(), Some(OPERATOR_TOKEN))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    });
    (status, value)
}

fn post_json(uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(serde_json::to_vec(body).unwrap())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn execute_body(credential: &Credential, action: &str) -> Value {
    json!({"credential": credential, "task": {"action": action, "params": {}}})
}

fn credential(h: &Harness, issuer: &str, role: &str, ttl: i64) -> Credential {
    Credential::issue(issuer, "did:example:agent", role, ttl, &h.signer).unwrap()
}

// ── /execute ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn execute_allowed_returns_ok() {
    let h = harness();
    let cred = credential(&h, BROKER, "data-fetcher", 3600);

    let (status, body) = send(&h.app, post_json("/execute", &execute_body(&cred, "fetch_data"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"result": "ok"}));

    let records = h.log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ExecutionStatus::Success);
}

#[tokio::test]
async fn execute_expired_credential_is_401() {
    let h = harness();
    let issued = Timestamp::from_utc(Utc::now() - Duration::minutes(10));
    let cred =
        Credential::issue_at(BROKER, "did:example:agent", "data-fetcher", 2, issued, &h.signer)
            .unwrap();

    let (status, body) = send(&h.app, post_json("/execute", &execute_body(&cred, "fetch_data"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({"error": "expired_token", "message": "The delegation token has expired."})
    );
    assert_eq!(h.log.records()[0].status, ExecutionStatus::Failure);
}

#[tokio::test]
async fn execute_non_numeric_ttl_is_treated_as_expired() {
    let h = harness();
    let mut cred = Credential::new_unsigned(
        BROKER,
        Timestamp::now().to_iso8601(),
        "did:example:agent",
        CredentialMetadata {
            role: Some(json!("data-fetcher")),
            token_ttl: Some(json!("soon")),
        },
    );
    cred.sign(&h.signer).unwrap();

    let (status, body) = send(&h.app, post_json("/execute", &execute_body(&cred, "fetch_data"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({"error": "expired_token", "message": "The delegation token has expired."})
    );

    let record = &h.log.records()[0];
    assert_eq!(record.status, ExecutionStatus::Failure);
    assert!(record.message.starts_with("malformed temporal data"), "{}", record.message);
}

#[tokio::test]
async fn execute_role_mismatch_is_403() {
    let h = harness();
    let cred = credential(&h, BROKER, "data-fetcher", 3600);

    let (status, body) = send(&h.app, post_json("/execute", &execute_body(&cred, "notify"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert_eq!(
        body["message"],
        "policy check failed: role not permitted to perform action"
    );
}

#[tokio::test]
async fn execute_unknown_action_is_403() {
    let h = harness();
    let cred = credential(&h, BROKER, "data-fetcher", 3600);

    let (status, body) =
        send(&h.app, post_json("/execute", &execute_body(&cred, "delete_all"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "policy check failed: action not allowed");
}

#[tokio::test]
async fn execute_untrusted_issuer_is_generic_401() {
    let h = harness();
    let cred = credential(&h, "did:example:impostor", "data-fetcher", 3600);

    let (status, body) = send(&h.app, post_json("/execute", &execute_body(&cred, "fetch_data"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({"error": "invalid_credential", "message": "credential rejected"})
    );
}

#[tokio::test]
async fn execute_malformed_body_is_400_and_logged() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/execute")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_payload");
    assert_eq!(h.log.records().len(), 1);
    assert_eq!(h.log.records()[0].status, ExecutionStatus::Failure);
}

#[tokio::test]
async fn execute_does_not_require_operator_token() {
    let h = harness();
    let cred = credential(&h, BROKER, "notifier", 60);
    let (status, _) = send(&h.app, post_json("/execute", &execute_body(&cred, "notify"), None)).await;
    assert_eq!(status, StatusCode::OK);
}

// ── /register-agent and /delegate ───────────────────────────────────────────

#[tokio::test]
async fn register_agent_requires_operator_token() {
    let h = harness();
    let req = json!({"role": "notifier", "token_ttl": 60});

    let (status, body) = send(&h.app, post_json("/register-agent", &req, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(&h.app, post_json("/register-agent", &req, Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn register_agent_issues_and_stores_credential() {
    let h = harness();
    let req = json!({"role": "notifier", "token_ttl": 60});
    let token = format!("alice:{OPERATOR_TOKEN}");

    let (status, body) = send(&h.app, post_json("/register-agent", &req, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let did = body["did"].as_str().unwrap().to_string();
    assert!(did.starts_with("did:"));
    assert_eq!(body["credential"]["issuer"], BROKER);
    assert_eq!(body["credential"]["credentialSubject"]["id"], did.as_str());
    assert_eq!(body["credential"]["credentialSubject"]["metadata"]["role"], "notifier");

    let record = h.store.get(&did).unwrap();
    assert_eq!(record.owner, "alice");
    assert_eq!(record.credential.role(), Some("notifier"));

    // The issued credential is immediately usable.
    let cred: Credential = serde_json::from_value(body["credential"].clone()).unwrap();
    let (status, _) = send(&h.app, post_json("/execute", &execute_body(&cred, "notify"), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_agent_rejects_bad_bodies() {
    let h = harness();
    for req in [
        json!({"role": "notifier"}),
        json!({"role": "notifier", "token_ttl": 60, "extra": 1}),
        json!({"role": "", "token_ttl": 60}),
        json!({"role": "notifier", "token_ttl": 0}),
        json!({"role": "notifier", "token_ttl": MAX_TOKEN_TTL_SECS + 1}),
    ] {
        let (status, body) =
            send(&h.app, post_json("/register-agent", &req, Some(OPERATOR_TOKEN))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{req}");
        assert_eq!(body["error"], "invalid_payload");
    }
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn delegate_uses_given_did_without_registering() {
    let h = harness();
    let req = json!({"role": "transformer", "token_ttl": 120, "delegatee_did": "did:example:sub-agent"});

    let (status, body) = send(&h.app, post_json("/delegate", &req, Some(OPERATOR_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["did"], "did:example:sub-agent");
    assert_eq!(body["credential"]["credentialSubject"]["id"], "did:example:sub-agent");
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn delegate_rejects_invalid_did() {
    let h = harness();
    let req = json!({"role": "transformer", "token_ttl": 120, "delegatee_did": "sub-agent"});
    let (status, _) = send(&h.app, post_json("/delegate", &req, Some(OPERATOR_TOKEN))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn issuance_is_open_when_no_operator_token_configured() {
    let h = harness_with(hmac_signer(), None);
    let req = json!({"role": "notifier", "token_ttl": 60});

    let (status, body) = send(&h.app, post_json("/register-agent", &req, None)).await;
    assert_eq!(status, StatusCode::OK);
    let record = h.store.get(body["did"].as_str().unwrap()).unwrap();
    assert_eq!(record.owner, "anonymous");
}

fn app_with_store(store: Arc<dyn AgentStore>) -> Router {
    let signer = hmac_signer();
    let pipeline = AuthorizationPipeline::new(
        signer.verifier(),
        Arc::new(TrustedIssuers::new([BROKER])),
        Arc::new(PolicyTable::from_yaml_str(POLICY).unwrap()),
        Arc::new(MemoryExecutionLog::new()),
    );
    agentid_api::app(AppState::new(CredentialIssuer::new(BROKER, signer), pipeline, store))
}

#[tokio::test]
async fn register_agent_persists_to_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agents.json");
    let app = app_with_store(Arc::new(FileAgentStore::open(&path).unwrap()));

    let req = json!({"role": "notifier", "token_ttl": 60});
    let (status, body) = send(&app, post_json("/register-agent", &req, None)).await;
    assert_eq!(status, StatusCode::OK);

    let reopened = FileAgentStore::open(&path).unwrap();
    let record = reopened.get(body["did"].as_str().unwrap()).unwrap();
    assert_eq!(record.credential.role(), Some("notifier"));
}

#[tokio::test]
async fn register_agent_returns_credential_when_store_write_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agents.json");
    let store = Arc::new(FileAgentStore::open(&path).unwrap());
    // A non-empty directory in place of the file makes every write fail.
    std::fs::create_dir_all(path.join("occupied")).unwrap();
    let app = app_with_store(store);

    let req = json!({"role": "notifier", "token_ttl": 60});
    let (status, body) = send(&app, post_json("/register-agent", &req, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["credential"]["credentialSubject"]["id"], body["did"]);
}

// ── /issuer-key, health, metrics ────────────────────────────────────────────

#[tokio::test]
async fn issuer_key_is_404_for_hmac() {
    let h = harness();
    let (status, body) = send(&h.app, get("/issuer-key")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn issuer_key_publishes_ed25519_public_key() {
    let keypair = Ed25519KeyPair::from_seed(&[7u8; 32]);
    let expected = keypair.public_key().to_base64();
    let h = harness_with(CredentialSigner::Ed25519(keypair), Some(OPERATOR_TOKEN));

    let (status, body) = send(&h.app, get("/issuer-key")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["issuer"], BROKER);
    assert_eq!(body["scheme"], "ed25519");
    assert_eq!(body["public_key"], expected.as_str());

    let cred = credential(&h, BROKER, "data-fetcher", 60);
    let (status, _) = send(&h.app, post_json("/execute", &execute_body(&cred, "fetch_data"), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_probes_bypass_auth() {
    let h = harness();
    let (status, body) = send(&h.app, get("/health/liveness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));

    let (status, body) = send(&h.app, get("/health/readiness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ready".into()));
}

#[tokio::test]
async fn metrics_absent_without_exporter() {
    let h = harness();
    let (status, _) = send(&h.app, get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

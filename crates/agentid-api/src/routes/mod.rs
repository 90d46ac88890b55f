//! # API Route Modules
//!
//! - `execute`: `/execute`, the agent-facing authorization endpoint.
//! - `agents`: `/register-agent` and `/delegate`, operator-only issuance.
//! - `issuer`: `/issuer-key`, public key publication for offline verifiers.

pub mod agents;
pub mod execute;
pub mod issuer;

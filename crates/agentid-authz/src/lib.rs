//! # agentid-authz: Authorization
//!
//! Decides whether an agent holding a credential may perform an action.
//!
//! - [`policy`]: the static role-to-action table.
//! - [`pipeline`]: the fail-fast gate sequence behind `/execute`.
//! - [`audit`]: bounded, digestable in-memory decision trail.
//! - [`execution_log`]: durable JSON Lines record of every decision.

pub mod audit;
pub mod execution_log;
pub mod pipeline;
pub mod policy;

pub use audit::{AuditEntry, AuditOutcome, AuditTrail, AUDIT_TARGET};
pub use execution_log::{
    ExecutionLog, ExecutionRecord, ExecutionStatus, JsonlExecutionLog, LogError, MemoryExecutionLog,
};
pub use pipeline::{
    check_credential, Authorization, AuthorizationPipeline, Denial, ExecuteRequest, Stage, Task,
};
pub use policy::{PolicyError, PolicyLoadError, PolicyTable};

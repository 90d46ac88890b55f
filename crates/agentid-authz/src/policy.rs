//! # Role-to-action policy
//!
//! Two tiers, checked in order:
//!
//! 1. The action must be in the global recognized set, whatever the role.
//! 2. The action must be in the role's permitted set.
//!
//! The table is loaded once at startup from YAML (or JSON, which is valid
//! YAML) and never changes afterwards.
//!
//! ```yaml
//! actions: [fetch_data, transform, notify]
//! roles:
//!   data-fetcher: [fetch_data]
//!   transformer: [transform]
//!   notifier: [notify]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Why a policy check denied an action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("action not allowed")]
    ActionNotRecognized { action: String },

    #[error("role not permitted to perform action")]
    RoleNotPermitted { role: String, action: String },
}

/// Failure to load a policy table.
#[derive(Error, Debug)]
pub enum PolicyLoadError {
    #[error("cannot read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse policy: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("policy recognizes no actions")]
    NoActions,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyDocument {
    actions: Vec<String>,
    #[serde(default)]
    roles: BTreeMap<String, Vec<String>>,
}

/// Immutable global action set plus role permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    actions: BTreeSet<String>,
    roles: BTreeMap<String, BTreeSet<String>>,
}

impl PolicyTable {
    pub fn new<A, R, P>(actions: A, roles: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator<Item = (String, P)>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let table = Self {
            actions: actions.into_iter().map(Into::into).collect(),
            roles: roles
                .into_iter()
                .map(|(role, permitted)| (role, permitted.into_iter().map(Into::into).collect()))
                .collect(),
        };
        table.warn_unreachable_grants();
        table
    }

    /// Parse a YAML or JSON policy document.
    pub fn from_yaml_str(text: &str) -> Result<Self, PolicyLoadError> {
        let doc: PolicyDocument = serde_yaml::from_str(text)?;
        if doc.actions.is_empty() {
            return Err(PolicyLoadError::NoActions);
        }
        Ok(Self::new(doc.actions, doc.roles))
    }

    /// Read and parse a policy file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PolicyLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_yaml_str(&text)?;
        tracing::info!(
            path = %path.display(),
            actions = table.actions.len(),
            roles = table.roles.len(),
            "loaded policy table"
        );
        Ok(table)
    }

    // A role may list an action the global set does not recognize; such a
    // grant can never take effect.
    fn warn_unreachable_grants(&self) {
        for (role, permitted) in &self.roles {
            for action in permitted.difference(&self.actions) {
                tracing::warn!(%role, %action, "role grants an action outside the recognized set");
            }
        }
    }

    /// Check `action` for `role`.
    pub fn validate(&self, action: &str, role: &str) -> Result<(), PolicyError> {
        if !self.is_recognized(action) {
            return Err(PolicyError::ActionNotRecognized {
                action: action.to_string(),
            });
        }
        if !self.role_permits(role, action) {
            return Err(PolicyError::RoleNotPermitted {
                role: role.to_string(),
                action: action.to_string(),
            });
        }
        Ok(())
    }

    pub fn is_recognized(&self, action: &str) -> bool {
        self.actions.contains(action)
    }

    pub fn role_permits(&self, role: &str, action: &str) -> bool {
        self.roles.get(role).is_some_and(|p| p.contains(action))
    }
}

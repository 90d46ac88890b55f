//! # Agent registry
//!
//! Registered agents are kept as `{did, owner, metadata, credential}`
//! records keyed by DID. The file store rewrites one pretty-printed JSON
//! object on every save (write to a temporary sibling, then rename), guarded
//! by a mutex so concurrent registrations cannot lose each other's writes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use agentid_vc::{Credential, CredentialMetadata};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("agent store I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("agent store {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot serialize agent store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A registered agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub did: String,
    pub owner: String,
    pub metadata: CredentialMetadata,
    pub credential: Credential,
}

pub trait AgentStore: Send + Sync {
    fn save(&self, record: AgentRecord) -> Result<(), StoreError>;
    fn get(&self, did: &str) -> Option<AgentRecord>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// JSON file-backed store.
#[derive(Debug)]
pub struct FileAgentStore {
    path: PathBuf,
    agents: Mutex<BTreeMap<String, AgentRecord>>,
}

impl FileAgentStore {
    /// Open the store, loading existing records. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let agents = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        tracing::info!(path = %path.display(), agents = agents.len(), "opened agent store");
        Ok(Self {
            path,
            agents: Mutex::new(agents),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, agents: &BTreeMap<String, AgentRecord>) -> Result<(), StoreError> {
        let io = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let bytes = serde_json::to_vec_pretty(agents)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(io)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        std::fs::write(&tmp, bytes).map_err(io)?;
        std::fs::rename(&tmp, &self.path).map_err(io)
    }
}

impl AgentStore for FileAgentStore {
    fn save(&self, record: AgentRecord) -> Result<(), StoreError> {
        let mut agents = self.agents.lock();
        agents.insert(record.did.clone(), record);
        self.persist(&agents)
    }

    fn get(&self, did: &str) -> Option<AgentRecord> {
        self.agents.lock().get(did).cloned()
    }

    fn len(&self) -> usize {
        self.agents.lock().len()
    }
}

/// In-memory store for tests and ephemeral brokers.
#[derive(Debug, Default)]
pub struct MemoryAgentStore {
    agents: Mutex<BTreeMap<String, AgentRecord>>,
}

impl MemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AgentStore for MemoryAgentStore {
    fn save(&self, record: AgentRecord) -> Result<(), StoreError> {
        self.agents.lock().insert(record.did.clone(), record);
        Ok(())
    }

    fn get(&self, did: &str) -> Option<AgentRecord> {
        self.agents.lock().get(did).cloned()
    }

    fn len(&self) -> usize {
        self.agents.lock().len()
    }
}

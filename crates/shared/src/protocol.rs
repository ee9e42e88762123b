use serde::{Deserialize, Serialize};

use crate::domain::{DomainId, Pod, PodId, PoolId, ZoneId};

pub const DEFAULT_DISK_SIZE: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Local,
    Iscsi,
}

impl StorageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKind::Local => "local",
            StorageKind::Iscsi => "iscsi",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageTag {
    pub text: String,
}

impl StorageTag {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// One requested disk of a machine composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSpec {
    #[serde(rename = "type")]
    pub kind: StorageKind,
    pub size: u64,
    #[serde(default)]
    pub tags: Vec<StorageTag>,
    pub boot: bool,
}

impl StorageSpec {
    pub fn new(kind: StorageKind, size: u64, boot: bool) -> Self {
        Self {
            kind,
            size,
            tags: Vec::new(),
            boot,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(StorageTag::new).collect();
        self
    }

    /// Single-disk constraint body, e.g. `20(local,ssd)`.
    fn constraint(&self) -> String {
        let mut parts = Vec::with_capacity(self.tags.len() + 1);
        parts.push(self.kind.as_str());
        parts.extend(self.tags.iter().map(|tag| tag.text.as_str()));
        format!("{}({})", self.size, parts.join(","))
    }
}

/// Edit buffer behind the compose form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeRequest {
    pub storage: Vec<StorageSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<ZoneId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
}

impl Default for ComposeRequest {
    fn default() -> Self {
        Self {
            storage: vec![StorageSpec::new(StorageKind::Local, DEFAULT_DISK_SIZE, true)],
            domain: None,
            zone: None,
            pool: None,
            hostname: None,
            cores: None,
            memory: None,
        }
    }
}

/// Parameters sent with a compose call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeParams {
    pub id: PodId,
    pub storage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<ZoneId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
}

impl ComposeParams {
    pub fn from_request(pod_id: PodId, request: &ComposeRequest) -> Self {
        let request = request.clone();
        Self {
            id: pod_id,
            storage: encode_storage_constraint(&request.storage),
            domain: request.domain,
            zone: request.zone,
            pool: request.pool,
            hostname: request.hostname,
            cores: request.cores,
            memory: request.memory,
        }
    }
}

/// Encodes disks as `<idx>:<size>(<type>,<tag>...)` joined by `,`.
///
/// The boot disk is moved to index 0. The sort is stable, so every other
/// disk keeps its relative order.
pub fn encode_storage_constraint(storage: &[StorageSpec]) -> String {
    let mut disks: Vec<&StorageSpec> = storage.iter().collect();
    disks.sort_by_key(|disk| !disk.boot);
    disks
        .iter()
        .enumerate()
        .map(|(idx, disk)| format!("{idx}:{}", disk.constraint()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Changes pushed by the pods manager after a mutation lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PodEvent {
    Updated(Pod),
    Deleted(PodId),
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;

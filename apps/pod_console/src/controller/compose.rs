//! Compose form buffer: disk list editing ahead of a compose call.

use shared::{
    domain::PodId,
    protocol::{ComposeParams, ComposeRequest, StorageKind, StorageSpec, DEFAULT_DISK_SIZE},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeState {
    pub request: ComposeRequest,
}

impl ComposeState {
    pub fn storage(&self) -> &[StorageSpec] {
        &self.request.storage
    }

    pub fn reset(&mut self) {
        self.request = ComposeRequest::default();
    }

    pub fn add_storage(&mut self, kind: StorageKind) {
        self.request
            .storage
            .push(StorageSpec::new(kind, DEFAULT_DISK_SIZE, false));
    }

    pub fn remove_disk(&mut self, index: usize) -> Option<StorageSpec> {
        if index < self.request.storage.len() {
            Some(self.request.storage.remove(index))
        } else {
            None
        }
    }

    /// Makes the disk at `index` the only boot disk. Out of range leaves
    /// every flag as it was.
    pub fn set_boot_disk(&mut self, index: usize) -> bool {
        if index >= self.request.storage.len() {
            return false;
        }
        for disk in &mut self.request.storage {
            disk.boot = false;
        }
        self.request.storage[index].boot = true;
        true
    }

    pub fn params(&self, pod_id: PodId) -> ComposeParams {
        ComposeParams::from_request(pod_id, &self.request)
    }
}

// In-memory implementation of ArtifactStorage, for tests and dry runs.
// Follows the same contract as the Drive implementation, minus the network.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::reports::{ArtifactStorage, CollaboratorError, UploadReceipt};

pub struct InMemoryStorage {
    files: DashMap<String, Vec<u8>>,
    next_id: AtomicU64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            files: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn get(&self, file_id: &str) -> Option<Vec<u8>> {
        self.files.get(file_id).map(|entry| entry.value().clone())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactStorage for InMemoryStorage {
    async fn upload(
        &self,
        artifact: Vec<u8>,
        filename: &str,
    ) -> Result<UploadReceipt, CollaboratorError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let file_id = format!("mem-{id}");
        self.files.insert(file_id.clone(), artifact);

        Ok(UploadReceipt {
            link: format!("memory://{file_id}/{filename}"),
            file_id,
        })
    }
}

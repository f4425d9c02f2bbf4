use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::storage::{BlobError, BlobStore, Upload, content_hash};

/// Keep uploads in memory. URLs look like `memory://<sha1>`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    uploads: Mutex<Vec<Upload>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored uploads.
    pub async fn len(&self) -> usize {
        self.uploads.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl BlobStore for MemoryStorage {
    async fn put(&self, upload: &Upload) -> Result<String, BlobError> {
        self.uploads.lock().await.push(upload.clone());
        Ok(format!("memory://{}", content_hash(&upload.bytes)))
    }
}

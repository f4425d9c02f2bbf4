use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::storage::{BlobError, BlobStore, UPLOADS_ROUTE, Upload, content_hash};

/// Write uploads on disk, served back under [`UPLOADS_ROUTE`].
#[derive(Debug, Clone)]
pub struct LocalStorage {
    directory: PathBuf,
    /// Public URL of this server, ending with `/`.
    public_url: String,
}

impl LocalStorage {
    pub fn new(directory: impl AsRef<Path>, public_url: &str) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            public_url: public_url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// File name kept on disk: content hash plus the original extension.
fn file_name(upload: &Upload) -> String {
    let hash = content_hash(&upload.bytes);
    let extension = upload
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{hash}.{}", ext.to_ascii_lowercase()),
        None => hash,
    }
}

#[async_trait]
impl BlobStore for LocalStorage {
    async fn put(&self, upload: &Upload) -> Result<String, BlobError> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let name = file_name(upload);
        tokio::fs::write(self.directory.join(&name), &upload.bytes).await?;

        tracing::debug!(file = %name, size = upload.bytes.len(), "upload stored on disk");

        Ok(format!("{}{UPLOADS_ROUTE}/{name}", self.public_url))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;

    use super::*;

    fn upload(name: Option<&str>, bytes: &'static [u8]) -> Upload {
        Upload {
            file_name: name.map(str::to_owned),
            content_type: None,
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn test_file_name_keeps_safe_extension() {
        let hash = content_hash(b"x");
        assert_eq!(file_name(&upload(Some("cat.PNG"), b"x")), format!("{hash}.png"));
        assert_eq!(file_name(&upload(Some("noext"), b"x")), hash);
        assert_eq!(file_name(&upload(Some("evil.p/ng"), b"x")), hash);
        assert_eq!(file_name(&upload(None, b"x")), hash);
    }

    #[tokio::test]
    async fn test_put_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads"), "http://localhost:5000/");

        let url = storage.put(&upload(Some("cat.jpg"), b"meow")).await.unwrap();

        let name = format!("{}.jpg", content_hash(b"meow"));
        assert_eq!(url, format!("http://localhost:5000/uploads/{name}"));
        let written = tokio::fs::read(storage.directory().join(&name)).await.unwrap();
        assert_eq!(written, b"meow");
    }
}

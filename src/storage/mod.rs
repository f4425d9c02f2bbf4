//! Blob hosting for uploaded images.
//! Hosts are: local disk, Cloudinary.

mod cloudinary;
mod local;
mod memory;

pub use cloudinary::*;
pub use local::*;
pub use memory::*;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::config::{self, Configuration, ImageMode};

/// Route serving locally stored uploads.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Errors returned by a [`BlobStore`].
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("image uploads are enabled but no `storage` is configured")]
    Unconfigured,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload rejected: {0}")]
    Rejected(String),
}

/// Uploaded file, as received.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Accepts file bytes and returns a retrievable URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, upload: &Upload) -> Result<String, BlobError>;
}

/// Hex SHA-1 of `bytes`, used as blob identifier.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Build the configured [`BlobStore`], if any.
pub fn from_config(
    config: &Configuration,
) -> Result<Option<Arc<dyn BlobStore>>, BlobError> {
    let store: Arc<dyn BlobStore> = match &config.storage {
        Some(config::Storage::Local { directory }) => {
            Arc::new(LocalStorage::new(directory, &config.url))
        },
        Some(config::Storage::Cloudinary {
            cloud_name,
            key,
            secret,
        }) => Arc::new(Cloudinary::new(Credentials {
            key: key.clone(),
            cloud_name: cloud_name.clone(),
            secret: secret.clone().unwrap_or_default(),
        })),
        None if config.features.images == ImageMode::None => return Ok(None),
        None => return Err(BlobError::Unconfigured),
    };

    Ok(Some(store))
}

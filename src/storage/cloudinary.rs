use std::io::Write;

use async_trait::async_trait;
use cloudinary::upload::result::UploadResult;
use cloudinary::upload::{Source::Path, Upload as CloudinaryUpload, UploadOptions};
use tempfile::NamedTempFile;

use crate::storage::{BlobError, BlobStore, Upload, content_hash};

const DELIVERY_URL: &str = "https://res.cloudinary.com";

/// Cloudinary credentials structure to upload images.
#[derive(Clone)]
pub struct Credentials {
    /// Cloudinary API key.
    pub key: String,
    /// Cloudinary cloud name.
    pub cloud_name: String,
    /// Cloudinary API secret.
    /// Should never be shared!
    pub secret: String,
}

/// Upload images on Cloudinary.
#[derive(Clone)]
pub struct Cloudinary {
    credentials: Credentials,
}

impl Cloudinary {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Public HTTPS URL of an uploaded image.
    pub fn url(&self, public_id: &str) -> String {
        format!(
            "{DELIVERY_URL}/{}/image/upload/{public_id}",
            self.credentials.cloud_name
        )
    }
}

#[async_trait]
impl BlobStore for Cloudinary {
    async fn put(&self, upload: &Upload) -> Result<String, BlobError> {
        // Hash buffer image to obtain unique identifier.
        let public_id = content_hash(&upload.bytes);
        let options = UploadOptions::new().set_public_id(public_id.clone());

        let client = CloudinaryUpload::new(
            self.credentials.key.clone(),
            self.credentials.cloud_name.clone(),
            self.credentials.secret.clone(),
        );

        // The client reads its source from disk.
        let mut temp_file = NamedTempFile::new()?;
        temp_file.write_all(&upload.bytes)?;
        let path_buf = temp_file.path().to_path_buf();

        let result = client
            .image(Path(path_buf), &options)
            .await
            .map_err(|err| BlobError::Rejected(err.to_string()))?;

        if let UploadResult::Error(err) = result {
            return Err(BlobError::Rejected(format!("{err:?}")));
        }

        let url = self.url(&public_id);
        tracing::debug!(%url, "upload stored on cloudinary");

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_url() {
        let store = Cloudinary::new(Credentials {
            key: "111111111111111".to_owned(),
            cloud_name: "aaaaa1234".to_owned(),
            secret: "SECRET_KEY".to_owned(),
        });
        let public_id = content_hash(b"image");

        assert_eq!(
            store.url(&public_id),
            format!("https://res.cloudinary.com/aaaaa1234/image/upload/{public_id}")
        );
    }
}

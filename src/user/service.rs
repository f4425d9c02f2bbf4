use std::borrow::Cow;
use std::sync::Arc;

use validator::{ValidationError, ValidationErrors};

use crate::config::Features;
use crate::error::{Result, ServerError};
use crate::storage::{BlobError, BlobStore, Upload};
use crate::user::{Secret, User, UserRepository};

/// User to register.
#[derive(Debug, Default)]
pub struct NewUser {
    pub username: String,
    pub slug: String,
    pub secret: Option<Secret>,
    /// Files to upload, in order.
    pub images: Vec<Upload>,
}

/// Outcome of a registration.
#[derive(Debug, PartialEq)]
pub struct Created {
    pub url: String,
    pub images: Vec<String>,
}

/// User manager.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    blobs: Option<Arc<dyn BlobStore>>,
    features: Features,
    profile_url: String,
}

impl UserService {
    /// Create a new [`UserService`].
    pub fn new(
        repo: Arc<dyn UserRepository>,
        blobs: Option<Arc<dyn BlobStore>>,
        features: Features,
        profile_url: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            blobs,
            features,
            profile_url: profile_url.into(),
        }
    }

    pub fn features(&self) -> Features {
        self.features
    }

    /// Register a new user.
    ///
    /// The slug pre-check only gives an early answer; the store unique index
    /// decides, and its rejection is reported as the same conflict.
    pub async fn create(&self, new: NewUser) -> Result<Created> {
        self.check(&new)?;

        if self.repo.find_by_slug(&new.slug).await?.is_some() {
            return Err(ServerError::Conflict { slug: new.slug });
        }

        let images = self.upload(&new.images).await?;

        let user = User::builder()
            .username(new.username)
            .slug(new.slug)
            .images(images)
            .secret(new.secret)
            .build(&self.profile_url);

        if let Err(err) = self.repo.insert(&user).await {
            if !user.images.is_empty() {
                tracing::warn!(
                    slug = %user.unique_slug,
                    images = user.images.len(),
                    "user not saved, uploaded images are orphaned"
                );
            }
            return Err(err.into());
        }

        metrics::counter!("users_created_total").increment(1);
        tracing::info!(slug = %user.unique_slug, "user created");

        Ok(Created {
            url: user.url,
            images: user.images,
        })
    }

    /// Find a user using its `unique_slug`.
    pub async fn find_by_slug(&self, slug: &str) -> Result<User> {
        self.repo
            .find_by_slug(slug)
            .await?
            .ok_or(ServerError::NotFound)
    }

    /// Count every stored user.
    pub async fn count(&self) -> Result<u64> {
        Ok(self.repo.count().await?)
    }

    /// Delete a user if `secret` matches the stored one.
    ///
    /// Uploaded images are left on the blob store.
    pub async fn delete(&self, slug: &str, secret: &Secret) -> Result<()> {
        let user = self.find_by_slug(slug).await?;

        if !secret.matches(user.secret.as_deref()) {
            tracing::debug!(%slug, "delete refused, secret mismatch");
            return Err(ServerError::Unauthorized);
        }

        // Someone else may have deleted it since the lookup.
        if !self.repo.delete(slug).await? {
            return Err(ServerError::NotFound);
        }

        metrics::counter!("users_deleted_total").increment(1);
        tracing::info!(%slug, "user deleted");

        Ok(())
    }

    fn check(&self, new: &NewUser) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if new.username.is_empty() {
            errors.add("username", invalid("required", "Username is required."));
        }
        if new.slug.is_empty() {
            errors.add("uniqueSlug", invalid("required", "Unique slug is required."));
        }
        if self.features.delete && new.secret.is_none() {
            errors.add("secret", invalid("required", "Secret is required."));
        }

        let limit = self.features.images.limit();
        if new.images.len() > limit {
            errors.add(
                "images",
                ValidationError::new("length")
                    .with_message(Cow::Owned(format!("At most {limit} image(s) are accepted."))),
            );
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    async fn upload(&self, uploads: &[Upload]) -> Result<Vec<String>> {
        if uploads.is_empty() {
            return Ok(Vec::new());
        }
        let Some(blobs) = &self.blobs else {
            return Err(BlobError::Unconfigured.into());
        };

        let mut urls = Vec::with_capacity(uploads.len());
        for upload in uploads {
            urls.push(blobs.put(upload).await?);
        }
        Ok(urls)
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

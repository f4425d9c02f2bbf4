//! HTTP API.
mod count;
pub mod create;
pub mod delete;
pub mod status;
mod user;

use axum::extract::{DefaultBodyLimit, FromRequest, Request};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::config::Configuration;
use crate::error::ServerError;
use crate::user::Secret;
use crate::AppState;

/// Plain confirmation body.
#[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
pub struct Message {
    pub message: String,
}

/// JSON body checked with [`Validate`] before reaching the handler.
#[derive(Debug)]
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Check that a secret is exactly four digits.
pub fn validate_secret(secret: &str) -> Result<(), ValidationError> {
    Secret::check(secret)
}

/// Routes under `/api`.
pub fn router(config: &Configuration) -> Router<AppState> {
    let router = Router::new()
        // `POST /api/createUser` goes to `create`.
        .route(
            "/createUser",
            post(create::handler).layer(DefaultBodyLimit::max(config.body_limit)),
        )
        // `GET /api/user/:SLUG` goes to `user`.
        .route("/user/{unique_slug}", get(user::handler))
        // `GET /api/userCount` goes to `count`.
        .route("/userCount", get(count::handler));

    if config.features.delete {
        // `DELETE /api/deleteUser` goes to `delete`.
        router.route("/deleteUser", delete(delete::handler))
    } else {
        router
    }
}

/// Configuration with a fixed profile base and the given `features`.
#[cfg(test)]
pub fn config(features: crate::config::Features) -> Configuration {
    let mut config = Configuration::default();
    config.profile_url = "https://x/user/".to_owned();
    config.features = features;
    config
}

/// State backed by in-memory stores.
#[cfg(test)]
pub fn state(config: Configuration) -> AppState {
    use std::sync::Arc;

    use crate::storage::{BlobStore, MemoryStorage};
    use crate::user::{MemoryUserRepository, UserService};

    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryStorage::new());
    let users = UserService::new(
        Arc::new(MemoryUserRepository::new()),
        Some(blobs),
        config.features,
        config.profile_url.clone(),
    );

    AppState {
        config: Arc::new(config),
        users,
    }
}

//! Error handler for vanity.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::storage::BlobError;
use crate::user::StoreError;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error("error parsing form data: {cause}")]
    ParsingForm {
        status: StatusCode,
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("unique slug `{slug}` already exists")]
    Conflict { slug: String },

    #[error("user not found")]
    NotFound,

    #[error("secret does not match")]
    Unauthorized,

    #[error("store request failed: {0}")]
    Store(StoreError),

    #[error("blob upload failed: {0}")]
    Blob(#[from] BlobError),
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { value } => Self::Conflict { slug: value },
            err => Self::Store(err),
        }
    }
}

impl From<MultipartRejection> for ServerError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::ParsingForm {
            status: rejection.status(),
            cause: Box::new(rejection),
        }
    }
}

impl From<MultipartError> for ServerError {
    fn from(err: MultipartError) -> Self {
        Self::ParsingForm {
            status: err.status(),
            cause: Box::new(err),
        }
    }
}

/// Structure for detailed error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    r#type: Option<String>,
    title: String,
    status: u16,
    detail: String,
    instance: Option<String>,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `title` field.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    /// Add detailed error.
    pub fn details(mut self, description: &str) -> Self {
        self.detail = description.into();
        self
    }

    /// Set `instance` field, the path the error refers to.
    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(self) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            r#type: None,
            title: "Internal server error.".to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            detail: String::default(),
            instance: None,
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue.to_string(),
            })
        })
        .collect();
    // `field_errors` is backed by a hash map.
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = ResponseError::default()
            .title("There were validation errors with your request.")
            .details(&self.to_string())
            .status(StatusCode::BAD_REQUEST);

        let response = match &self {
            ServerError::Validation(validation_errors) => response.errors(validation_errors),

            ServerError::ParsingForm { status, cause } => response
                .title("Server error during data parsing.")
                .details(&cause.to_string())
                .status(*status),

            ServerError::Conflict { slug } => response
                .title("Unique slug already exists.")
                .instance(format!("/api/user/{slug}")),

            ServerError::NotFound => response
                .title("User not found.")
                .status(StatusCode::NOT_FOUND),

            ServerError::Unauthorized => response
                .title("Secret does not match.")
                .status(StatusCode::UNAUTHORIZED),

            ServerError::Store(err) => {
                tracing::error!(error = %err, "store returned an error");

                ResponseError::default().details(&err.to_string())
            },

            ServerError::Blob(err) => {
                tracing::error!(error = %err, "blob store returned an error");

                ResponseError::default().details(&err.to_string())
            },

            ServerError::Axum(rejection) => response
                .title("Invalid request body.")
                .status(rejection.status()),
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "type": null,
                "title": "Internal server error.",
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "detail": null,
                "instance": null,
                "errors": null,
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use validator::ValidationError;

    async fn body_of(err: ServerError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_status_codes() {
        let (status, _) = body_of(ServerError::NotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = body_of(ServerError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = body_of(ServerError::Conflict {
            slug: "alice123".into(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["instance"], "/api/user/alice123");
    }

    #[tokio::test]
    async fn test_store_message_is_surfaced() {
        let (status, body) =
            body_of(StoreError::Backend("connection reset".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_duplicate_becomes_conflict() {
        let err: ServerError = StoreError::Duplicate {
            value: "bob".into(),
        }
        .into();
        assert!(matches!(err, ServerError::Conflict { ref slug } if slug == "bob"));
    }

    #[tokio::test]
    async fn test_validation_fields_are_listed() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "secret",
            ValidationError::new("secret")
                .with_message("Secret must be exactly 4 digits.".into()),
        );
        errors.add(
            "username",
            ValidationError::new("length")
                .with_message("Username is required.".into()),
        );

        let (status, body) = body_of(errors.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields = body["errors"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0]["field"], "secret");
        assert_eq!(fields[0]["message"], "Secret must be exactly 4 digits.");
        assert_eq!(fields[1]["field"], "username");
    }
}

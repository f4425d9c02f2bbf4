use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{StatusCode, header};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::AppState;
use crate::config::ImageMode;
use crate::error::{Result, ServerError};
use crate::storage::Upload;
use crate::user::{NewUser, Secret};

pub const CREATED_MESSAGE: &str = "User created successfully!";

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username is required."))]
    pub username: String,
    #[serde(default, alias = "uniqueName")]
    #[validate(length(min = 1, message = "Unique slug is required."))]
    pub unique_slug: String,
    #[validate(custom(
        function = "crate::router::validate_secret",
        message = "Secret must be exactly 4 digits."
    ))]
    pub secret: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub message: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Registration request, either JSON or `multipart/form-data` with files.
#[derive(Debug)]
pub struct Form {
    pub body: Body,
    pub images: Vec<Upload>,
}

impl FromRequest<AppState> for Form {
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        let form = if is_multipart {
            let multipart = Multipart::from_request(req, state).await?;
            read_multipart(multipart, state.config.features.images).await?
        } else {
            let Json(body) = Json::<Body>::from_request(req, state).await?;
            Form {
                body,
                images: Vec::new(),
            }
        };

        form.body.validate()?;
        Ok(form)
    }
}

fn invalid_images(message: String) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "images",
        ValidationError::new("images").with_message(message.into()),
    );
    errors
}

async fn read_multipart(mut multipart: Multipart, mode: ImageMode) -> Result<Form> {
    let mut body = Body::default();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();

        if field.file_name().is_some() || name == "image" || name == "images" {
            if mode.field() != Some(name.as_str()) {
                return Err(invalid_images(format!("Unexpected file field `{name}`.")).into());
            }
            if images.len() == mode.limit() {
                return Err(invalid_images(format!(
                    "At most {} image(s) are accepted.",
                    mode.limit()
                ))
                .into());
            }

            let file_name = field.file_name().map(str::to_owned);
            let content_type = field.content_type().map(str::to_owned);
            let bytes = field.bytes().await?;

            images.push(Upload {
                file_name,
                content_type,
                bytes,
            });
            continue;
        }

        let value = field.text().await?;
        match name.as_str() {
            "username" => body.username = value,
            "uniqueSlug" | "uniqueName" => body.unique_slug = value,
            "secret" => body.secret = Some(value),
            _ => tracing::debug!(field = %name, "ignoring unknown form field"),
        }
    }

    Ok(Form { body, images })
}

/// Handler to create user.
pub async fn handler(
    State(state): State<AppState>,
    form: Form,
) -> Result<(StatusCode, Json<Response>)> {
    let Form { body, images } = form;
    let secret = body.secret.map(Secret::try_from).transpose()?;

    let created = state
        .users
        .create(NewUser {
            username: body.username,
            slug: body.unique_slug,
            secret,
            images,
        })
        .await?;

    let images = (state.users.features().images != ImageMode::None).then_some(created.images);

    Ok((
        StatusCode::CREATED,
        Json(Response {
            message: CREATED_MESSAGE.to_owned(),
            url: created.url,
            images,
        }),
    ))
}

//! Delete user from database, guarded by its secret.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::{Message, Valid};
use crate::user::Secret;

pub const DELETED_MESSAGE: &str = "User deleted successfully!";

#[derive(Debug, Validate, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[serde(default, alias = "uniqueName")]
    #[validate(length(min = 1, message = "Unique slug is required."))]
    pub unique_slug: String,
    #[serde(default)]
    #[validate(custom(
        function = "crate::router::validate_secret",
        message = "Secret must be exactly 4 digits."
    ))]
    pub secret: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Message>> {
    let secret = Secret::try_from(body.secret)?;
    state.users.delete(&body.unique_slug, &secret).await?;

    Ok(Json(Message {
        message: DELETED_MESSAGE.to_owned(),
    }))
}

//! Get a user by slug.

use axum::Json;
use axum::extract::{Path, State};

use crate::AppState;
use crate::error::Result;
use crate::user::User;

pub async fn handler(
    State(state): State<AppState>,
    Path(unique_slug): Path<String>,
) -> Result<Json<User>> {
    Ok(Json(state.users.find_by_slug(&unique_slug).await?))
}

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub count: u64,
}

/// Total number of registered users.
pub async fn handler(State(state): State<AppState>) -> Result<Json<Response>> {
    Ok(Json(Response {
        count: state.users.count().await?,
    }))
}

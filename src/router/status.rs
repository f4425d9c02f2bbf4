//! Public configuration page for front-end identification.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use crate::config::Configuration;

/// Public server status (configuration).
pub async fn status(State(config): State<Arc<Configuration>>) -> Json<Arc<Configuration>> {
    Json(config)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;

    use crate::config::{Features, ImageMode};
    use crate::router::config;
    use crate::*;

    #[tokio::test]
    async fn test_status() {
        let state = router::state(config(Features {
            images: ImageMode::Single,
            delete: true,
        }));
        let app = app(state);

        let response = make_request(app, Method::GET, "/status.json", String::default()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["name"], "vanity");
        assert_eq!(body["features"]["images"], "single");
        assert_eq!(body["features"]["delete"], true);
        assert!(body.get("postgres").is_none());
    }
}

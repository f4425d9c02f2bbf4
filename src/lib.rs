//! Vanity registers small user profiles under unique slugs.

#![forbid(unsafe_code)]

pub mod config;
mod database;
pub mod error;
mod router;
pub mod storage;
pub mod telemetry;
pub mod user;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware as AxumMiddleware};
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

pub use error::ServerError;

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Send a `multipart/form-data` POST with text `fields` and
/// `(field, file name, content)` files.
#[cfg(test)]
pub async fn make_multipart_request(
    app: Router,
    path: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &str)],
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "vanity-test-boundary";

    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, content) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub users: user::UserService,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any),
        );

    let mut app = Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        .nest("/api", router::router(&state.config))
        .with_state(state.clone());

    // Uploads kept on disk are served by ourselves.
    if let Some(config::Storage::Local { directory }) = &state.config.storage {
        app = app.nest_service(storage::UPLOADS_ROUTE, ServeDir::new(directory));
    }

    app.route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
///
/// Fails if PostgreSQL cannot be reached.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>> {
    // read configuration file.
    let path = std::env::var("CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_default();
    let config = config::Configuration::default().path(path).read()?;

    let Some(postgres) = &config.postgres else {
        return Err("missing `postgres` entry on `config.yaml` file".into());
    };
    let db = database::Database::from_config(postgres).await?;

    // execute migrations scripts on start.
    db.migrate().await?;

    let blobs = storage::from_config(&config)?;
    let users = user::UserService::new(
        Arc::new(user::PgUserRepository::new(db.postgres)),
        blobs,
        config.features,
        config.profile_url.clone(),
    );

    tracing::info!(
        images = ?config.features.images,
        delete = config.features.delete,
        "registration service ready"
    );

    Ok(AppState { config, users })
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;

    use crate::config::{Features, ImageMode, Storage};
    use crate::router::config;
    use crate::*;

    #[tokio::test]
    async fn test_local_uploads_are_served() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(Features {
            images: ImageMode::Single,
            ..Default::default()
        });
        config.storage = Some(Storage::Local {
            directory: dir.path().to_path_buf(),
        });

        let blobs = storage::from_config(&config).unwrap();
        let users = user::UserService::new(
            Arc::new(user::MemoryUserRepository::new()),
            blobs,
            config.features,
            config.profile_url.clone(),
        );
        let app = app(AppState {
            config: Arc::new(config),
            users,
        });

        let response = make_multipart_request(
            app.clone(),
            "/api/createUser",
            &[("username", "Alice"), ("uniqueSlug", "alice")],
            &[("image", "avatar.png", "not really a png")],
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let url = body["images"][0].as_str().unwrap().to_owned();
        let path = url.trim_start_matches("http://localhost:5000");
        assert!(path.starts_with("/uploads/"));

        let response = make_request(app, Method::GET, path, String::default()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let content = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&content[..], b"not really a png");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = app(router::state(config(Features::default())));
        let response = make_request(
            app,
            Method::POST,
            "/create",
            json!({}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

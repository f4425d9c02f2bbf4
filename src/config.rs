//! Configuration manager for vanity.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;
use crate::user::MAX_IMAGES;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MiB.
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Public URL of current instance.
    pub url: String,
    /// Base of generated profile links, the slug is appended as is.
    pub profile_url: String,
    /// Listen port. `PORT` environment variable takes precedence.
    pub port: u16,
    /// Maximum request body size, in bytes.
    pub body_limit: usize,
    pub features: Features,
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Where uploaded images go.
    #[serde(skip_serializing)]
    pub storage: Option<Storage>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_CRATE_NAME").to_owned(),
            url: format!("http://localhost:{DEFAULT_PORT}/"),
            profile_url: "http://localhost:5173/user/".to_owned(),
            port: DEFAULT_PORT,
            body_limit: DEFAULT_BODY_LIMIT,
            features: Features::default(),
            version: VERSION.to_owned(),
            path: PathBuf::default(),
            postgres: None,
            storage: None,
        }
    }
}

/// Optional capabilities of the service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    /// How many images a user may upload.
    pub images: ImageMode,
    /// Whether users have a secret and can be deleted with it.
    pub delete: bool,
}

/// Image upload mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// No upload.
    #[default]
    None,
    /// One file, form field `image`.
    Single,
    /// Up to seven files, form field `images`.
    Multiple,
}

impl ImageMode {
    /// Maximum number of files accepted.
    pub const fn limit(self) -> usize {
        match self {
            ImageMode::None => 0,
            ImageMode::Single => 1,
            ImageMode::Multiple => MAX_IMAGES,
        }
    }

    /// Multipart field name carrying files.
    pub const fn field(self) -> Option<&'static str> {
        match self {
            ImageMode::None => None,
            ImageMode::Single => Some("image"),
            ImageMode::Multiple => Some("images"),
        }
    }
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Blob store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum Storage {
    /// Files written under `directory` and served by this instance.
    Local { directory: PathBuf },
    /// Cloudinary signed uploads.
    Cloudinary {
        cloud_name: String,
        key: String,
        /// Falls back on `CLOUDINARY_SECRET` environnement variable.
        secret: Option<String>,
    },
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let mut config = match File::open(file_path) {
            Ok(file) => match serde_yaml::from_reader::<_, Configuration>(file) {
                Ok(config) => config,
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        };

        // set app version.
        config.version = VERSION.to_owned();

        // normalize URL. `profile_url` is a prefix and stays as written.
        config.url = self.normalize_url(&config.url)?;

        config.apply_env();

        Ok(Arc::new(config))
    }

    /// Environnement variables overriding the file.
    fn apply_env(&mut self) {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.port = port;
        }

        if let Some(Storage::Cloudinary { secret, .. }) = &mut self.storage {
            if let Ok(value) = std::env::var("CLOUDINARY_SECRET") {
                *secret = Some(value);
            }
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found or invalid");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn read(yaml: &str) -> Arc<Configuration> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        Configuration::default()
            .path(file.path().to_path_buf())
            .read()
            .unwrap()
    }

    #[test]
    fn test_read_full_file() {
        let config = read(
            r#"
name: profiles
url: api.example.com
profile_url: https://example.com/user/
body_limit: 1024
features:
  images: multiple
  delete: true
postgres:
  address: localhost:5432
  database: vanity
storage:
  provider: local
  directory: /var/lib/vanity
"#,
        );

        assert_eq!(config.name, "profiles");
        assert_eq!(config.url, "https://api.example.com/");
        assert_eq!(config.profile_url, "https://example.com/user/");
        assert_eq!(config.body_limit, 1024);
        assert_eq!(config.features.images, ImageMode::Multiple);
        assert!(config.features.delete);
        assert_eq!(config.version, VERSION);
        assert_eq!(
            config.postgres.as_ref().map(|p| p.address.as_str()),
            Some("localhost:5432")
        );
        assert_eq!(
            config.storage,
            Some(Storage::Local {
                directory: "/var/lib/vanity".into()
            })
        );
    }

    #[test]
    fn test_profile_url_kept_as_written() {
        let config = read("url: API.example.com\nprofile_url: https://Example.com/~me/#/user/\n");

        assert_eq!(config.url, "https://api.example.com/");
        assert_eq!(config.profile_url, "https://Example.com/~me/#/user/");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = read("name: tiny\n");

        assert_eq!(config.name, "tiny");
        assert_eq!(config.profile_url, "http://localhost:5173/user/");
        assert_eq!(config.body_limit, DEFAULT_BODY_LIMIT);
        assert_eq!(config.features, Features::default());
        assert!(config.postgres.is_none());
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let config = read("features: [not, a, map]\n");
        assert_eq!(config.features, Features::default());
        assert_eq!(config.name, "vanity");
    }

    #[test]
    fn test_cloudinary_storage() {
        let config = read(
            r#"
storage:
  provider: cloudinary
  cloud_name: demo
  key: "1234"
  secret: s3cr3t
"#,
        );

        assert!(matches!(
            config.storage,
            Some(Storage::Cloudinary { ref cloud_name, .. }) if cloud_name == "demo"
        ));
    }

    #[test]
    fn test_image_mode_limits() {
        assert_eq!(ImageMode::None.limit(), 0);
        assert_eq!(ImageMode::Single.limit(), 1);
        assert_eq!(ImageMode::Multiple.limit(), 7);
        assert_eq!(ImageMode::Single.field(), Some("image"));
        assert_eq!(ImageMode::Multiple.field(), Some("images"));
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut config = Configuration::default();
        config.postgres = Some(Postgres {
            password: Some("hunter2".into()),
            ..Default::default()
        });

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }
}

mod builder;
mod memory;
mod repository;
mod service;

pub use builder::*;
pub use memory::*;
pub use repository::*;
pub use service::*;

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use validator::{ValidationError, ValidationErrors};

/// Maximum number of images attached to a [`User`].
pub const MAX_IMAGES: usize = 7;

/// User as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub unique_slug: String,
    /// Profile link, `profile_url` followed by the slug.
    pub url: String,
    pub images: Vec<String>,
    /// Stored as plaintext, never serialized.
    #[serde(skip)]
    pub secret: Option<String>,
}

impl User {
    /// Create a new [`UserBuilder`].
    pub fn builder() -> UserBuilder<Missing, Missing> {
        UserBuilder::new()
    }
}

/// Four ASCII digits shared secret guarding deletion.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Exact number of digits.
    pub const LENGTH: usize = 4;

    /// Check `value` format without building a [`Secret`].
    pub fn check(value: &str) -> Result<(), ValidationError> {
        if value.len() == Self::LENGTH && value.bytes().all(|b| b.is_ascii_digit()) {
            Ok(())
        } else {
            Err(ValidationError::new("secret")
                .with_message(Cow::Borrowed("Secret must be exactly 4 digits.")))
        }
    }

    /// Whether `stored` is the same secret. Users without secret never match.
    pub fn matches(&self, stored: Option<&str>) -> bool {
        stored == Some(self.0.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Secret {
    type Error = ValidationErrors;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match Self::check(&value) {
            Ok(()) => Ok(Self(value)),
            Err(err) => {
                let mut errors = ValidationErrors::new();
                errors.add("secret", err);
                Err(errors)
            },
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

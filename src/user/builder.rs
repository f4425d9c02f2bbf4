//! Typed builder for User.

use crate::user::{Secret, User};

/// [`User`] builder.
#[derive(Debug, Clone)]
pub struct UserBuilder<Username, Slug> {
    username: Username,
    slug: Slug,
    images: Vec<String>,
    secret: Option<Secret>,
}

/// Value is missing on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

impl UserBuilder<Missing, Missing> {
    /// Create a new [`UserBuilder`].
    pub fn new() -> Self {
        Self {
            username: Missing,
            slug: Missing,
            images: Vec::new(),
            secret: None,
        }
    }
}

impl Default for UserBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Slug> UserBuilder<Missing, Slug> {
    /// Update `username` field on [`UserBuilder`].
    pub fn username(
        self,
        username: impl Into<String>,
    ) -> UserBuilder<Present<String>, Slug> {
        UserBuilder {
            username: Present(username.into()),
            slug: self.slug,
            images: self.images,
            secret: self.secret,
        }
    }
}

impl<Username> UserBuilder<Username, Missing> {
    /// Update `unique_slug` field on [`UserBuilder`].
    pub fn slug(
        self,
        slug: impl Into<String>,
    ) -> UserBuilder<Username, Present<String>> {
        UserBuilder {
            username: self.username,
            slug: Present(slug.into()),
            images: self.images,
            secret: self.secret,
        }
    }
}

impl<Username, Slug> UserBuilder<Username, Slug> {
    /// Update `images` field on [`UserBuilder`].
    pub fn images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Update `secret` field on [`UserBuilder`].
    pub fn secret(mut self, secret: Option<Secret>) -> Self {
        self.secret = secret;
        self
    }
}

impl UserBuilder<Present<String>, Present<String>> {
    /// Build a [`User`], deriving its profile link from `profile_url`.
    pub fn build(self, profile_url: &str) -> User {
        let slug = self.slug.0;

        User {
            username: self.username.0,
            url: format!("{profile_url}{slug}"),
            unique_slug: slug,
            images: self.images,
            secret: self.secret.map(|s| s.as_str().to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_concatenates_profile_url() {
        let user = User::builder()
            .slug("alice123")
            .username("Alice")
            .build("https://x/user/");

        assert_eq!(user.username, "Alice");
        assert_eq!(user.unique_slug, "alice123");
        assert_eq!(user.url, "https://x/user/alice123");
        assert!(user.images.is_empty());
        assert_eq!(user.secret, None);
    }

    #[test]
    fn test_build_keeps_images_order_and_secret() {
        let secret = Secret::try_from("0042".to_owned()).unwrap();
        let user = User::builder()
            .username("Bob")
            .slug("bob")
            .images(vec!["b".into(), "a".into()])
            .secret(Some(secret))
            .build("http://localhost:5173/user/");

        assert_eq!(user.images, ["b", "a"]);
        assert_eq!(user.secret.as_deref(), Some("0042"));
    }
}

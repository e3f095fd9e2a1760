//! User records and the login exchange.

use serde::{Deserialize, Serialize};

/// A registered user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Login handle, when the backend includes it.
    #[serde(default)]
    pub username: Option<String>,
    /// Email address.
    pub email: String,
    /// Ten-digit phone number.
    #[serde(rename = "phoneNo")]
    pub phone: String,
    /// Stored avatar file name, served under `/uploads/`.
    #[serde(rename = "profile_image", default)]
    pub profile_image: Option<String>,
}

impl User {
    /// Resolves the avatar file name against the backend base URL.
    ///
    /// Returns `None` when the user has no avatar.
    #[must_use]
    pub fn avatar_url(&self, base_url: &str) -> Option<String> {
        let file = self.profile_image.as_deref().filter(|f| !f.is_empty())?;
        Some(format!("{}/uploads/{file}", base_url.trim_end_matches('/')))
    }
}

/// Body of `POST /users/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Email, phone number or username.
    pub identifier: String,
    /// Plain password.
    pub password: String,
}

/// Success body of `POST /users/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Opaque session token, sent back raw in the `Authorization` header.
    #[serde(rename = "jwtToken")]
    pub jwt_token: String,
    /// The authenticated user.
    pub user: User,
}

/// Multipart field names shared by the signup and profile update forms.
pub mod form_fields {
    /// Display name.
    pub const NAME: &str = "name";
    /// Login handle.
    pub const USERNAME: &str = "username";
    /// Email address.
    pub const EMAIL: &str = "email";
    /// Phone number.
    pub const PHONE: &str = "phoneNo";
    /// Password.
    pub const PASSWORD: &str = "password";
    /// Avatar image file.
    pub const PROFILE_IMAGE: &str = "profile_image";
}

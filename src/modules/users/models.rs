use serde::{Deserialize, Serialize};

/// Stored account record. The password survives only as an argon2 hash,
/// which never serializes into responses.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Registration form. Every field is optional so missing ones can be
/// reported per field instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterPayload {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Credential form for login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginPayload {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// What the profile endpoint exposes about the current user.
#[derive(Debug, Serialize)]
pub struct Profile {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

use serde::{Deserialize, Serialize};

/// Reported by `/api/version` when nothing has been published yet.
pub const DEFAULT_VERSION: &str = "1.0";

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

// -- Community --

#[derive(Debug, Deserialize)]
pub struct CommunityPostForm {
    pub content: String,
}

// -- Version --

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct VersionResponse {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub url: String,
}

impl Default for VersionResponse {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            title: None,
            url: String::new(),
        }
    }
}

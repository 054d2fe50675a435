//! Authentication request/response models

use serde::{Deserialize, Serialize};

/// Form submitted to `/register` and `/login`
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Body of `GET /api/home`
#[derive(Debug, Serialize, Deserialize)]
pub struct Greeting {
    pub id: i64,
    pub username: String,
    pub message: String,
}

/// Cookie attributes applied to the token cookie
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
    pub max_age: i64,
}

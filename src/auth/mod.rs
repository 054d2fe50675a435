//! Authentication module
//!
//! This module provides authentication functionality including:
//! - Signed, expiring tokens
//! - Password hashing and credential checks
//! - The request gate binding the token cookie to the session
//! - Register, login and logout handlers

pub mod credentials;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod token;

pub use credentials::CredentialVerifier;
pub use handlers::{login, logout, register};
pub use middleware::{authenticate, AuthUser};
pub use password::{hash_password, verify_password};
pub use token::{TokenClaims, TokenCodec, TokenError};

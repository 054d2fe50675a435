//! Password hashing and verification using bcrypt

use crate::core::error::{Result, StockroomError};

/// Hash a password using bcrypt with the given cost
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).map_err(|e| StockroomError::HashingError(e.to_string()))
}

/// Verify a password against a stored hash.
///
/// An unreadable hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be checked");
            false
        }
    }
}

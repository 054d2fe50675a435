//! Account registration and password checks

use crate::auth::password::{hash_password, verify_password};
use crate::core::error::{FieldError, Result, StockroomError};
use crate::db::models::Account;
use crate::db::repository::{AccountRepository, Repository};
use std::sync::{Arc, OnceLock};

/// Shortest password accepted on registration and login
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hashed once and compared against when the username is unknown
const PLACEHOLDER_PASSWORD: &str = "placeholder-password";

/// Registers accounts and checks submitted credentials against stored hashes
#[derive(Clone)]
pub struct CredentialVerifier {
    account_repo: Arc<AccountRepository>,
    bcrypt_cost: u32,
    placeholder_hash: Arc<OnceLock<String>>,
}

impl CredentialVerifier {
    pub fn new(account_repo: Arc<AccountRepository>, bcrypt_cost: u32) -> Self {
        Self {
            account_repo,
            bcrypt_cost,
            placeholder_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Spend the same bcrypt work a real comparison would
    fn compare_placeholder(&self, password: &str) {
        let hash = self.placeholder_hash.get_or_init(|| {
            hash_password(PLACEHOLDER_PASSWORD, self.bcrypt_cost).unwrap_or_default()
        });
        let _ = verify_password(password, hash);
    }

    /// Create an account holding a salted hash of `password`
    pub async fn register(&self, username: &str, password: &str) -> Result<Account> {
        validate_credentials(username, password)?;

        let password_hash = hash_password(password, self.bcrypt_cost)?;
        let now = chrono::Utc::now().to_rfc3339();
        let mut account = Account {
            id: 0,
            username: username.to_string(),
            password_hash,
            created_at: now.clone(),
            updated_at: now,
        };

        account.id = self.account_repo.create(&account).await.map_err(|e| {
            tracing::warn!(username = %username, error = %e, "Registration failed");
            e
        })?;

        tracing::info!(account_id = account.id, username = %account.username, "Account registered");
        Ok(account)
    }

    /// Resolve `username` and check `password` against its stored hash.
    ///
    /// Unknown usernames and wrong passwords both yield
    /// [`StockroomError::InvalidCredentials`].
    pub async fn login(&self, username: &str, password: &str) -> Result<Account> {
        validate_credentials(username, password)?;

        let account = match self.account_repo.find_by_username(username).await? {
            Some(account) => account,
            None => {
                tracing::warn!(username = %username, "Login for unknown account");
                self.compare_placeholder(password);
                return Err(StockroomError::InvalidCredentials);
            }
        };

        if !verify_password(password, &account.password_hash) {
            tracing::warn!(username = %username, "Login with wrong password");
            return Err(StockroomError::InvalidCredentials);
        }

        Ok(account)
    }
}

fn validate_credentials(username: &str, password: &str) -> Result<()> {
    let mut errors = Vec::new();

    if username.trim().is_empty() {
        errors.push(FieldError::new("username", "is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(StockroomError::ValidationError(errors))
    }
}

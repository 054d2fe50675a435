pub mod items;
pub mod system;

pub use items::*;
pub use system::*;

use crate::auth::credentials::CredentialVerifier;
use crate::auth::models::CookiePolicy;
use crate::auth::token::TokenCodec;
use crate::core::services::ItemService;
use crate::db::repository::AccountRepository;
use crate::session::SessionStore;
use std::collections::HashSet;
use std::sync::Arc;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub account_repo: Arc<AccountRepository>,
    pub item_service: Arc<ItemService>,
    pub credentials: Arc<CredentialVerifier>,
    pub token_codec: Arc<TokenCodec>,
    pub session_store: Arc<dyn SessionStore>,
    /// Paths admitted by the gate without authentication
    pub public_paths: Arc<HashSet<String>>,
    pub cookie_policy: CookiePolicy,
}

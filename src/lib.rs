//! Stockroom Library
//!
//! Inventory web service whose access control binds a signed token cookie to
//! a server-side session.

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod session;

// Re-export commonly used types
pub use crate::core::{Config, StockroomError};
pub use api::ApiServer;
pub use db::DatabaseManager;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

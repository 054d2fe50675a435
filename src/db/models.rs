//! Database models
//!
//! Data structures representing database tables

use serde::{Deserialize, Serialize};

/// Account record in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Inventory item record in the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub stock: i64,
    pub price: i64,
    pub created_at: String,
    pub updated_at: String,
}

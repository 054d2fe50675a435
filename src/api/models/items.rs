use crate::db::models::Item;
use serde::{Deserialize, Serialize};

/// Form submitted to `/api/create` and `/api/edit/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct ItemForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub price: i64,
}

/// Item list response
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemListResponse {
    pub items: Vec<Item>,
    pub total: usize,
}

//! Business logic services
//!
//! Coordinates between the REST API layer and the repositories.

use crate::api::models::ItemForm;
use crate::core::error::{FieldError, Result, StockroomError};
use crate::db::models::Item;
use crate::db::repository::{ItemRepository, Repository};
use chrono::Utc;
use std::sync::Arc;

/// Longest item name accepted
pub const MAX_ITEM_NAME_LEN: usize = 144;

/// Inventory service over the item repository
pub struct ItemService {
    item_repo: Arc<ItemRepository>,
}

impl ItemService {
    /// Create a new ItemService
    pub fn new(item_repo: Arc<ItemRepository>) -> Self {
        Self { item_repo }
    }

    /// Get all items
    pub async fn find_all(&self) -> Result<Vec<Item>> {
        self.item_repo.find_all().await
    }

    /// Get an item by ID, failing with NotFound on a miss
    pub async fn find_by_id(&self, id: i64) -> Result<Item> {
        self.item_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| StockroomError::NotFound(format!("Item {}", id)))
    }

    /// Create a new item
    pub async fn create(&self, form: ItemForm) -> Result<Item> {
        validate_form(&form)?;

        let now = Utc::now().to_rfc3339();
        let mut item = Item {
            id: 0,
            name: form.name.trim().to_string(),
            stock: form.stock,
            price: form.price,
            created_at: now.clone(),
            updated_at: now,
        };
        item.id = self.item_repo.create(&item).await?;

        tracing::info!(item_id = item.id, name = %item.name, "Item created");
        Ok(item)
    }

    /// Replace an existing item's fields
    pub async fn edit(&self, id: i64, form: ItemForm) -> Result<Item> {
        validate_form(&form)?;

        let mut item = self.find_by_id(id).await?;
        item.name = form.name.trim().to_string();
        item.stock = form.stock;
        item.price = form.price;
        item.updated_at = Utc::now().to_rfc3339();

        self.item_repo.update(&item).await?;

        tracing::info!(item_id = item.id, "Item updated");
        Ok(item)
    }

    /// Delete an item
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.find_by_id(id).await?;
        self.item_repo.delete(id).await?;

        tracing::info!(item_id = id, "Item deleted");
        Ok(())
    }
}

fn validate_form(form: &ItemForm) -> Result<()> {
    let mut errors = Vec::new();

    let name = form.name.trim();
    if name.is_empty() {
        errors.push(FieldError::new("name", "is required"));
    } else if name.chars().count() > MAX_ITEM_NAME_LEN {
        errors.push(FieldError::new(
            "name",
            format!("must be at most {} characters", MAX_ITEM_NAME_LEN),
        ));
    }
    if form.stock < 0 {
        errors.push(FieldError::new("stock", "cannot be negative"));
    }
    if form.price < 0 {
        errors.push(FieldError::new("price", "cannot be negative"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(StockroomError::ValidationError(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseManager;

    fn service() -> ItemService {
        let db = Arc::new(DatabaseManager::new_in_memory().unwrap());
        ItemService::new(Arc::new(ItemRepository::new(db)))
    }

    fn form(name: &str, stock: i64, price: i64) -> ItemForm {
        ItemForm {
            name: name.to_string(),
            stock,
            price,
        }
    }

    #[tokio::test]
    async fn test_item_lifecycle() {
        let service = service();

        let item = service.create(form("  Widget ", 3, 1500)).await.unwrap();
        assert_eq!(item.name, "Widget");
        assert_eq!(service.find_all().await.unwrap().len(), 1);

        let edited = service.edit(item.id, form("Widget", 9, 1400)).await.unwrap();
        assert_eq!(edited.stock, 9);
        assert_eq!(service.find_by_id(item.id).await.unwrap().price, 1400);

        service.delete(item.id).await.unwrap();
        assert!(matches!(
            service.find_by_id(item.id).await,
            Err(StockroomError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_item_operations() {
        let service = service();
        assert!(matches!(
            service.edit(99, form("x", 1, 1)).await,
            Err(StockroomError::NotFound(_))
        ));
        assert!(matches!(service.delete(99).await, Err(StockroomError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_item_rejected() {
        let service = service();
        let long_name = "n".repeat(MAX_ITEM_NAME_LEN + 1);

        for bad in [form("", 1, 1), form(&long_name, 1, 1), form("ok", -1, 1), form("ok", 1, -5)] {
            assert!(matches!(
                service.create(bad).await,
                Err(StockroomError::ValidationError(_))
            ));
        }
        assert!(service.find_all().await.unwrap().is_empty());
    }
}

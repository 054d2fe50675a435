//! Repository pattern implementation for data access layer
//!
//! This module provides the Repository pattern for abstracting database operations.

use crate::core::error::{Result, StockroomError};
use crate::db::manager::DatabaseManager;
use crate::db::models::{Account, Item};
use async_trait::async_trait;
use rusqlite::{ErrorCode, OptionalExtension, Row};
use std::sync::Arc;

/// Generic repository trait for CRUD operations
#[async_trait]
pub trait Repository<T>: Send + Sync {
    /// Find an entity by its ID
    async fn find_by_id(&self, id: i64) -> Result<Option<T>>;

    /// Find all entities
    async fn find_all(&self) -> Result<Vec<T>>;

    /// Create a new entity, returning its assigned ID
    async fn create(&self, entity: &T) -> Result<i64>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> Result<()>;

    /// Delete an entity by its ID
    async fn delete(&self, id: i64) -> Result<()>;
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        stock: row.get(2)?,
        price: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Repository for Account entities
pub struct AccountRepository {
    db: Arc<DatabaseManager>,
}

impl AccountRepository {
    /// Create a new AccountRepository
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Find an account by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let username = username.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT id, username, password_hash, created_at, updated_at \
                     FROM accounts WHERE username = ?",
                    [&username],
                    account_from_row,
                )
                .optional()
                .map_err(StockroomError::DatabaseError)
            })
            .await
    }

    /// Count registered accounts
    pub async fn count(&self) -> Result<i64> {
        self.db
            .execute(|conn| {
                conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))
                    .map_err(StockroomError::DatabaseError)
            })
            .await
    }
}

#[async_trait]
impl Repository<Account> for AccountRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT id, username, password_hash, created_at, updated_at \
                     FROM accounts WHERE id = ?",
                    [id],
                    account_from_row,
                )
                .optional()
                .map_err(StockroomError::DatabaseError)
            })
            .await
    }

    async fn find_all(&self) -> Result<Vec<Account>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, username, password_hash, created_at, updated_at \
                         FROM accounts ORDER BY id",
                    )
                    .map_err(StockroomError::DatabaseError)?;

                let accounts = stmt
                    .query_map([], account_from_row)
                    .map_err(StockroomError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(StockroomError::DatabaseError)?;

                Ok(accounts)
            })
            .await
    }

    async fn create(&self, account: &Account) -> Result<i64> {
        let account = account.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO accounts (username, password_hash, created_at, updated_at) \
                     VALUES (?, ?, ?, ?)",
                    rusqlite::params![
                        &account.username,
                        &account.password_hash,
                        &account.created_at,
                        &account.updated_at,
                    ],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StockroomError::DuplicateUsername(account.username.clone())
                    } else {
                        StockroomError::DatabaseError(e)
                    }
                })?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    async fn update(&self, account: &Account) -> Result<()> {
        let account = account.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "UPDATE accounts SET username = ?, password_hash = ?, updated_at = ? WHERE id = ?",
                    rusqlite::params![
                        &account.username,
                        &account.password_hash,
                        &account.updated_at,
                        account.id,
                    ],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StockroomError::DuplicateUsername(account.username.clone())
                    } else {
                        StockroomError::DatabaseError(e)
                    }
                })?;
                Ok(())
            })
            .await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.db
            .execute(move |conn| {
                conn.execute("DELETE FROM accounts WHERE id = ?", [id])
                    .map_err(StockroomError::DatabaseError)?;
                Ok(())
            })
            .await
    }
}

/// Repository for inventory Item entities
pub struct ItemRepository {
    db: Arc<DatabaseManager>,
}

impl ItemRepository {
    /// Create a new ItemRepository
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository<Item> for ItemRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Item>> {
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT id, name, stock, price, created_at, updated_at FROM items WHERE id = ?",
                    [id],
                    item_from_row,
                )
                .optional()
                .map_err(StockroomError::DatabaseError)
            })
            .await
    }

    async fn find_all(&self) -> Result<Vec<Item>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, name, stock, price, created_at, updated_at FROM items ORDER BY id",
                    )
                    .map_err(StockroomError::DatabaseError)?;

                let items = stmt
                    .query_map([], item_from_row)
                    .map_err(StockroomError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(StockroomError::DatabaseError)?;

                Ok(items)
            })
            .await
    }

    async fn create(&self, item: &Item) -> Result<i64> {
        let item = item.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO items (name, stock, price, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?)",
                    rusqlite::params![
                        &item.name,
                        item.stock,
                        item.price,
                        &item.created_at,
                        &item.updated_at,
                    ],
                )
                .map_err(StockroomError::DatabaseError)?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    async fn update(&self, item: &Item) -> Result<()> {
        let item = item.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "UPDATE items SET name = ?, stock = ?, price = ?, updated_at = ? WHERE id = ?",
                    rusqlite::params![&item.name, item.stock, item.price, &item.updated_at, item.id],
                )
                .map_err(StockroomError::DatabaseError)?;
                Ok(())
            })
            .await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.db
            .execute(move |conn| {
                conn.execute("DELETE FROM items WHERE id = ?", [id])
                    .map_err(StockroomError::DatabaseError)?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(username: &str) -> Account {
        let now = chrono::Utc::now().to_rfc3339();
        Account {
            id: 0,
            username: username.to_string(),
            password_hash: "hash".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn item(name: &str) -> Item {
        let now = chrono::Utc::now().to_rfc3339();
        Item {
            id: 0,
            name: name.to_string(),
            stock: 5,
            price: 1200,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_account_create_and_lookup() {
        let repo = AccountRepository::new(Arc::new(DatabaseManager::new_in_memory().unwrap()));

        let id = repo.create(&account("alice")).await.unwrap();
        assert!(id > 0);

        let by_name = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, id);
        let by_id = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert!(repo.find_by_username("bob").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_reported() {
        let repo = AccountRepository::new(Arc::new(DatabaseManager::new_in_memory().unwrap()));

        repo.create(&account("alice")).await.unwrap();
        let err = repo.create(&account("alice")).await.unwrap_err();
        assert!(matches!(err, StockroomError::DuplicateUsername(name) if name == "alice"));
    }

    #[tokio::test]
    async fn test_item_crud() {
        let repo = ItemRepository::new(Arc::new(DatabaseManager::new_in_memory().unwrap()));

        let id = repo.create(&item("bolt")).await.unwrap();
        repo.create(&item("nut")).await.unwrap();
        assert_eq!(repo.find_all().await.unwrap().len(), 2);

        let mut bolt = repo.find_by_id(id).await.unwrap().unwrap();
        bolt.stock = 42;
        repo.update(&bolt).await.unwrap();
        assert_eq!(repo.find_by_id(id).await.unwrap().unwrap().stock, 42);

        repo.delete(id).await.unwrap();
        assert!(repo.find_by_id(id).await.unwrap().is_none());
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }
}

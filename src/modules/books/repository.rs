use std::sync::Arc;

use async_trait::async_trait;
use bookstore_db::{Filter, MemoryDataSource, StoreError};
use serde_json::Value;

use super::models::{Book, BookPatch, NewBook, MODEL_NAME};

/// Persistence operations for books
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn create(&self, book: NewBook) -> Result<Book, StoreError>;

    async fn find(&self, filter: &Filter) -> Result<Vec<Book>, StoreError>;

    async fn find_by_id(&self, id: u64) -> Result<Book, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn update_by_id(&self, id: u64, patch: BookPatch) -> Result<(), StoreError>;

    async fn delete_by_id(&self, id: u64) -> Result<(), StoreError>;
}

/// [`BookRepository`] over the shared memory datasource
pub struct MemoryBookRepository {
    datasource: Arc<MemoryDataSource>,
}

impl MemoryBookRepository {
    pub fn new(datasource: Arc<MemoryDataSource>) -> Self {
        Self { datasource }
    }
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn create(&self, book: NewBook) -> Result<Book, StoreError> {
        let record = serde_json::to_value(&book)?;
        let stored = self.datasource.insert(MODEL_NAME, record).await?;
        Ok(serde_json::from_value(stored)?)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Book>, StoreError> {
        self.datasource
            .find(MODEL_NAME, filter)
            .await
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(StoreError::from))
            .collect()
    }

    async fn find_by_id(&self, id: u64) -> Result<Book, StoreError> {
        let record = self.datasource.find_by_id(MODEL_NAME, id).await?;
        Ok(serde_json::from_value(record)?)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.datasource.count(MODEL_NAME).await)
    }

    async fn update_by_id(&self, id: u64, patch: BookPatch) -> Result<(), StoreError> {
        let Value::Object(fields) = serde_json::to_value(&patch)? else {
            return Err(StoreError::InvalidRecord {
                model: MODEL_NAME.to_string(),
                reason: "patch must serialize to an object".to_string(),
            });
        };
        self.datasource.update_by_id(MODEL_NAME, id, fields).await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: u64) -> Result<(), StoreError> {
        self.datasource.delete_by_id(MODEL_NAME, id).await
    }
}

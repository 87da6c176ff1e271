use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use bookstore_db::Filter;
use bookstore_kernel::{
    InterceptorChain, InvocationContext, InvocationError, InvocationResult, InvocationTarget,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::models::{Book, BookPatch, NewBook};
use super::repository::BookRepository;

pub const CREATE: &str = "create";
pub const UPDATE_BY_ID: &str = "updateById";

/// Book operations exposed to the HTTP layer.
///
/// Writes run through the interceptor chain with the controller itself as the
/// target; reads and deletes go straight to the repository.
pub struct BookController {
    repository: Arc<dyn BookRepository>,
    interceptors: InterceptorChain,
}

impl BookController {
    pub fn new(repository: Arc<dyn BookRepository>, interceptors: InterceptorChain) -> Self {
        Self {
            repository,
            interceptors,
        }
    }

    pub async fn create(&self, payload: Value) -> Result<Book, InvocationError> {
        let mut ctx = InvocationContext::new(CREATE, vec![payload]);
        let created = self.interceptors.invoke(&mut ctx, self).await?;
        serde_json::from_value(created).map_err(|err| InvocationError::Internal(err.into()))
    }

    pub async fn update_by_id(&self, id: u64, payload: Value) -> Result<(), InvocationError> {
        let mut ctx = InvocationContext::new(UPDATE_BY_ID, vec![Value::from(id), payload]);
        self.interceptors.invoke(&mut ctx, self).await.map(|_| ())
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<Book>, InvocationError> {
        Ok(self.repository.find(filter).await?)
    }

    pub async fn find_by_id(&self, id: u64) -> Result<Book, InvocationError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    pub async fn count(&self) -> Result<u64, InvocationError> {
        Ok(self.repository.count().await?)
    }

    pub async fn delete_by_id(&self, id: u64) -> Result<(), InvocationError> {
        Ok(self.repository.delete_by_id(id).await?)
    }
}

#[async_trait]
impl InvocationTarget for BookController {
    async fn invoke(&self, ctx: &mut InvocationContext) -> InvocationResult {
        match ctx.method_name() {
            CREATE => {
                let book: NewBook = argument(ctx, 0)?;
                let created = self.repository.create(book).await?;
                Ok(serde_json::to_value(created).map_err(anyhow::Error::from)?)
            }
            UPDATE_BY_ID => {
                let id: u64 = argument(ctx, 0)?;
                let patch: BookPatch = argument(ctx, 1)?;
                self.repository.update_by_id(id, patch).await?;
                Ok(Value::Null)
            }
            other => Err(anyhow!("unsupported book operation '{other}'").into()),
        }
    }
}

/// Decode positional argument `index`; a missing argument decodes from null
fn argument<T: DeserializeOwned>(ctx: &InvocationContext, index: usize) -> Result<T, InvocationError> {
    let value = ctx.args().get(index).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|err| {
        InvocationError::unprocessable(format!(
            "invalid argument {} for {}: {}",
            index,
            ctx.method_name(),
            err
        ))
    })
}

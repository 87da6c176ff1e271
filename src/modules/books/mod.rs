pub mod controller;
pub mod interceptor;
pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookstore_db::MemoryDataSource;
use bookstore_kernel::{InitCtx, InterceptorChain, Module};
use serde_json::json;

use controller::BookController;
use interceptor::ValidateDateInterceptor;
use repository::{BookRepository, MemoryBookRepository};

/// Books module: CRUD over the `Book` model with date validation on writes
pub struct BooksModule {
    controller: Arc<BookController>,
}

impl BooksModule {
    pub fn new(datasource: Arc<MemoryDataSource>) -> Self {
        let repository: Arc<dyn BookRepository> = Arc::new(MemoryBookRepository::new(datasource));
        let interceptors = InterceptorChain::new().with(Arc::new(ValidateDateInterceptor::new()));

        Self {
            controller: Arc::new(BookController::new(repository, interceptors)),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.controller.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book = |schema: &str| {
            json!({
                "application/json": {
                    "schema": { "$ref": format!("#/components/schemas/{schema}") }
                }
            })
        };
        let id_param = json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64", "minimum": 1 }
        }]);

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "limit", "in": "query", "required": false, "schema": { "type": "integer", "minimum": 0 } },
                            { "name": "skip", "in": "query", "required": false, "schema": { "type": "integer", "minimum": 0 } },
                            {
                                "name": "order",
                                "in": "query",
                                "required": false,
                                "description": "Sort key as '<field> [ASC|DESC]'",
                                "schema": { "type": "string" }
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "List of books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "422": error("Invalid order clause")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": { "required": true, "content": book("NewBook") },
                        "responses": {
                            "200": { "description": "Created book", "content": book("Book") },
                            "400": error("Date is invalid"),
                            "422": error("Unknown or malformed fields")
                        }
                    }
                },
                "/count": {
                    "get": {
                        "summary": "Count books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Number of stored books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": { "count": { "type": "integer" } },
                                            "required": ["count"]
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Find a book by id",
                        "tags": ["Books"],
                        "parameters": id_param.clone(),
                        "responses": {
                            "200": { "description": "The book", "content": book("Book") },
                            "404": error("Book not found")
                        }
                    },
                    "patch": {
                        "summary": "Update a book by id",
                        "tags": ["Books"],
                        "parameters": id_param.clone(),
                        "requestBody": { "required": true, "content": book("BookPatch") },
                        "responses": {
                            "204": { "description": "Book updated" },
                            "400": error("Date is invalid"),
                            "404": error("Book not found"),
                            "422": error("Unknown or malformed fields")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book by id",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "responses": {
                            "204": { "description": "Book deleted" },
                            "404": error("Book not found")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64", "description": "Generated identifier" },
                            "title": { "type": "string" },
                            "pages": { "type": "integer", "minimum": 0 },
                            "createdDate": {
                                "type": "integer",
                                "format": "int64",
                                "description": "Creation date in epoch milliseconds"
                            }
                        },
                        "required": ["id", "createdDate"]
                    },
                    "NewBook": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "title": { "type": "string" },
                            "pages": { "type": "integer", "minimum": 0 },
                            "createdDate": {
                                "type": "string",
                                "description": "Epoch milliseconds, as a numeric string",
                                "example": "1700000000000"
                            }
                        },
                        "required": ["createdDate"]
                    },
                    "BookPatch": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "title": { "type": "string" },
                            "pages": { "type": "integer", "minimum": 0 },
                            "createdDate": {
                                "type": "string",
                                "description": "Epoch milliseconds, as a numeric string",
                                "example": "1700000000000"
                            }
                        },
                        "required": ["createdDate"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = self.controller.count().await?;
        tracing::info!(module = self.name(), books, "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(datasource: Arc<MemoryDataSource>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(datasource))
}

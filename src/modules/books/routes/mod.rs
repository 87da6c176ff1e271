use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookstore_db::Filter;
use bookstore_http::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::controller::BookController;
use super::models::Book;

type Controller = State<Arc<BookController>>;

// Extractor failures are taken as `Result`s so they answer with the error envelope
type JsonPayload = Result<Json<Value>, JsonRejection>;
type BookId = Result<Path<u64>, PathRejection>;

/// HTTP routes for the Books module, relative to `/api/books`
pub fn router(controller: Arc<BookController>) -> Router {
    Router::new()
        .route("/", get(find_books).post(create_book))
        .route("/count", get(count_books))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(find_book_by_id)
                .patch(update_book_by_id)
                .delete(delete_book_by_id),
        )
        .with_state(controller)
}

/// Query string accepted by `GET /`
#[derive(Debug, Default, Deserialize)]
pub struct FindQuery {
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    /// `"<field> [ASC|DESC]"`
    pub order: Option<String>,
}

impl FindQuery {
    fn to_filter(&self) -> Result<Filter, AppError> {
        let mut filter = Filter::new().skip(self.skip.unwrap_or(0));
        if let Some(limit) = self.limit {
            filter = filter.limit(limit);
        }
        if let Some(order) = &self.order {
            filter = filter.order(order.parse().map_err(|err| {
                AppError::validation(vec![serde_json::json!({"field": "order"})], format!("{err}"))
            })?);
        }
        Ok(filter)
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn create_book(
    State(controller): Controller,
    payload: JsonPayload,
) -> Result<Json<Book>, AppError> {
    let Json(payload) = payload?;
    let book = controller.create(payload).await?;
    tracing::info!(book_id = book.id, "book created");
    Ok(Json(book))
}

async fn find_books(
    State(controller): Controller,
    query: Result<Query<FindQuery>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(query) = query?;
    let filter = query.to_filter()?;
    Ok(Json(controller.find(&filter).await?))
}

async fn count_books(State(controller): Controller) -> Result<Json<CountResponse>, AppError> {
    let count = controller.count().await?;
    Ok(Json(CountResponse { count }))
}

async fn find_book_by_id(
    State(controller): Controller,
    id: BookId,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    Ok(Json(controller.find_by_id(id).await?))
}

async fn update_book_by_id(
    State(controller): Controller,
    id: BookId,
    payload: JsonPayload,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    controller.update_by_id(id, payload).await?;
    tracing::info!(book_id = id, "book updated");
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_book_by_id(
    State(controller): Controller,
    id: BookId,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    controller.delete_by_id(id).await?;
    tracing::info!(book_id = id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::interceptor::ValidateDateInterceptor;
    use crate::modules::books::repository::MemoryBookRepository;
    use axum::{body::Body, http::Request, response::Response};
    use bookstore_db::MemoryDataSource;
    use bookstore_kernel::InterceptorChain;
    use serde_json::json;
    use tower::ServiceExt;

    fn app() -> Router {
        let repository = MemoryBookRepository::new(Arc::new(MemoryDataSource::new("memorydb")));
        let chain = InterceptorChain::new().with(Arc::new(ValidateDateInterceptor::new()));
        router(Arc::new(BookController::new(Arc::new(repository), chain)))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_then_fetch() {
        let app = app();

        let response = send(
            &app,
            "POST",
            "/",
            Some(json!({"title": "Dune", "pages": 412, "createdDate": "1700000000000"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let created = json_body(response).await;
        assert_eq!(
            created,
            json!({"id": 1, "title": "Dune", "pages": 412, "createdDate": 1_700_000_000_000_i64})
        );

        let response = send(&app, "GET", "/1", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, created);
    }

    #[tokio::test]
    async fn invalid_date_is_a_bad_request_and_stores_nothing() {
        let app = app();

        let response = send(&app, "POST", "/", Some(json!({"title": "Dune", "createdDate": "abc"}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "Date is invalid");
        assert_eq!(body["error"]["code"], "bad_request");

        let response = send(&app, "POST", "/", Some(json!({"title": "Dune"}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, "GET", "/count", None).await;
        assert_eq!(json_body(response).await, json!({"count": 0}));
    }

    #[tokio::test]
    async fn patch_updates_and_requires_a_date() {
        let app = app();
        send(&app, "POST", "/", Some(json!({"title": "Dune", "createdDate": "1700000000000"}))).await;

        let response = send(&app, "PATCH", "/1", Some(json!({"pages": 500}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, "PATCH", "/1", Some(json!({"pages": 500, "createdDate": "0"}))).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let book = json_body(send(&app, "GET", "/1", None).await).await;
        assert_eq!(book, json!({"id": 1, "title": "Dune", "pages": 500, "createdDate": 0}));

        let response = send(&app, "PATCH", "/9", Some(json!({"createdDate": "0"}))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_supports_order_skip_and_limit() {
        let app = app();
        for title in ["Dune", "Anathem", "Solaris"] {
            send(&app, "POST", "/", Some(json!({"title": title, "createdDate": "0"}))).await;
        }

        let books = json_body(send(&app, "GET", "/?order=title%20DESC&skip=1&limit=1", None).await).await;
        assert_eq!(books, json!([{"id": 1, "title": "Dune", "createdDate": 0}]));

        let response = send(&app, "GET", "/?order=title%20sideways", None).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn malformed_requests_answer_with_the_error_envelope() {
        let app = app();

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from("{\"title\": "))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(body["error"]["trace_id"].is_string());

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(json!({"createdDate": "0"}).to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "bad_request");

        for (method, body) in [
            ("GET", None),
            ("PATCH", Some(json!({"createdDate": "0"}))),
            ("DELETE", None),
        ] {
            let response = send(&app, method, "/abc", body).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method}");
            assert_eq!(json_body(response).await["error"]["code"], "bad_request");
        }

        let response = send(&app, "GET", "/?limit=many", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "bad_request");

        let response = send(&app, "GET", "/count", None).await;
        assert_eq!(json_body(response).await, json!({"count": 0}));
    }

    #[tokio::test]
    async fn reads_and_deletes_skip_date_validation() {
        let app = app();
        send(&app, "POST", "/", Some(json!({"title": "Dune", "createdDate": "0"}))).await;

        let response = send(&app, "DELETE", "/1", None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, "GET", "/1", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "Entity not found: Book with id 1");

        let response = send(&app, "DELETE", "/1", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, "GET", "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

pub mod catalog;
pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use shelf_authz::{AuthContext, CurrentUser};
use shelf_db::{Record, RecordId};
use shelf_http::error::{AppError, FieldError};
use shelf_kernel::settings::CatalogSettings;
use shelf_kernel::{InitCtx, Module};

use crate::modules::reviews::{Review, ReviewError, ReviewLedger, ReviewPayload};
use crate::utils;
use catalog::BookCatalog;
use models::{Book, BookDetail, BookPage, CreateBook, ListQuery};

/// Shared state behind the books router.
#[derive(Clone, FromRef)]
pub struct BooksState {
    pub catalog: Arc<BookCatalog>,
    pub ledger: Arc<ReviewLedger>,
    pub auth: AuthContext,
    pub paging: CatalogSettings,
}

/// Books module: catalog listing/search, detail, catalog management, and
/// review submission.
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(
        catalog: Arc<BookCatalog>,
        ledger: Arc<ReviewLedger>,
        auth: AuthContext,
        paging: CatalogSettings,
    ) -> Self {
        Self {
            state: BooksState {
                catalog,
                ledger,
                auth,
                paging,
            },
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
            prefix = %utils::log_prefix(self.name()),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_books).post(create_book))
            .route("/health", get(health_check))
            .route("/{id}", get(book_detail))
            .route("/{id}/reviews", post(submit_review))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List or search books",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "q",
                                "in": "query",
                                "description": "Case-insensitive substring matched against titles",
                                "schema": { "type": "string" }
                            },
                            {
                                "name": "page",
                                "in": "query",
                                "schema": { "type": "integer", "minimum": 1 }
                            },
                            {
                                "name": "page_size",
                                "in": "query",
                                "schema": { "type": "integer", "minimum": 1 }
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "One page of books",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookPage" }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Add a book to the catalog",
                        "tags": ["Books"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/CreateBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Created book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "302": { "description": "Redirect to login when unauthenticated" },
                            "422": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Book detail with its reviews",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "id",
                                "in": "path",
                                "required": true,
                                "schema": { "type": "string", "format": "uuid" }
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "The book record",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookDetail" }
                                    }
                                }
                            },
                            "404": {
                                "description": "Unknown book id",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}/reviews": {
                    "post": {
                        "summary": "Submit a review for a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/ReviewPayload" }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Created review",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Review" }
                                    }
                                }
                            },
                            "302": { "description": "Redirect to login when unauthenticated" },
                            "404": { "description": "Unknown book id" },
                            "422": { "description": "Validation error" }
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
                                "content": {
                                    "text/plain": { "schema": { "type": "string" } }
                                }
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
                            "id": { "type": "string", "format": "uuid" },
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "isbn": { "type": "string" }
                        },
                        "required": ["id", "title", "description", "isbn"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "isbn": { "type": "string" }
                        },
                        "required": ["title"]
                    },
                    "BookPage": {
                        "type": "object",
                        "properties": {
                            "books": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Book" }
                            },
                            "page": { "type": "integer" },
                            "page_size": { "type": "integer" },
                            "total": { "type": "integer" },
                            "message": { "type": "string" }
                        },
                        "required": ["books", "page", "page_size", "total"]
                    },
                    "BookDetail": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "isbn": { "type": "string" },
                            "reviews": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Review" }
                            }
                        },
                        "required": ["id", "title", "description", "isbn", "reviews"]
                    },
                    "Review": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "book_id": { "type": "string", "format": "uuid" },
                            "user_id": { "type": "string", "format": "uuid" },
                            "stars_given": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "comment": { "type": "string" }
                        },
                        "required": ["id", "book_id", "user_id", "stars_given", "comment"]
                    },
                    "ReviewPayload": {
                        "type": "object",
                        "properties": {
                            "stars_given": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "comment": { "type": "string" }
                        },
                        "required": ["stars_given"]
                    }
                }
            }
        }))
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(
    State(state): State<BooksState>,
    Query(query): Query<ListQuery>,
) -> Json<BookPage> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query
        .page_size
        .unwrap_or(state.paging.default_page_size)
        .clamp(1, state.paging.max_page_size.max(1));

    Json(state.catalog.page(query.q.as_deref(), page, page_size))
}

async fn book_detail(
    State(state): State<BooksState>,
    Path(id): Path<RecordId>,
) -> Result<Json<BookDetail>, AppError> {
    let book = state
        .catalog
        .get(id)
        .ok_or_else(|| AppError::not_found("book not found"))?;
    let reviews = state.ledger.for_book(book.id);

    Ok(Json(BookDetail { book, reviews }))
}

async fn create_book(
    State(state): State<BooksState>,
    _user: CurrentUser,
    Json(payload): Json<CreateBook>,
) -> Result<(StatusCode, Json<Record<Book>>), AppError> {
    let title = payload.title.unwrap_or_default();
    if title.trim().is_empty() {
        return Err(AppError::validation(
            vec![FieldError::new("title", "This field is required.")],
            "book payload failed validation",
        ));
    }

    let record = state.catalog.add(Book {
        title,
        description: payload.description.unwrap_or_default(),
        isbn: payload.isbn.unwrap_or_default(),
    });

    Ok((StatusCode::CREATED, Json(record)))
}

async fn submit_review(
    State(state): State<BooksState>,
    user: CurrentUser,
    Path(id): Path<RecordId>,
    Json(payload): Json<ReviewPayload>,
) -> Result<(StatusCode, Json<Record<Review>>), AppError> {
    let book = state
        .catalog
        .get(id)
        .ok_or_else(|| AppError::not_found("book not found"))?;

    let review = state
        .ledger
        .submit(book.id, user.user_id, payload)
        .map_err(review_error)?;

    Ok((StatusCode::CREATED, Json(review)))
}

fn review_error(err: ReviewError) -> AppError {
    let field_error = match err {
        ReviewError::MissingStars => FieldError::new("stars_given", "This field is required."),
        ReviewError::StarsOutOfRange { .. } => {
            FieldError::new("stars_given", "Ensure this value is between 1 and 5.")
        }
    };
    AppError::validation(vec![field_error], "review failed validation")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use shelf_authz::SessionStore;
    use shelf_db::new_record_id;
    use tower::ServiceExt;
    use tower_cookies::CookieManagerLayer;

    fn test_state() -> BooksState {
        BooksState {
            catalog: Arc::new(BookCatalog::new()),
            ledger: Arc::new(ReviewLedger::new()),
            auth: AuthContext::new(
                Arc::new(SessionStore::new()),
                "shelf_session",
                "/api/users/login",
            ),
            paging: CatalogSettings::default(),
        }
    }

    fn app(state: &BooksState) -> Router {
        BooksModule {
            state: state.clone(),
        }
        .routes()
        .layer(CookieManagerLayer::new())
    }

    fn seed(state: &BooksState) -> Vec<Record<Book>> {
        ["Sport", "Guide", "Shoe dog"]
            .iter()
            .enumerate()
            .map(|(index, title)| {
                state.catalog.add(Book {
                    title: title.to_string(),
                    description: format!("Description{}", index + 1),
                    isbn: format!("{0}{0}{0}", index + 1),
                })
            })
            .collect()
    }

    fn session_cookie(state: &BooksState) -> (String, RecordId) {
        let user_id = new_record_id();
        let token = state.auth.sessions.create(user_id);
        (format!("shelf_session={token}"), user_id)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn empty_catalog_reports_no_books_found() {
        let state = test_state();

        let response = app(&state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "No books found.");
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn listing_paginates_by_page_size() {
        let state = test_state();
        seed(&state);

        let response = app(&state)
            .oneshot(
                Request::builder()
                    .uri("/?page_size=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["books"].as_array().unwrap().len(), 2);
        assert_eq!(body["total"], 3);
        assert_eq!(body["page_size"], 2);
    }

    #[tokio::test]
    async fn page_size_is_clamped_to_the_configured_cap() {
        let state = test_state();
        seed(&state);

        let response = app(&state)
            .oneshot(
                Request::builder()
                    .uri("/?page_size=1000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["page_size"], state.paging.max_page_size);
    }

    #[tokio::test]
    async fn search_returns_only_matching_titles() {
        let state = test_state();
        seed(&state);

        for (query, expected) in [("sport", "Sport"), ("guide", "Guide"), ("shoe", "Shoe dog")] {
            let response = app(&state)
                .oneshot(
                    Request::builder()
                        .uri(format!("/?q={query}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            let body = body_json(response).await;
            let books = body["books"].as_array().unwrap();
            assert_eq!(books.len(), 1, "query {query:?}");
            assert_eq!(books[0]["title"], expected);
        }
    }

    #[tokio::test]
    async fn detail_renders_title_and_description() {
        let state = test_state();
        let records = seed(&state);

        let response = app(&state)
            .oneshot(
                Request::builder()
                    .uri(format!("/{}", records[0].id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["title"], "Sport");
        assert_eq!(body["description"], "Description1");
        assert!(body["reviews"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_book_id_is_not_found() {
        let state = test_state();

        let response = app(&state)
            .oneshot(
                Request::builder()
                    .uri(format!("/{}", new_record_id()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn review_submission_requires_a_session() {
        let state = test_state();
        let records = seed(&state);

        let response = app(&state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/{}/reviews", records[0].id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"stars_given": 5, "comment": "ok"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(response.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .starts_with("/api/users/login?next="));
        assert!(state.ledger.is_empty());
    }

    #[tokio::test]
    async fn authenticated_review_links_user_and_book() {
        let state = test_state();
        let records = seed(&state);
        let (cookie, user_id) = session_cookie(&state);

        let response = app(&state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/{}/reviews", records[0].id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::COOKIE, cookie)
                    .body(Body::from(r#"{"stars_given": 4, "comment": "Loved it"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let reviews = state.ledger.for_book(records[0].id);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].data.user_id, user_id);
        assert_eq!(reviews[0].data.stars_given, 4);
        assert_eq!(reviews[0].data.comment, "Loved it");
    }

    #[tokio::test]
    async fn out_of_range_stars_are_a_field_error() {
        let state = test_state();
        let records = seed(&state);
        let (cookie, _) = session_cookie(&state);

        let response = app(&state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/{}/reviews", records[0].id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::COOKIE, cookie)
                    .body(Body::from(r#"{"stars_given": 9}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["details"][0]["field"], "stars_given");
        assert!(state.ledger.is_empty());
    }

    #[tokio::test]
    async fn reviewing_an_unknown_book_is_not_found() {
        let state = test_state();
        let (cookie, _) = session_cookie(&state);

        let response = app(&state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/{}/reviews", new_record_id()))
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::COOKIE, cookie)
                    .body(Body::from(r#"{"stars_given": 3}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn catalog_management_requires_a_session_and_a_title() {
        let state = test_state();

        let response = app(&state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title": "Sport"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);

        let (cookie, _) = session_cookie(&state);
        let response = app(&state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::COOKIE, cookie.clone())
                    .body(Body::from(r#"{"description": "missing title"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(state.catalog.is_empty());

        let response = app(&state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::COOKIE, cookie)
                    .body(Body::from(
                        r#"{"title": "Sport", "description": "d", "isbn": "123456"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(state.catalog.len(), 1);
    }
}

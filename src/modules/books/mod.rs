pub mod models;
pub mod routes;

use std::sync::Arc;

use alicia_kernel::{AppContext, InitCtx, Module};
use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use crate::utils::openapi::{
    array_of, json_body, multipart_body, no_content, operation, path_id, query_param, reference,
    with_body, with_parameters,
};

/// Physical book catalog of each library
pub struct BooksModule;

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            bulk_limit = models::BULK_LIMIT,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, app: &AppContext) -> Router {
        routes::router(app)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let book_fields = json!({
            "title": {"type": "string", "description": "Title of the book"},
            "author": {"type": "string", "description": "Author of the book"},
            "isbn": {"type": "string"},
            "description": {"type": "string"},
            "genre": {"type": "string"},
            "price_cents": {"type": "integer", "minimum": 1},
            "stock": {"type": "integer", "minimum": 0},
            "cover_url": {"type": "string"}
        });
        let mut book_props = book_fields.clone();
        book_props["id"] = json!({"type": "string"});
        book_props["library_id"] = json!({"type": "string"});
        book_props["created_at"] = json!({"type": "string", "format": "date-time"});
        book_props["updated_at"] = json!({"type": "string", "format": "date-time"});
        let mut input_props = book_fields.clone();
        input_props["library_id"] = json!({"type": "string"});

        Some(json!({
            "paths": {
                "/": {
                    "get": with_parameters(
                        operation("Books", "List books", "200", array_of("Book")),
                        vec![
                            query_param("library_id", "string"),
                            query_param("genre", "string"),
                            query_param("author", "string"),
                            query_param("q", "string"),
                            query_param("in_stock", "boolean"),
                            query_param("limit", "integer"),
                        ],
                    ),
                    "post": with_body(
                        operation("Books", "Create book", "201", reference("Book")),
                        json_body("BookInput"),
                    )
                },
                "/bulk": {
                    "post": with_body(
                        operation("Books", "Bulk upload books", "201", reference("BulkResult")),
                        json_body("BulkUpload"),
                    )
                },
                "/{id}": {
                    "parameters": [path_id()],
                    "get": operation("Books", "Get book", "200", reference("Book")),
                    "put": with_body(
                        operation("Books", "Update book", "200", reference("Book")),
                        json_body("BookInput"),
                    ),
                    "delete": no_content("Books", "Delete book")
                },
                "/{id}/cover": {
                    "parameters": [path_id()],
                    "post": with_body(
                        operation("Books", "Upload book cover", "200", reference("Book")),
                        multipart_body("file"),
                    )
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": book_props,
                        "required": ["id", "library_id", "title", "author", "price_cents", "stock"]
                    },
                    "BookInput": {
                        "type": "object",
                        "properties": input_props,
                        "required": ["library_id", "title", "author", "price_cents"]
                    },
                    "BookRow": {
                        "type": "object",
                        "properties": book_fields,
                        "required": ["title", "author", "price_cents"]
                    },
                    "BulkUpload": {
                        "type": "object",
                        "properties": {
                            "library_id": {"type": "string"},
                            "books": array_of("BookRow")
                        },
                        "required": ["library_id", "books"]
                    },
                    "BulkResult": {
                        "type": "object",
                        "properties": {
                            "created": {"type": "integer"},
                            "ids": {"type": "array", "items": {"type": "string"}}
                        },
                        "required": ["created", "ids"]
                    }
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule)
}

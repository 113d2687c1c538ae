pub mod models;
pub mod routes;

use std::sync::Arc;

use alicia_kernel::{AppContext, Module};
use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use crate::utils::openapi::{
    array_of, json_body, multipart_body, no_content, operation, path_id, query_param, reference,
    with_body, with_parameters,
};

/// Ebook and audiobook catalog
pub struct DigitalBooksModule;

#[async_trait]
impl Module for DigitalBooksModule {
    fn name(&self) -> &'static str {
        "digital_books"
    }

    fn routes(&self, app: &AppContext) -> Router {
        routes::router(app)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let format = json!({"type": "string", "enum": ["epub", "pdf", "audiobook"]});
        Some(json!({
            "paths": {
                "/": {
                    "get": with_parameters(
                        operation("Digital books", "List digital books", "200", array_of("DigitalBook")),
                        vec![
                            query_param("format", "string"),
                            query_param("author_id", "string"),
                            query_param("free", "boolean"),
                        ],
                    ),
                    "post": with_body(
                        operation("Digital books", "Publish digital book", "201", reference("DigitalBook")),
                        json_body("DigitalBookInput"),
                    )
                },
                "/{id}": {
                    "parameters": [path_id()],
                    "get": operation("Digital books", "Get digital book", "200", reference("DigitalBook")),
                    "put": with_body(
                        operation("Digital books", "Update digital book", "200", reference("DigitalBook")),
                        json_body("DigitalBookInput"),
                    ),
                    "delete": no_content("Digital books", "Delete digital book")
                },
                "/{id}/cover": {
                    "parameters": [path_id()],
                    "post": with_body(
                        operation("Digital books", "Upload cover", "200", reference("DigitalBook")),
                        multipart_body("file"),
                    )
                },
                "/{id}/file": {
                    "parameters": [path_id()],
                    "post": with_body(
                        operation("Digital books", "Upload book file", "200", reference("DigitalBook")),
                        multipart_body("file"),
                    )
                }
            },
            "components": {
                "schemas": {
                    "DigitalBook": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string"},
                            "title": {"type": "string"},
                            "author_id": {"type": "string"},
                            "author_name": {"type": "string"},
                            "description": {"type": "string"},
                            "format": format,
                            "price_cents": {"type": "integer", "minimum": 0},
                            "cover_url": {"type": "string"},
                            "file_url": {"type": "string"},
                            "created_at": {"type": "string", "format": "date-time"},
                            "updated_at": {"type": "string", "format": "date-time"}
                        },
                        "required": ["id", "title", "author_name", "format", "price_cents"]
                    },
                    "DigitalBookInput": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "author_id": {"type": "string"},
                            "author_name": {"type": "string"},
                            "description": {"type": "string"},
                            "format": format,
                            "price_cents": {"type": "integer", "minimum": 0},
                            "cover_url": {"type": "string"}
                        },
                        "required": ["title", "author_name", "format"]
                    }
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(DigitalBooksModule)
}

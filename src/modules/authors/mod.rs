pub mod models;
pub mod routes;

use std::sync::Arc;

use alicia_kernel::{AppContext, Module};
use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use crate::utils::openapi::{
    array_of, json_body, multipart_body, no_content, operation, path_id, reference, with_body,
};

pub struct AuthorsModule;

#[async_trait]
impl Module for AuthorsModule {
    fn name(&self) -> &'static str {
        "authors"
    }

    fn routes(&self, app: &AppContext) -> Router {
        routes::router(app)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let fields = json!({
            "name": {"type": "string"},
            "bio": {"type": "string"},
            "nationality": {"type": "string"},
            "photo_url": {"type": "string"},
            "website": {"type": "string"}
        });
        let mut author_props = fields.clone();
        author_props["id"] = json!({"type": "string"});
        author_props["created_at"] = json!({"type": "string", "format": "date-time"});
        author_props["updated_at"] = json!({"type": "string", "format": "date-time"});

        Some(json!({
            "paths": {
                "/": {
                    "get": operation("Authors", "List authors", "200", array_of("Author")),
                    "post": with_body(
                        operation("Authors", "Create author profile", "201", reference("Author")),
                        json_body("AuthorInput"),
                    )
                },
                "/{id}": {
                    "parameters": [path_id()],
                    "get": operation("Authors", "Get author", "200", reference("Author")),
                    "put": with_body(
                        operation("Authors", "Update author profile", "200", reference("Author")),
                        json_body("AuthorInput"),
                    ),
                    "delete": no_content("Authors", "Delete author profile (admin)")
                },
                "/{id}/photo": {
                    "parameters": [path_id()],
                    "post": with_body(
                        operation("Authors", "Upload author photo", "200", reference("Author")),
                        multipart_body("file"),
                    )
                }
            },
            "components": {
                "schemas": {
                    "Author": {"type": "object", "properties": author_props, "required": ["id", "name"]},
                    "AuthorInput": {"type": "object", "properties": fields, "required": ["name"]}
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(AuthorsModule)
}

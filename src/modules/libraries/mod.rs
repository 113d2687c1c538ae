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

/// Bookstore tenants
pub struct LibrariesModule;

#[async_trait]
impl Module for LibrariesModule {
    fn name(&self) -> &'static str {
        "libraries"
    }

    fn routes(&self, app: &AppContext) -> Router {
        routes::router(app)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": with_parameters(
                        operation("Libraries", "List libraries", "200", array_of("Library")),
                        vec![query_param("city", "string")],
                    ),
                    "post": with_body(
                        operation("Libraries", "Create library", "201", reference("Library")),
                        json_body("LibraryInput"),
                    )
                },
                "/by-slug/{slug}": {
                    "get": with_parameters(
                        operation("Libraries", "Get library by slug", "200", reference("Library")),
                        vec![json!({"name": "slug", "in": "path", "required": true, "schema": {"type": "string"}})],
                    )
                },
                "/{id}": {
                    "parameters": [path_id()],
                    "get": operation("Libraries", "Get library", "200", reference("Library")),
                    "put": with_body(
                        operation("Libraries", "Update library", "200", reference("Library")),
                        json_body("LibraryInput"),
                    ),
                    "delete": no_content("Libraries", "Delete library (admin)")
                },
                "/{id}/image": {
                    "parameters": [path_id()],
                    "post": with_body(
                        operation("Libraries", "Upload library image", "200", reference("Library")),
                        multipart_body("file"),
                    )
                }
            },
            "components": {
                "schemas": {
                    "Library": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string"},
                            "name": {"type": "string"},
                            "slug": {"type": "string"},
                            "description": {"type": "string"},
                            "address": {"type": "string"},
                            "city": {"type": "string"},
                            "phone": {"type": "string"},
                            "email": {"type": "string"},
                            "image_url": {"type": "string"},
                            "owner_id": {"type": "string"},
                            "created_at": {"type": "string", "format": "date-time"},
                            "updated_at": {"type": "string", "format": "date-time"}
                        },
                        "required": ["id", "name", "slug", "address", "city", "owner_id"]
                    },
                    "LibraryInput": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "description": {"type": "string"},
                            "address": {"type": "string"},
                            "city": {"type": "string"},
                            "phone": {"type": "string"},
                            "email": {"type": "string"},
                            "image_url": {"type": "string"}
                        },
                        "required": ["name", "address", "city"]
                    }
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(LibrariesModule)
}

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

/// Library events calendar
pub struct EventsModule;

#[async_trait]
impl Module for EventsModule {
    fn name(&self) -> &'static str {
        "events"
    }

    fn routes(&self, app: &AppContext) -> Router {
        routes::router(app)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let fields = json!({
            "library_id": {"type": "string"},
            "title": {"type": "string"},
            "description": {"type": "string"},
            "location": {"type": "string"},
            "starts_at": {"type": "string", "format": "date-time"},
            "ends_at": {"type": "string", "format": "date-time"},
            "capacity": {"type": "integer", "minimum": 1},
            "image_url": {"type": "string"}
        });
        let mut event_props = fields.clone();
        event_props["id"] = json!({"type": "string"});

        Some(json!({
            "paths": {
                "/": {
                    "get": with_parameters(
                        operation("Events", "List events", "200", array_of("Event")),
                        vec![query_param("library_id", "string"), query_param("upcoming", "boolean")],
                    ),
                    "post": with_body(
                        operation("Events", "Create event", "201", reference("Event")),
                        json_body("EventInput"),
                    )
                },
                "/{id}": {
                    "parameters": [path_id()],
                    "get": operation("Events", "Get event", "200", reference("Event")),
                    "put": with_body(
                        operation("Events", "Update event", "200", reference("Event")),
                        json_body("EventInput"),
                    ),
                    "delete": no_content("Events", "Delete event")
                },
                "/{id}/image": {
                    "parameters": [path_id()],
                    "post": with_body(
                        operation("Events", "Upload event image", "200", reference("Event")),
                        multipart_body("file"),
                    )
                }
            },
            "components": {
                "schemas": {
                    "Event": {
                        "type": "object",
                        "properties": event_props,
                        "required": ["id", "library_id", "title", "location", "starts_at", "ends_at"]
                    },
                    "EventInput": {
                        "type": "object",
                        "properties": fields,
                        "required": ["library_id", "title", "location", "starts_at", "ends_at"]
                    }
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(EventsModule)
}

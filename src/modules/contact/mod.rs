pub mod models;
pub mod routes;

use std::sync::Arc;

use alicia_kernel::{AppContext, Module};
use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use crate::utils::openapi::{array_of, operation, reference, with_body};

/// Public contact form
pub struct ContactModule;

#[async_trait]
impl Module for ContactModule {
    fn name(&self) -> &'static str {
        "contact"
    }

    fn routes(&self, app: &AppContext) -> Router {
        routes::router(app)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let form = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "email": {"type": "string"},
                "subject": {"type": "string"},
                "message": {"type": "string"}
            },
            "required": ["name", "email", "message"]
        });
        Some(json!({
            "paths": {
                "/": {
                    "get": operation("Contact", "List contact messages (admin)", "200", array_of("ContactMessage")),
                    "post": with_body(
                        operation("Contact", "Send a contact message", "201", reference("ContactReceipt")),
                        json!({
                            "required": true,
                            "content": {
                                "application/json": {"schema": reference("ContactForm")},
                                "application/x-www-form-urlencoded": {"schema": reference("ContactForm")}
                            }
                        }),
                    )
                }
            },
            "components": {
                "schemas": {
                    "ContactForm": form,
                    "ContactMessage": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string"},
                            "name": {"type": "string"},
                            "email": {"type": "string"},
                            "subject": {"type": "string"},
                            "message": {"type": "string"},
                            "created_at": {"type": "string", "format": "date-time"}
                        },
                        "required": ["id", "name", "email", "message"]
                    },
                    "ContactReceipt": {
                        "type": "object",
                        "properties": {"id": {"type": "string"}, "received": {"type": "boolean"}},
                        "required": ["id", "received"]
                    }
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(ContactModule)
}

pub mod models;
pub mod routes;

use std::sync::Arc;

use alicia_kernel::{AppContext, InitCtx, Module};
use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use crate::utils::openapi::{
    array_of, json_body, operation, path_id, query_param, reference, with_body, with_parameters,
};

/// Accounts and roles
pub struct UsersModule;

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            admin_emails = ctx.settings.auth.admin_emails.len(),
            "users module initialized"
        );
        Ok(())
    }

    fn routes(&self, app: &AppContext) -> Router {
        routes::router(app)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": with_parameters(
                        operation("Users", "List users (admin)", "200", array_of("User")),
                        vec![query_param("role", "string")],
                    ),
                    "post": with_body(
                        operation("Users", "Sign up", "201", reference("User")),
                        json_body("SignUp"),
                    )
                },
                "/me": {
                    "get": operation("Users", "Current user", "200", reference("User"))
                },
                "/{id}": {
                    "parameters": [path_id()],
                    "get": operation("Users", "Get user profile", "200", reference("User")),
                    "patch": with_body(
                        operation("Users", "Update profile", "200", reference("User")),
                        json_body("ProfileUpdate"),
                    )
                },
                "/{id}/role": {
                    "parameters": [path_id()],
                    "put": with_body(
                        operation("Users", "Assign role (admin)", "200", reference("User")),
                        json_body("RoleAssignment"),
                    )
                }
            },
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string"},
                            "name": {"type": "string"},
                            "email": {"type": "string"},
                            "role": {"type": "string", "enum": ["reader", "library", "author", "admin"]},
                            "library_id": {"type": "string"},
                            "author_id": {"type": "string"},
                            "loyalty_points": {"type": "integer"},
                            "created_at": {"type": "string", "format": "date-time"},
                            "updated_at": {"type": "string", "format": "date-time"}
                        },
                        "required": ["id", "name", "email", "role", "loyalty_points"]
                    },
                    "SignUp": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "email": {"type": "string"},
                            "role": {"type": "string", "enum": ["reader", "library", "author"]}
                        },
                        "required": ["name", "email"]
                    },
                    "ProfileUpdate": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "email": {"type": "string"}
                        }
                    },
                    "RoleAssignment": {
                        "type": "object",
                        "properties": {
                            "role": {"type": "string", "enum": ["reader", "library", "author", "admin"]},
                            "library_id": {"type": "string"},
                            "author_id": {"type": "string"}
                        },
                        "required": ["role"]
                    }
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(UsersModule)
}

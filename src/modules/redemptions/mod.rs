pub mod models;
pub mod routes;

use std::sync::Arc;

use alicia_kernel::{AppContext, Module};
use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use crate::utils::openapi::{
    array_of, json_body, no_content, operation, path_id, query_param, reference, with_body,
    with_parameters,
};

/// Rewards catalogue and point redemptions
pub struct RedemptionsModule;

#[async_trait]
impl Module for RedemptionsModule {
    fn name(&self) -> &'static str {
        "redemptions"
    }

    fn routes(&self, app: &AppContext) -> Router {
        routes::router(app)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let item_fields = json!({
            "name": {"type": "string"},
            "description": {"type": "string"},
            "points_cost": {"type": "integer", "minimum": 1},
            "stock": {"type": "integer", "minimum": 0},
            "image_url": {"type": "string"},
            "active": {"type": "boolean"}
        });
        let mut item_props = item_fields.clone();
        item_props["id"] = json!({"type": "string"});
        let status = json!({"type": "string", "enum": ["requested", "fulfilled", "cancelled"]});

        Some(json!({
            "paths": {
                "/": {
                    "get": with_parameters(
                        operation("Redemptions", "List redemptions", "200", array_of("Redemption")),
                        vec![query_param("user_id", "string"), query_param("status", "string")],
                    ),
                    "post": with_body(
                        operation("Redemptions", "Redeem points for a reward", "201", reference("Redemption")),
                        json_body("RedeemRequest"),
                    )
                },
                "/items": {
                    "get": with_parameters(
                        operation("Redemptions", "List rewards", "200", array_of("RedemptionItem")),
                        vec![query_param("active", "boolean")],
                    ),
                    "post": with_body(
                        operation("Redemptions", "Create reward", "201", reference("RedemptionItem")),
                        json_body("RedemptionItemInput"),
                    )
                },
                "/items/{id}": {
                    "parameters": [path_id()],
                    "get": operation("Redemptions", "Get reward", "200", reference("RedemptionItem")),
                    "put": with_body(
                        operation("Redemptions", "Update reward", "200", reference("RedemptionItem")),
                        json_body("RedemptionItemInput"),
                    ),
                    "delete": no_content("Redemptions", "Delete reward")
                },
                "/{id}": {
                    "parameters": [path_id()],
                    "get": operation("Redemptions", "Get redemption", "200", reference("Redemption"))
                },
                "/{id}/status": {
                    "parameters": [path_id()],
                    "post": with_body(
                        operation("Redemptions", "Fulfil or cancel a redemption", "200", reference("Redemption")),
                        json_body("RedemptionStatusUpdate"),
                    )
                }
            },
            "components": {
                "schemas": {
                    "RedemptionItem": {
                        "type": "object",
                        "properties": item_props,
                        "required": ["id", "name", "points_cost", "stock", "active"]
                    },
                    "RedemptionItemInput": {
                        "type": "object",
                        "properties": item_fields,
                        "required": ["name", "points_cost"]
                    },
                    "RedeemRequest": {
                        "type": "object",
                        "properties": {"item_id": {"type": "string"}},
                        "required": ["item_id"]
                    },
                    "RedemptionStatusUpdate": {
                        "type": "object",
                        "properties": {"status": status.clone()},
                        "required": ["status"]
                    },
                    "Redemption": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string"},
                            "user_id": {"type": "string"},
                            "item_id": {"type": "string"},
                            "item_name": {"type": "string"},
                            "points_spent": {"type": "integer"},
                            "status": status,
                            "created_at": {"type": "string", "format": "date-time"}
                        },
                        "required": ["id", "user_id", "item_id", "points_spent", "status"]
                    }
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(RedemptionsModule)
}

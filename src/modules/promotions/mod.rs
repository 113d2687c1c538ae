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

/// Library promotions applied at checkout
pub struct PromotionsModule;

#[async_trait]
impl Module for PromotionsModule {
    fn name(&self) -> &'static str {
        "promotions"
    }

    fn routes(&self, app: &AppContext) -> Router {
        routes::router(app)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let fields = json!({
            "library_id": {"type": "string"},
            "title": {"type": "string"},
            "description": {"type": "string"},
            "discount": reference("Discount"),
            "min_subtotal_cents": {"type": "integer", "minimum": 0},
            "starts_at": {"type": "string", "format": "date-time"},
            "ends_at": {"type": "string", "format": "date-time"},
            "active": {"type": "boolean"}
        });
        let mut promotion_props = fields.clone();
        promotion_props["id"] = json!({"type": "string"});

        Some(json!({
            "paths": {
                "/": {
                    "get": with_parameters(
                        operation("Promotions", "List promotions", "200", array_of("Promotion")),
                        vec![query_param("library_id", "string"), query_param("active", "boolean")],
                    ),
                    "post": with_body(
                        operation("Promotions", "Create promotion", "201", reference("Promotion")),
                        json_body("PromotionInput"),
                    )
                },
                "/{id}": {
                    "parameters": [path_id()],
                    "get": operation("Promotions", "Get promotion", "200", reference("Promotion")),
                    "put": with_body(
                        operation("Promotions", "Update promotion", "200", reference("Promotion")),
                        json_body("PromotionInput"),
                    ),
                    "delete": no_content("Promotions", "Delete promotion")
                }
            },
            "components": {
                "schemas": {
                    "Discount": {
                        "type": "object",
                        "description": "percent_off uses `percent`, amount_off uses `amount_cents`, bonus_points uses `multiplier`",
                        "properties": {
                            "kind": {"type": "string", "enum": ["percent_off", "amount_off", "bonus_points"]},
                            "percent": {"type": "integer"},
                            "amount_cents": {"type": "integer"},
                            "multiplier": {"type": "integer"}
                        },
                        "required": ["kind"]
                    },
                    "Promotion": {
                        "type": "object",
                        "properties": promotion_props,
                        "required": ["id", "library_id", "title", "discount", "starts_at", "ends_at", "active"]
                    },
                    "PromotionInput": {
                        "type": "object",
                        "properties": fields,
                        "required": ["library_id", "title", "discount", "starts_at", "ends_at"]
                    }
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(PromotionsModule)
}

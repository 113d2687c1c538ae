pub mod models;
pub mod routes;

use std::sync::Arc;

use alicia_kernel::{AppContext, Module};
use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use crate::utils::openapi::{
    array_of, json_body, operation, path_id, query_param, reference, with_body, with_parameters,
};

/// Checkout and order fulfilment
pub struct OrdersModule;

#[async_trait]
impl Module for OrdersModule {
    fn name(&self) -> &'static str {
        "orders"
    }

    fn routes(&self, app: &AppContext) -> Router {
        routes::router(app)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let status = json!({
            "type": "string",
            "enum": ["pending", "confirmed", "shipped", "delivered", "cancelled"]
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": with_parameters(
                        operation("Orders", "List orders visible to the caller", "200", array_of("Order")),
                        vec![
                            query_param("user_id", "string"),
                            query_param("library_id", "string"),
                            query_param("status", "string"),
                        ],
                    ),
                    "post": with_body(
                        operation("Orders", "Check out a cart", "201", reference("Order")),
                        json_body("CheckoutRequest"),
                    )
                },
                "/{id}": {
                    "parameters": [path_id()],
                    "get": operation("Orders", "Get order", "200", reference("Order"))
                },
                "/{id}/status": {
                    "parameters": [path_id()],
                    "post": with_body(
                        operation("Orders", "Change order status", "200", reference("Order")),
                        json_body("OrderStatusUpdate"),
                    )
                }
            },
            "components": {
                "schemas": {
                    "CheckoutRequest": {
                        "type": "object",
                        "properties": {
                            "library_id": {"type": "string"},
                            "items": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "book_id": {"type": "string"},
                                        "quantity": {"type": "integer", "minimum": 1}
                                    },
                                    "required": ["book_id", "quantity"]
                                }
                            },
                            "promotion_id": {"type": "string"},
                            "points_to_use": {"type": "integer", "minimum": 0}
                        },
                        "required": ["items"]
                    },
                    "OrderStatusUpdate": {
                        "type": "object",
                        "properties": {"status": status.clone(), "note": {"type": "string"}},
                        "required": ["status"]
                    },
                    "Order": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string"},
                            "user_id": {"type": "string"},
                            "library_id": {"type": "string"},
                            "items": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "book_id": {"type": "string"},
                                        "title": {"type": "string"},
                                        "quantity": {"type": "integer"},
                                        "unit_price_cents": {"type": "integer"}
                                    }
                                }
                            },
                            "subtotal_cents": {"type": "integer"},
                            "promotion_id": {"type": "string"},
                            "promotion_discount_cents": {"type": "integer"},
                            "points_used": {"type": "integer"},
                            "points_discount_cents": {"type": "integer"},
                            "total_cents": {"type": "integer"},
                            "points_awarded": {"type": "integer"},
                            "points_revoked": {"type": "integer"},
                            "status": status,
                            "status_history": {"type": "array", "items": {"type": "object"}},
                            "created_at": {"type": "string", "format": "date-time"}
                        },
                        "required": ["id", "user_id", "library_id", "items", "total_cents", "status"]
                    }
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(OrdersModule)
}

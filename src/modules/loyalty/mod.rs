//! Loyalty points: pricing rules, the append-only ledger and the
//! transactions that keep balances, stock and statuses consistent.

pub mod error;
pub mod ledger;
pub mod models;
pub mod pricing;
pub mod routes;

use std::sync::Arc;

use alicia_kernel::{AppContext, InitCtx, Module};
use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use crate::utils::openapi::{
    json_body, operation, path_id, query_param, reference, with_body, with_parameters,
};

pub use error::LedgerError;

pub struct LoyaltyModule;

#[async_trait]
impl Module for LoyaltyModule {
    fn name(&self) -> &'static str {
        "loyalty"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let rules = &ctx.app.settings.loyalty;
        if rules.point_value_cents <= 0 {
            tracing::warn!("loyalty.point_value_cents is not positive; points cannot be spent at checkout");
        }
        tracing::info!(
            points_per_currency_unit = rules.points_per_currency_unit,
            point_value_cents = rules.point_value_cents,
            max_points_discount_percent = rules.max_points_discount_percent,
            "loyalty rules loaded"
        );
        Ok(())
    }

    fn routes(&self, app: &AppContext) -> Router {
        routes::router(app)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/rules": {
                    "get": operation("Loyalty", "Point conversion rules", "200", reference("LoyaltyRules"))
                },
                "/quote": {
                    "post": with_body(
                        operation("Loyalty", "Price a cart without ordering", "200", reference("Quote")),
                        json_body("CheckoutRequest"),
                    )
                },
                "/users/{id}": {
                    "parameters": [path_id()],
                    "get": with_parameters(
                        operation("Loyalty", "Balance and ledger history", "200", reference("PointsSummary")),
                        vec![query_param("limit", "integer")],
                    )
                },
                "/users/{id}/adjust": {
                    "parameters": [path_id()],
                    "post": with_body(
                        operation("Loyalty", "Adjust a balance (admin)", "200", reference("PointsSummary")),
                        json_body("AdjustRequest"),
                    )
                }
            },
            "components": {
                "schemas": {
                    "LoyaltyRules": {
                        "type": "object",
                        "properties": {
                            "points_per_currency_unit": {"type": "integer"},
                            "point_value_cents": {"type": "integer"},
                            "max_points_discount_percent": {"type": "integer"}
                        }
                    },
                    "Quote": {
                        "type": "object",
                        "properties": {
                            "library_id": {"type": "string"},
                            "items": {"type": "array", "items": {"type": "object"}},
                            "promotion_id": {"type": "string"},
                            "balance": {"type": "integer"},
                            "subtotal_cents": {"type": "integer"},
                            "promotion_discount_cents": {"type": "integer"},
                            "max_points_usable": {"type": "integer"},
                            "points_used": {"type": "integer"},
                            "points_discount_cents": {"type": "integer"},
                            "total_cents": {"type": "integer"},
                            "points_multiplier": {"type": "integer"},
                            "points_awarded": {"type": "integer"}
                        }
                    },
                    "AdjustRequest": {
                        "type": "object",
                        "properties": {"delta": {"type": "integer"}, "note": {"type": "string"}},
                        "required": ["delta", "note"]
                    },
                    "LedgerEntry": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string"},
                            "user_id": {"type": "string"},
                            "delta": {"type": "integer"},
                            "reason": {
                                "type": "string",
                                "enum": [
                                    "checkout_redemption", "purchase_award", "order_cancel_refund",
                                    "order_cancel_revoke", "redemption", "redemption_refund", "adjustment"
                                ]
                            },
                            "reference_id": {"type": "string"},
                            "balance_after": {"type": "integer"},
                            "note": {"type": "string"},
                            "created_at": {"type": "string", "format": "date-time"}
                        }
                    },
                    "PointsSummary": {
                        "type": "object",
                        "properties": {
                            "user_id": {"type": "string"},
                            "balance": {"type": "integer"},
                            "entries": {"type": "array", "items": reference("LedgerEntry")}
                        }
                    }
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(LoyaltyModule)
}

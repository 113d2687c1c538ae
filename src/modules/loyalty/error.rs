use alicia_authz::AuthzError;
use alicia_db::StoreError;
use alicia_http::AppError;
use serde_json::json;
use thiserror::Error;

use crate::utils::validation::POINTS_MAX;

/// Failures of the points ledger and the transactions built on it.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("the cart is empty")]
    EmptyCart,

    #[error("quantity of book {book_id} must be between 1 and {max}")]
    InvalidQuantity { book_id: String, max: i64 },

    #[error("points to use must not be negative")]
    NegativePoints,

    #[error("all books in an order must come from the same library")]
    MixedLibraries,

    #[error("not enough stock of '{title}': {available} available, {requested} requested")]
    OutOfStock {
        item_id: String,
        title: String,
        available: i64,
        requested: i64,
    },

    #[error("insufficient points: balance is {balance}, {required} required")]
    InsufficientPoints { balance: i64, required: i64 },

    #[error("at most {cap} points can be used on this order, {requested} requested")]
    PointsCapExceeded { cap: i64, requested: i64 },

    #[error("promotion cannot be applied: {0}")]
    PromotionNotApplicable(String),

    #[error("'{0}' is not available for redemption")]
    ItemUnavailable(String),

    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("adjustment must carry a note and a non-zero delta of at most {} points", POINTS_MAX)]
    InvalidAdjustment,

    #[error("adjustment of {delta} would leave a negative balance (current {balance})")]
    NegativeBalance { balance: i64, delta: i64 },

    #[error("amounts derived from {field} are out of range")]
    AmountTooLarge { field: &'static str },
}

fn detail(field: &str, error: impl ToString) -> Vec<serde_json::Value> {
    vec![json!({"field": field, "error": error.to_string()})]
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::Store(e) => e.into(),
            LedgerError::Authz(e) => e.into(),
            LedgerError::EmptyCart => AppError::validation(detail("items", "must not be empty"), message),
            LedgerError::InvalidQuantity { .. } => {
                AppError::validation(detail("items", &message), message)
            }
            LedgerError::NegativePoints => {
                AppError::validation(detail("points_to_use", "must not be negative"), message)
            }
            LedgerError::MixedLibraries => AppError::validation(detail("items", &message), message),
            LedgerError::PointsCapExceeded { cap, .. } => AppError::validation(
                detail("points_to_use", format!("must not exceed {cap}")),
                message,
            ),
            LedgerError::PromotionNotApplicable(ref reason) => {
                AppError::validation(detail("promotion_id", reason), message)
            }
            LedgerError::InvalidAdjustment => AppError::validation(
                detail("delta", format!("must be non-zero, at most {POINTS_MAX} in size, with a note")),
                message,
            ),
            LedgerError::NegativeBalance { .. } => {
                AppError::validation(detail("delta", "would leave a negative balance"), message)
            }
            LedgerError::AmountTooLarge { field } => {
                AppError::validation(detail(field, "exceeds the supported range"), message)
            }
            LedgerError::OutOfStock { .. } => AppError::conflict_with_code("out_of_stock", message),
            LedgerError::InsufficientPoints { .. } => {
                AppError::conflict_with_code("insufficient_points", message)
            }
            LedgerError::ItemUnavailable(_) => {
                AppError::conflict_with_code("item_unavailable", message)
            }
            LedgerError::InvalidTransition { .. } => {
                AppError::conflict_with_code("invalid_transition", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (LedgerError::EmptyCart, StatusCode::UNPROCESSABLE_ENTITY),
            (
                LedgerError::InsufficientPoints { balance: 3, required: 10 },
                StatusCode::CONFLICT,
            ),
            (
                LedgerError::PointsCapExceeded { cap: 40, requested: 50 },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                LedgerError::InvalidTransition {
                    from: "delivered".into(),
                    to: "cancelled".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                LedgerError::AmountTooLarge { field: "items" },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                LedgerError::Store(StoreError::not_found("books", "b1")),
                StatusCode::NOT_FOUND,
            ),
            (
                LedgerError::Authz(AuthzError::Forbidden("cancel order".into())),
                StatusCode::FORBIDDEN,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }
}

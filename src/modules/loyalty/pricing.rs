//! Order pricing: promotion, points discount and points earned.
//!
//! Everything is integer cents and whole points; divisions floor.

use alicia_kernel::settings::LoyaltySettings;
use serde::Serialize;

use super::error::LedgerError;
use crate::modules::orders::models::OrderItem;
use crate::modules::promotions::models::Discount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub subtotal_cents: i64,
    pub promotion_discount_cents: i64,
    /// Most points the order accepts after the promotion.
    pub max_points_usable: i64,
    pub points_used: i64,
    pub points_discount_cents: i64,
    pub total_cents: i64,
    pub points_multiplier: i64,
    pub points_awarded: i64,
}

fn too_large(field: &'static str) -> LedgerError {
    LedgerError::AmountTooLarge { field }
}

pub fn subtotal(items: &[OrderItem]) -> Result<i64, LedgerError> {
    items
        .iter()
        .try_fold(0_i64, |sum, item| {
            item.unit_price_cents
                .checked_mul(item.quantity)
                .and_then(|line| sum.checked_add(line))
        })
        .ok_or_else(|| too_large("items"))
}

/// Cents taken off by a promotion and the multiplier it applies to earned points.
pub fn promotion_effect(
    discount: Option<&Discount>,
    subtotal_cents: i64,
) -> Result<(i64, i64), LedgerError> {
    Ok(match discount {
        Some(Discount::PercentOff { percent }) => (
            subtotal_cents
                .checked_mul(*percent)
                .ok_or_else(|| too_large("items"))?
                / 100,
            1,
        ),
        Some(Discount::AmountOff { amount_cents }) => ((*amount_cents).min(subtotal_cents), 1),
        Some(Discount::BonusPoints { multiplier }) => (0, *multiplier),
        None => (0, 1),
    })
}

pub fn points_cap(after_promo_cents: i64, rules: &LoyaltySettings) -> Result<i64, LedgerError> {
    if rules.point_value_cents <= 0 {
        return Ok(0);
    }
    after_promo_cents
        .checked_mul(rules.max_points_discount_percent)
        .map(|share| share / 100 / rules.point_value_cents)
        .ok_or_else(|| too_large("items"))
}

pub fn points_earned(
    total_cents: i64,
    multiplier: i64,
    rules: &LoyaltySettings,
) -> Result<i64, LedgerError> {
    (total_cents / 100)
        .checked_mul(rules.points_per_currency_unit)
        .and_then(|points| points.checked_mul(multiplier))
        .ok_or_else(|| too_large("items"))
}

/// Price an order for a buyer holding `balance` points.
pub fn price_order(
    items: &[OrderItem],
    discount: Option<&Discount>,
    points_to_use: i64,
    balance: i64,
    rules: &LoyaltySettings,
) -> Result<PriceBreakdown, LedgerError> {
    if points_to_use < 0 {
        return Err(LedgerError::NegativePoints);
    }

    let subtotal_cents = subtotal(items)?;
    let (promotion_discount_cents, points_multiplier) = promotion_effect(discount, subtotal_cents)?;
    let after_promo = subtotal_cents - promotion_discount_cents;

    let max_points_usable = points_cap(after_promo, rules)?;
    if points_to_use > balance {
        return Err(LedgerError::InsufficientPoints {
            balance,
            required: points_to_use,
        });
    }
    if points_to_use > max_points_usable {
        return Err(LedgerError::PointsCapExceeded {
            cap: max_points_usable,
            requested: points_to_use,
        });
    }

    let points_discount_cents = points_to_use
        .checked_mul(rules.point_value_cents)
        .ok_or_else(|| too_large("points_to_use"))?;
    let total_cents = after_promo - points_discount_cents;

    Ok(PriceBreakdown {
        subtotal_cents,
        promotion_discount_cents,
        max_points_usable,
        points_used: points_to_use,
        points_discount_cents,
        total_cents,
        points_multiplier,
        points_awarded: points_earned(total_cents, points_multiplier, rules)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::orders::models::MAX_QUANTITY;
    use crate::utils::validation::MONEY_MAX;

    fn item(price: i64, quantity: i64) -> OrderItem {
        OrderItem {
            book_id: format!("b-{price}"),
            title: "Rayuela".into(),
            quantity,
            unit_price_cents: price,
        }
    }

    fn rules() -> LoyaltySettings {
        LoyaltySettings {
            points_per_currency_unit: 1,
            point_value_cents: 5,
            max_points_discount_percent: 50,
        }
    }

    #[test]
    fn test_percent_promotion_with_points() {
        let items = [item(1_500, 2), item(2_000, 1)];
        let discount = Discount::PercentOff { percent: 10 };

        let price = price_order(&items, Some(&discount), 100, 300, &rules()).unwrap();

        assert_eq!(price.subtotal_cents, 5_000);
        assert_eq!(price.promotion_discount_cents, 500);
        assert_eq!(price.max_points_usable, 450);
        assert_eq!(price.points_discount_cents, 500);
        assert_eq!(price.total_cents, 4_000);
        assert_eq!(price.points_awarded, 40);
    }

    #[test]
    fn test_amount_off_never_exceeds_subtotal() {
        let items = [item(800, 1)];
        let discount = Discount::AmountOff { amount_cents: 1_000 };

        let price = price_order(&items, Some(&discount), 0, 0, &rules()).unwrap();

        assert_eq!(price.promotion_discount_cents, 800);
        assert_eq!(price.total_cents, 0);
        assert_eq!(price.max_points_usable, 0);
        assert_eq!(price.points_awarded, 0);
    }

    #[test]
    fn test_bonus_points_multiply_award() {
        let items = [item(2_599, 1)];
        let discount = Discount::BonusPoints { multiplier: 3 };

        let price = price_order(&items, Some(&discount), 0, 0, &rules()).unwrap();

        assert_eq!(price.total_cents, 2_599);
        assert_eq!(price.points_awarded, 75);
    }

    #[test]
    fn test_points_limits() {
        let items = [item(1_000, 1)];

        let err = price_order(&items, None, 50, 20, &rules()).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientPoints { balance: 20, required: 50 }));

        // half of 1000 cents at 5 cents a point
        let err = price_order(&items, None, 101, 500, &rules()).unwrap_err();
        assert!(matches!(err, LedgerError::PointsCapExceeded { cap: 100, requested: 101 }));

        let price = price_order(&items, None, 100, 500, &rules()).unwrap();
        assert_eq!(price.total_cents, 500);
        assert_eq!(price.points_awarded, 5);

        assert!(matches!(
            price_order(&items, None, -1, 500, &rules()),
            Err(LedgerError::NegativePoints)
        ));
    }

    #[test]
    fn test_zero_point_value_disables_redemption() {
        let rules = LoyaltySettings {
            point_value_cents: 0,
            ..rules()
        };
        assert_eq!(points_cap(10_000, &rules).unwrap(), 0);
    }

    #[test]
    fn test_order_at_price_ceiling() {
        let items = [item(MONEY_MAX, MAX_QUANTITY), item(MONEY_MAX, MAX_QUANTITY)];
        let discount = Discount::PercentOff { percent: 100 };

        let price = price_order(&items, None, 0, 0, &rules()).unwrap();
        assert_eq!(price.subtotal_cents, 2 * MONEY_MAX * MAX_QUANTITY);
        assert_eq!(price.points_awarded, 2 * MONEY_MAX * MAX_QUANTITY / 100);

        let price = price_order(&items, Some(&discount), 0, 0, &rules()).unwrap();
        assert_eq!(price.total_cents, 0);
    }

    #[test]
    fn test_overflowing_order_is_rejected() {
        let items = [item(100_000_000_000_000_000, 100)];
        assert!(matches!(
            price_order(&items, None, 0, 0, &rules()),
            Err(LedgerError::AmountTooLarge { field: "items" })
        ));

        let generous = LoyaltySettings {
            points_per_currency_unit: i64::MAX,
            ..rules()
        };
        assert!(matches!(
            price_order(&[item(1_000, 1)], None, 0, 0, &generous),
            Err(LedgerError::AmountTooLarge { .. })
        ));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::validation::{Validator, MONEY_MAX, TEXT_MAX, TITLE_MAX};

pub const PROMOTIONS: &str = "promotions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discount {
    PercentOff { percent: i64 },
    AmountOff { amount_cents: i64 },
    /// Awarded points are multiplied; the price is unchanged.
    BonusPoints { multiplier: i64 },
}

impl Discount {
    pub fn validate_into(&self, v: &mut Validator) {
        match *self {
            Discount::PercentOff { percent } => {
                v.check((1..=100).contains(&percent), "discount.percent", "must be between 1 and 100");
            }
            Discount::AmountOff { amount_cents } => {
                v.positive("discount.amount_cents", amount_cents)
                    .at_most("discount.amount_cents", amount_cents, MONEY_MAX);
            }
            Discount::BonusPoints { multiplier } => {
                v.check((2..=10).contains(&multiplier), "discount.multiplier", "must be between 2 and 10");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub library_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub discount: Discount,
    #[serde(default)]
    pub min_subtotal_cents: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Promotion {
    /// Whether the promotion is live at `now`.
    pub fn is_running(&self, now: DateTime<Utc>) -> bool {
        self.active && self.starts_at <= now && now <= self.ends_at
    }

    /// Why the promotion cannot apply to an order, if it cannot.
    pub fn rejection(&self, library_id: &str, subtotal_cents: i64, now: DateTime<Utc>) -> Option<String> {
        if self.library_id != library_id {
            Some("promotion belongs to another library".into())
        } else if !self.is_running(now) {
            Some("promotion is not running".into())
        } else if subtotal_cents < self.min_subtotal_cents {
            Some(format!(
                "order subtotal must be at least {} cents",
                self.min_subtotal_cents
            ))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromotionInput {
    pub library_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub discount: Discount,
    #[serde(default)]
    pub min_subtotal_cents: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl PromotionInput {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("title", &self.title, TITLE_MAX)
            .optional("description", Some(&self.description), TEXT_MAX)
            .non_negative("min_subtotal_cents", self.min_subtotal_cents)
            .at_most("min_subtotal_cents", self.min_subtotal_cents, MONEY_MAX)
            .window("ends_at", self.starts_at, self.ends_at);
        self.discount.validate_into(&mut v);
        v
    }

    pub fn into_promotion(self) -> Promotion {
        Promotion {
            library_id: self.library_id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            discount: self.discount,
            min_subtotal_cents: self.min_subtotal_cents,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            active: self.active,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromotionListParams {
    pub library_id: Option<String>,
    /// Only promotions running right now.
    pub active: Option<bool>,
}

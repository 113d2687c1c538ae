use serde::{Deserialize, Serialize};

use crate::utils::non_empty;
use crate::utils::validation::{
    Validator, NAME_MAX, POINTS_MAX, STOCK_MAX, TEXT_MAX, URL_MAX,
};

pub const REDEMPTION_ITEMS: &str = "redemption_items";
pub const REDEMPTIONS: &str = "redemptions";

/// A reward readers can exchange points for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub points_cost: i64,
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedemptionItemInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub points_cost: i64,
    #[serde(default)]
    pub stock: i64,
    pub image_url: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl RedemptionItemInput {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("name", &self.name, NAME_MAX)
            .optional("description", Some(&self.description), TEXT_MAX)
            .optional("image_url", self.image_url.as_deref(), URL_MAX)
            .positive("points_cost", self.points_cost)
            .at_most("points_cost", self.points_cost, POINTS_MAX)
            .non_negative("stock", self.stock)
            .at_most("stock", self.stock, STOCK_MAX);
        v
    }

    pub fn into_item(self) -> RedemptionItem {
        RedemptionItem {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            points_cost: self.points_cost,
            stock: self.stock,
            image_url: non_empty(self.image_url),
            active: self.active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedemptionStatus {
    Requested,
    Fulfilled,
    Cancelled,
}

impl RedemptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedemptionStatus::Requested => "requested",
            RedemptionStatus::Fulfilled => "fulfilled",
            RedemptionStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: RedemptionStatus) -> bool {
        *self == RedemptionStatus::Requested && next != RedemptionStatus::Requested
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub user_id: String,
    pub item_id: String,
    pub item_name: String,
    pub points_spent: i64,
    pub status: RedemptionStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedeemRequest {
    pub item_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedemptionStatusUpdate {
    pub status: RedemptionStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemListParams {
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedemptionListParams {
    pub user_id: Option<String>,
    pub status: Option<RedemptionStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use RedemptionStatus::*;

    #[test]
    fn test_only_requested_moves() {
        assert!(Requested.can_transition_to(Fulfilled));
        assert!(Requested.can_transition_to(Cancelled));
        assert!(!Requested.can_transition_to(Requested));
        assert!(!Fulfilled.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Fulfilled));
    }

    #[test]
    fn test_item_validation() {
        let input = RedemptionItemInput {
            name: "Bolsa de tela".into(),
            description: String::new(),
            points_cost: 0,
            stock: -2,
            image_url: None,
            active: true,
        };
        assert!(!input.validate().is_valid());
    }
}

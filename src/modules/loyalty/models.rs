use alicia_db::Entity;
use serde::{Deserialize, Serialize};

pub const POINTS_LEDGER: &str = "points_ledger";

/// Why a balance moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
    /// Points spent as a discount at checkout.
    CheckoutRedemption,
    /// Points earned by paying for an order.
    PurchaseAward,
    OrderCancelRefund,
    OrderCancelRevoke,
    /// Points exchanged for a reward item.
    Redemption,
    RedemptionRefund,
    Adjustment,
}

/// One movement of a user's balance. Entries are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub user_id: String,
    pub delta: i64,
    pub reason: LedgerReason,
    /// Order or redemption the movement belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub balance_after: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustRequest {
    pub delta: i64,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointsSummary {
    pub user_id: String,
    pub balance: i64,
    pub entries: Vec<Entity<LedgerEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

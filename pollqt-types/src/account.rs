//! Account payloads relayed from the brokerage API.
//!
//! Field names follow the upstream camelCase JSON. Monetary and quantity values are
//! kept as [`Decimal`] so that structural equality is exact; nothing here computes
//! on them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identity and classification of a brokerage account. Keyed by `number`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountRef {
    /// Account type, e.g. "Margin" or "TFSA".
    #[serde(rename = "type")]
    pub kind: String,
    /// Account number; the identity key.
    pub number: String,
    /// Account status, e.g. "Active".
    pub status: String,
    /// Whether this is the primary account of the holder.
    pub is_primary: bool,
    /// Whether this account is used for billing.
    pub is_billing: bool,
    /// Client account type, e.g. "Individual".
    pub client_account_type: String,
}

/// Balance record for one currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Balance {
    pub currency: String,
    pub cash: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub total_equity: Option<Decimal>,
    pub buying_power: Option<Decimal>,
    pub maintenance_excess: Option<Decimal>,
    pub is_real_time: bool,
}

/// One open or recently closed position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Position {
    pub symbol: String,
    pub symbol_id: u64,
    pub open_quantity: Option<Decimal>,
    pub closed_quantity: Option<Decimal>,
    pub current_market_value: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub average_entry_price: Option<Decimal>,
    pub day_pnl: Option<Decimal>,
    #[serde(alias = "closedPnL")]
    pub closed_pnl: Option<Decimal>,
    #[serde(alias = "openPnL")]
    pub open_pnl: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub is_real_time: bool,
    pub is_under_reorg: bool,
}

/// One account activity (trade, dividend, deposit, ...). Dates are relayed verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: String,
    pub trade_date: String,
    pub transaction_date: String,
    pub settlement_date: String,
    pub action: String,
    pub symbol: String,
    pub symbol_id: u64,
    pub description: String,
    pub currency: String,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub gross_amount: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub net_amount: Option<Decimal>,
}

/// Normalized point-in-time state of one account, produced once per poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Cycle timestamp shared by every snapshot of the same batch.
    pub timestamp: DateTime<Utc>,
    pub account: AccountRef,
    pub balance: Balance,
    pub positions: Vec<Position>,
    pub activities: Vec<Activity>,
}

impl Snapshot {
    /// True when balance and positions match `other`. Timestamp and activities are ignored;
    /// position order matters.
    #[must_use]
    pub fn same_holdings(&self, other: &Self) -> bool {
        self.balance == other.balance && self.positions == other.positions
    }
}

/// `GET v1/accounts`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountsResponse {
    pub accounts: Vec<AccountRef>,
    pub user_id: Option<u64>,
}

/// `GET v1/accounts/{number}/balances`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BalancesResponse {
    pub per_currency_balances: Vec<Balance>,
    pub combined_balances: Vec<Balance>,
    pub sod_per_currency_balances: Vec<Balance>,
    pub sod_combined_balances: Vec<Balance>,
}

/// `GET v1/accounts/{number}/positions`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionsResponse {
    pub positions: Vec<Position>,
}

/// `GET v1/accounts/{number}/activities`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivitiesResponse {
    pub activities: Vec<Activity>,
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-affiliate rollup over live sales. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliateSummary {
    pub code: String,
    pub name: String,
    /// Approved sales attributed to the affiliate.
    pub sales: u64,
    pub revenue: Decimal,
    pub refunds: Decimal,
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// KPIs derived from the approved sales set.
///
/// The `*_change` fields are period-over-period percentages. They are `None`
/// when the prior comparison window has nothing to compare against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub total_revenue: Decimal,
    pub total_sales: u64,
    pub total_affiliates: u64,
    pub average_ticket: Decimal,
    pub revenue_change: Option<Decimal>,
    pub sales_change: Option<Decimal>,
    pub affiliates_change: Option<Decimal>,
    pub ticket_change: Option<Decimal>,
}

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::models::{AffiliateSummary, Sale, SaleStatus};

/// Group sales by affiliate code and roll up approved revenue and refunds.
///
/// Sales without an affiliate code are direct sales and are skipped. The
/// display name is the most recent non-empty `affiliate_name`, falling back
/// to the code. Output is ordered by revenue, highest first.
pub fn summarize_affiliates(sales: &[Sale]) -> Vec<AffiliateSummary> {
    let mut by_code: HashMap<&str, (AffiliateSummary, Option<chrono::DateTime<chrono::Utc>>)> =
        HashMap::new();

    for sale in sales {
        let Some(code) = sale.affiliate() else {
            continue;
        };

        let (entry, named_at) = by_code.entry(code).or_insert_with(|| {
            (
                AffiliateSummary {
                    code: code.to_string(),
                    name: code.to_string(),
                    sales: 0,
                    revenue: Decimal::ZERO,
                    refunds: Decimal::ZERO,
                },
                None,
            )
        });

        if let Some(name) = sale.affiliate_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            if named_at.map_or(true, |at| sale.created_at >= at) {
                entry.name = name.to_string();
                *named_at = Some(sale.created_at);
            }
        }

        match sale.status {
            SaleStatus::Approved => {
                entry.sales += 1;
                entry.revenue += sale.revenue_amount();
            }
            SaleStatus::Refunded => {
                entry.refunds += sale.revenue_amount();
            }
            SaleStatus::Cancelled | SaleStatus::Unknown => {}
        }
    }

    let mut out: Vec<AffiliateSummary> = by_code.into_values().map(|(summary, _)| summary).collect();
    out.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
    out
}

/// Case-insensitive match on affiliate name or code. Empty text keeps all.
pub fn search_affiliates(summaries: Vec<AffiliateSummary>, text: &str) -> Vec<AffiliateSummary> {
    if text.is_empty() {
        return summaries;
    }
    let needle = text.to_lowercase();
    summaries
        .into_iter()
        .filter(|a| {
            a.name.to_lowercase().contains(&needle) || a.code.to_lowercase().contains(&needle)
        })
        .collect()
}

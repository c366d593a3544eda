use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::models::{DashboardMetrics, Sale};

/// Single-pass totals over a batch of sales.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Totals {
    pub revenue: Decimal,
    pub sales: u64,
    pub affiliates: u64,
}

impl Totals {
    /// Mean ticket; zero for an empty batch.
    pub fn average_ticket(&self) -> Decimal {
        if self.sales == 0 {
            Decimal::ZERO
        } else {
            self.revenue / Decimal::from(self.sales)
        }
    }
}

pub fn totals<'a, I>(sales: I) -> Totals
where
    I: IntoIterator<Item = &'a Sale>,
{
    let mut revenue = Decimal::ZERO;
    let mut count: u64 = 0;
    let mut affiliates: HashSet<&str> = HashSet::new();

    for sale in sales {
        revenue += sale.revenue_amount();
        count += 1;
        if let Some(code) = sale.affiliate() {
            affiliates.insert(code);
        }
    }

    Totals {
        revenue,
        sales: count,
        affiliates: affiliates.len() as u64,
    }
}

/// Reduce an approved-sales batch into dashboard KPIs.
///
/// Change percentages compare `[now - window, now)` against
/// `[now - 2*window, now - window)` by `created_at`.
pub fn compute_metrics(approved: &[Sale], now: DateTime<Utc>, window: Duration) -> DashboardMetrics {
    let all = totals(approved);

    // Windows reaching past the representable range start at the earliest instant
    let current_start = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let prior_start = current_start
        .checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let current = totals(
        approved
            .iter()
            .filter(|s| s.created_at >= current_start && s.created_at < now),
    );
    let prior = totals(
        approved
            .iter()
            .filter(|s| s.created_at >= prior_start && s.created_at < current_start),
    );

    DashboardMetrics {
        average_ticket: all.average_ticket(),
        total_revenue: all.revenue,
        total_sales: all.sales,
        total_affiliates: all.affiliates,
        revenue_change: percent_change(current.revenue, prior.revenue),
        sales_change: percent_change(Decimal::from(current.sales), Decimal::from(prior.sales)),
        affiliates_change: percent_change(
            Decimal::from(current.affiliates),
            Decimal::from(prior.affiliates),
        ),
        ticket_change: percent_change(current.average_ticket(), prior.average_ticket()),
    }
}

/// `(current - prior) / prior * 100`, rounded to two places.
/// `None` when there is no prior value to compare against.
pub fn percent_change(current: Decimal, prior: Decimal) -> Option<Decimal> {
    if prior.is_zero() {
        return None;
    }
    Some(((current - prior) / prior * Decimal::ONE_HUNDRED).round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SaleStatus;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap()
    }

    fn sale(price: i64, usd: Option<i64>, affiliate: Option<&str>, days_ago: i64) -> Sale {
        Sale {
            id: format!("s{price}-{days_ago}"),
            cartpanda_id: String::new(),
            customer_email: String::new(),
            customer_name: String::new(),
            product_name: String::new(),
            product_id: String::new(),
            price: Decimal::from(price),
            currency: "BRL".into(),
            amount_brl: None,
            amount_usd: usd.map(Decimal::from),
            fx_rate_brl_usd: None,
            fx_at: None,
            fx_source: None,
            payment_currency: None,
            status: SaleStatus::Approved,
            affiliate_code: affiliate.map(str::to_string),
            affiliate_name: None,
            commission_value: None,
            commission_usd: None,
            payment_method: "pix".into(),
            transaction_id: String::new(),
            webhook_received_at: None,
            metadata: None,
            created_at: now() - Duration::days(days_ago),
            updated_at: None,
        }
    }

    #[test]
    fn revenue_falls_back_per_record() {
        let batch = vec![
            sale(100, None, None, 1),
            sale(200, None, None, 2),
            sale(45, Some(50), None, 3),
        ];
        let m = compute_metrics(&batch, now(), Duration::days(30));

        assert_eq!(m.total_revenue, Decimal::from(350));
        assert_eq!(m.total_sales, 3);
        assert_eq!(m.average_ticket.round_dp(2), Decimal::new(11667, 2));
    }

    #[test]
    fn empty_batch_has_zero_ticket() {
        let m = compute_metrics(&[], now(), Duration::days(30));
        assert_eq!(m.total_sales, 0);
        assert_eq!(m.average_ticket, Decimal::ZERO);
        assert_eq!(m.revenue_change, None);
    }

    #[test]
    fn distinct_affiliates_skip_blank_codes() {
        let batch = vec![
            sale(10, None, Some("A"), 1),
            sale(10, None, Some("A"), 1),
            sale(10, None, Some(""), 1),
            sale(10, None, None, 1),
            sale(10, None, Some("B"), 1),
        ];
        assert_eq!(totals(&batch).affiliates, 2);
    }

    #[test]
    fn changes_compare_adjacent_windows() {
        let batch = vec![
            // current window: 2 sales, 300 revenue
            sale(100, None, Some("A"), 5),
            sale(200, None, Some("B"), 10),
            // prior window: 1 sale, 200 revenue
            sale(200, None, Some("A"), 40),
            // outside both windows
            sale(999, None, None, 90),
        ];
        let m = compute_metrics(&batch, now(), Duration::days(30));

        assert_eq!(m.revenue_change, Some(Decimal::from(50)));
        assert_eq!(m.sales_change, Some(Decimal::from(100)));
        assert_eq!(m.affiliates_change, Some(Decimal::from(100)));
        assert_eq!(m.ticket_change, Some(Decimal::from(-25)));
        assert_eq!(m.total_sales, 4);
    }

    #[test]
    fn oversized_window_does_not_overflow() {
        let batch = vec![sale(100, None, None, 1), sale(200, None, None, 400)];
        let m = compute_metrics(&batch, now(), Duration::days(100_000_000));

        assert_eq!(m.total_revenue, Decimal::from(300));
        assert_eq!(m.sales_change, None);
    }

    #[test]
    fn change_unavailable_without_prior_data() {
        let batch = vec![sale(100, None, None, 1)];
        let m = compute_metrics(&batch, now(), Duration::days(30));
        assert_eq!(m.sales_change, None);
        assert_eq!(m.ticket_change, None);
    }
}

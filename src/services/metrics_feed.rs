use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;

use crate::analytics::compute_metrics;
use crate::models::{DashboardMetrics, Sale, SaleStatus};
use crate::supabase::{select_as, DataError, DataSource, SelectQuery};

use super::live_query::{Fetch, FeedHandle, LiveQuery};
use super::sales_feed::SALES_TABLE;

pub type MetricsFeed = LiveQuery<DashboardMetrics>;
pub type MetricsHandle = FeedHandle<DashboardMetrics>;

/// Approved sales reduced to dashboard KPIs.
pub struct MetricsFetch {
    pub comparison_window: Duration,
}

#[async_trait]
impl Fetch for MetricsFetch {
    type Output = DashboardMetrics;

    fn table(&self) -> &str {
        SALES_TABLE
    }

    async fn fetch(&self, source: &dyn DataSource) -> Result<DashboardMetrics, DataError> {
        let query = SelectQuery::table(SALES_TABLE).eq("status", SaleStatus::Approved.as_str());
        let approved: Vec<Sale> = select_as(source, &query).await?;

        let metrics = compute_metrics(&approved, Utc::now(), self.comparison_window);

        metrics::gauge!("approved_revenue").set(metrics.total_revenue.to_f64().unwrap_or(0.0));
        tracing::info!(
            total_sales = metrics.total_sales,
            total_revenue = %metrics.total_revenue,
            affiliates = metrics.total_affiliates,
            "Dashboard metrics computed"
        );
        Ok(metrics)
    }
}

pub fn spawn_metrics_feed(
    source: Arc<dyn DataSource>,
    comparison_window_days: i64,
) -> Result<MetricsFeed, DataError> {
    let comparison_window = Duration::try_days(comparison_window_days).ok_or_else(|| {
        DataError::InvalidRequest(format!(
            "comparison window of {comparison_window_days} days is out of range"
        ))
    })?;
    let fetcher = MetricsFetch { comparison_window };
    LiveQuery::spawn("metrics", source, fetcher)
}

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::ApiResponse;
use crate::format::{format_brl, format_count, format_percentage};
use crate::models::DashboardMetrics;
use crate::AppState;

/// Card strings as the dashboard shows them.
#[derive(Serialize)]
pub struct MetricsDisplay {
    pub total_revenue: String,
    pub total_sales: String,
    pub average_ticket: String,
    pub total_affiliates: String,
    pub revenue_change: String,
    pub sales_change: String,
    pub ticket_change: String,
    pub affiliates_change: String,
}

impl From<&DashboardMetrics> for MetricsDisplay {
    fn from(m: &DashboardMetrics) -> Self {
        Self {
            total_revenue: format_brl(m.total_revenue),
            total_sales: format_count(m.total_sales),
            average_ticket: format_brl(m.average_ticket),
            total_affiliates: format_count(m.total_affiliates),
            revenue_change: format_percentage(m.revenue_change),
            sales_change: format_percentage(m.sales_change),
            ticket_change: format_percentage(m.ticket_change),
            affiliates_change: format_percentage(m.affiliates_change),
        }
    }
}

#[derive(Serialize)]
pub struct MetricsView {
    pub metrics: DashboardMetrics,
    pub display: MetricsDisplay,
    pub loading: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

pub async fn metrics(State(state): State<AppState>) -> Json<ApiResponse<MetricsView>> {
    let feed = state.metrics.snapshot();
    let metrics = feed.data.as_ref().clone();

    let view = MetricsView {
        display: MetricsDisplay::from(&metrics),
        metrics,
        loading: feed.is_loading(),
        updated_at: feed.updated_at,
    };
    Json(ApiResponse::with_error(view, feed.error))
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::DashboardMetrics;

/// Messages broadcast to all connected dashboard WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "sales_updated")]
    SalesUpdated(SalesUpdate),

    #[serde(rename = "metrics_updated")]
    MetricsUpdated(DashboardMetrics),

    #[serde(rename = "feed_error")]
    FeedError(FeedErrorData),
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesUpdate {
    pub total: usize,
    pub generation: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedErrorData {
    pub feed: String,
    pub error: String,
}

pub mod analytics;
pub mod api;
pub mod config;
pub mod errors;
pub mod format;
pub mod metrics;
pub mod models;
pub mod services;
pub mod supabase;

use tokio::sync::broadcast;

use crate::api::ws_types::WsMessage;
use crate::config::AppConfig;
use crate::services::{MetricsHandle, SalesHandle};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub sales: SalesHandle,
    pub metrics: MetricsHandle,
    pub ws_tx: broadcast::Sender<WsMessage>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

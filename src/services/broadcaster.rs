use tokio::sync::{broadcast, watch};

use crate::api::ws_types::{FeedErrorData, SalesUpdate, WsMessage};
use crate::models::{DashboardMetrics, Sale};

use super::live_query::{FeedState, Phase};

/// Message describing a sales feed state, if it is worth pushing.
pub fn sales_message(state: &FeedState<Vec<Sale>>) -> Option<WsMessage> {
    match state.phase {
        Phase::Ready => Some(WsMessage::SalesUpdated(SalesUpdate {
            total: state.data.len(),
            generation: state.generation,
            updated_at: state.updated_at,
        })),
        Phase::Failed => failure("sales", state.error.as_deref()),
        Phase::Idle | Phase::Loading => None,
    }
}

pub fn metrics_message(state: &FeedState<DashboardMetrics>) -> Option<WsMessage> {
    match state.phase {
        Phase::Ready => Some(WsMessage::MetricsUpdated(state.data.as_ref().clone())),
        Phase::Failed => failure("metrics", state.error.as_deref()),
        Phase::Idle | Phase::Loading => None,
    }
}

fn failure(feed: &str, error: Option<&str>) -> Option<WsMessage> {
    Some(WsMessage::FeedError(FeedErrorData {
        feed: feed.to_string(),
        error: error.unwrap_or("unknown error").to_string(),
    }))
}

/// Forward feed state changes to connected dashboard clients until both
/// feeds are gone.
pub async fn run_update_broadcaster(
    mut sales_rx: watch::Receiver<FeedState<Vec<Sale>>>,
    mut metrics_rx: watch::Receiver<FeedState<DashboardMetrics>>,
    ws_tx: broadcast::Sender<WsMessage>,
) {
    let mut sales_open = true;
    let mut metrics_open = true;

    while sales_open || metrics_open {
        let msg = tokio::select! {
            changed = sales_rx.changed(), if sales_open => {
                if changed.is_err() {
                    sales_open = false;
                    continue;
                }
                let state = sales_rx.borrow_and_update().clone();
                sales_message(&state)
            }
            changed = metrics_rx.changed(), if metrics_open => {
                if changed.is_err() {
                    metrics_open = false;
                    continue;
                }
                let state = metrics_rx.borrow_and_update().clone();
                metrics_message(&state)
            }
        };

        if let Some(msg) = msg {
            // No connected clients is not an error
            let _ = ws_tx.send(msg);
        }
    }

    tracing::debug!("Feed broadcaster stopped");
}

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::source::ChangeEvent;
use super::types::{classify, Inbound, PhxMessage};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const BASE_RECONNECT_DELAY: Duration = Duration::from_secs(2);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// Build the Realtime socket URL from the project URL
/// (`https://x.supabase.co` → `wss://x.supabase.co/realtime/v1/websocket?...`).
pub fn realtime_url(project_url: &str, api_key: &str) -> String {
    let base = project_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}/realtime/v1/websocket?apikey={api_key}&vsn=1.0.0")
}

pub fn channel_topic(table: &str) -> String {
    format!("realtime:{table}-changes")
}

/// Run the Realtime listener for one table until `tx` is closed.
///
/// Each backend change is forwarded as one `ChangeEvent::Invalidate`.
/// After a reconnect an extra invalidation is sent, since changes made while
/// the socket was down were never delivered.
pub async fn run_realtime_listener(
    ws_url: String,
    access_token: String,
    table: String,
    tx: mpsc::Sender<ChangeEvent>,
) {
    let topic = channel_topic(&table);
    let mut attempt: u32 = 0;
    let mut has_joined_before = false;
    let mut next_ref: u64 = 1;

    loop {
        if tx.is_closed() {
            tracing::debug!(table = %table, "Change receiver dropped; stopping realtime listener");
            return;
        }

        tracing::info!(table = %table, "Connecting to Supabase Realtime...");

        match connect_async(&ws_url).await {
            Ok((ws_stream, _response)) => {
                tracing::info!(table = %table, "Realtime socket connected");
                let (mut write, mut read) = ws_stream.split();

                let join_ref = next_ref.to_string();
                let join = PhxMessage::join_table(&topic, &table, &access_token, next_ref);
                next_ref += 1;

                let join_sent = match serde_json::to_string(&join) {
                    Ok(text) => write.send(Message::Text(text.into())).await.is_ok(),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode join frame");
                        false
                    }
                };

                if join_sent {
                    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
                    heartbeat.tick().await; // consume the first immediate tick

                    loop {
                        tokio::select! {
                            msg = read.next() => {
                                match msg {
                                    Some(Ok(Message::Text(text))) => {
                                        match classify(text.as_str(), &topic, &join_ref) {
                                            Inbound::Change(kind) => {
                                                tracing::debug!(
                                                    table = %table,
                                                    kind = kind.as_deref().unwrap_or("*"),
                                                    "Change notification"
                                                );
                                                metrics::counter!("change_events_total").increment(1);
                                                if tx.send(ChangeEvent::Invalidate).await.is_err() {
                                                    return;
                                                }
                                            }
                                            Inbound::JoinOk => {
                                                tracing::info!(topic = %topic, "Subscribed to table changes");
                                                attempt = 0;
                                                if has_joined_before
                                                    && tx.send(ChangeEvent::Invalidate).await.is_err()
                                                {
                                                    return;
                                                }
                                                has_joined_before = true;
                                            }
                                            Inbound::JoinError(reason) => {
                                                tracing::error!(topic = %topic, reason = %reason, "Realtime subscription rejected");
                                                break;
                                            }
                                            Inbound::ChannelClosed => {
                                                tracing::warn!(topic = %topic, "Realtime channel closed by server");
                                                break;
                                            }
                                            Inbound::Ignored => {
                                                tracing::trace!(raw = %text.as_str(), "Ignored realtime frame");
                                            }
                                        }
                                    }
                                    Some(Ok(Message::Ping(data))) => {
                                        if let Err(e) = write.send(Message::Pong(data)).await {
                                            tracing::warn!(error = %e, "Failed to send pong");
                                            break;
                                        }
                                    }
                                    Some(Ok(Message::Close(_))) => {
                                        tracing::warn!("Realtime server sent close frame");
                                        break;
                                    }
                                    Some(Ok(_)) => {} // Binary, Pong, Frame
                                    Some(Err(e)) => {
                                        tracing::error!(error = %e, "Realtime read error");
                                        break;
                                    }
                                    None => {
                                        tracing::warn!("Realtime stream ended");
                                        break;
                                    }
                                }
                            }
                            _ = heartbeat.tick() => {
                                let frame = PhxMessage::heartbeat(next_ref);
                                next_ref += 1;
                                let Ok(text) = serde_json::to_string(&frame) else { break };
                                if let Err(e) = write.send(Message::Text(text.into())).await {
                                    tracing::warn!(error = %e, "Failed to send heartbeat");
                                    break;
                                }
                            }
                            _ = tx.closed() => {
                                tracing::debug!(table = %table, "Change receiver dropped; closing realtime socket");
                                let _ = write.send(Message::Close(None)).await;
                                return;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, table = %table, "Realtime connection failed");
            }
        }

        // Exponential backoff with cap
        let delay = BASE_RECONNECT_DELAY * 2u32.saturating_pow(attempt);
        let delay = delay.min(MAX_RECONNECT_DELAY);
        attempt = attempt.saturating_add(1);
        tracing::info!(delay_secs = delay.as_secs(), attempt, "Reconnecting to Realtime...");
        sleep(delay).await;
    }
}

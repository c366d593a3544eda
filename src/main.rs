use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::broadcast;

use salesboard::api::router::create_router;
use salesboard::api::ws_types::WsMessage;
use salesboard::config::AppConfig;
use salesboard::services::broadcaster::run_update_broadcaster;
use salesboard::services::{spawn_metrics_feed, spawn_sales_feed};
use salesboard::supabase::{DataSource, SupabaseClient};
use salesboard::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // rustls needs an explicit process-wide provider for the Realtime socket
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = salesboard::metrics::init_metrics()?;

    tracing::info!(url = %config.supabase_url, realtime = config.realtime_enabled, "Connecting to Supabase");
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;
    let source: Arc<dyn DataSource> = Arc::new(SupabaseClient::new(
        http,
        &config.supabase_url,
        &config.supabase_anon_key,
        config.realtime_enabled,
    ));

    // --- Feeds: sales list + approved-sales KPIs ---
    let sales_feed = spawn_sales_feed(Arc::clone(&source))?;
    let metrics_feed = spawn_metrics_feed(source, config.comparison_window_days)?;

    // --- WebSocket broadcast channel for dashboard ---
    let (ws_tx, _) = broadcast::channel::<WsMessage>(256);
    tokio::spawn(run_update_broadcaster(
        sales_feed.handle().subscribe(),
        metrics_feed.handle().subscribe(),
        ws_tx.clone(),
    ));

    if !config.has_api_token() {
        tracing::warn!("API_TOKEN not set; dashboard API is unauthenticated");
    }

    let state = AppState {
        config,
        sales: sales_feed.handle(),
        metrics: metrics_feed.handle(),
        ws_tx,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sales_feed.shutdown();
    metrics_feed.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    // LOG_FORMAT=json for log shippers; human-readable otherwise
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let (json_layer, text_layer) = if json {
        (Some(fmt::layer().json()), None)
    } else {
        (None, Some(fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(json_layer)
        .with(text_layer)
        .init();
}

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register the application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register so they appear before the first fetch.
    for feed in ["sales", "metrics"] {
        counter!("feed_fetch_total", "feed" => feed).absolute(0);
        counter!("feed_fetch_failed", "feed" => feed).absolute(0);
    }
    counter!("change_events_total").absolute(0);
    gauge!("sales_records").set(0.0);
    gauge!("approved_revenue").set(0.0);

    Ok(handle)
}

/// A handle backed by a recorder that is not installed globally.
/// Lets tests build an `AppState` without fighting over the global recorder.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

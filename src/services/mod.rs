pub mod broadcaster;
pub mod live_query;
pub mod metrics_feed;
pub mod sales_feed;

pub use live_query::{FeedHandle, FeedState, Fetch, LiveQuery, Phase};
pub use metrics_feed::{spawn_metrics_feed, MetricsFeed, MetricsFetch, MetricsHandle};
pub use sales_feed::{spawn_sales_feed, SalesFeed, SalesFetch, SalesHandle, SALES_TABLE};

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::Sale;
use crate::supabase::{select_as, DataError, DataSource, SelectQuery};

use super::live_query::{Fetch, FeedHandle, LiveQuery};

pub const SALES_TABLE: &str = "sales";

pub type SalesFeed = LiveQuery<Vec<Sale>>;
pub type SalesHandle = FeedHandle<Vec<Sale>>;

/// All sales, newest first.
pub struct SalesFetch;

#[async_trait]
impl Fetch for SalesFetch {
    type Output = Vec<Sale>;

    fn table(&self) -> &str {
        SALES_TABLE
    }

    async fn fetch(&self, source: &dyn DataSource) -> Result<Vec<Sale>, DataError> {
        let query = SelectQuery::table(SALES_TABLE).order_by("created_at", true);
        let mut sales: Vec<Sale> = select_as(source, &query).await?;

        // Backend order is not trusted
        sort_newest_first(&mut sales);

        metrics::gauge!("sales_records").set(sales.len() as f64);
        tracing::info!(count = sales.len(), "Sales fetched");
        Ok(sales)
    }
}

pub fn sort_newest_first(sales: &mut [Sale]) {
    sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

pub fn spawn_sales_feed(source: Arc<dyn DataSource>) -> Result<SalesFeed, DataError> {
    LiveQuery::spawn("sales", source, SalesFetch)
}

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::realtime::{realtime_url, run_realtime_listener};
use super::rest_client::RestClient;
use super::source::{DataError, DataSource, SelectQuery, Subscription};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// `DataSource` backed by a Supabase project: PostgREST for reads and
/// Realtime for change notifications.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    rest: RestClient,
    realtime_url: String,
    api_key: String,
    realtime_enabled: bool,
}

impl SupabaseClient {
    pub fn new(
        http: reqwest::Client,
        project_url: &str,
        api_key: &str,
        realtime_enabled: bool,
    ) -> Self {
        Self {
            rest: RestClient::new(http, project_url, api_key),
            realtime_url: realtime_url(project_url, api_key),
            api_key: api_key.to_string(),
            realtime_enabled,
        }
    }
}

#[async_trait]
impl DataSource for SupabaseClient {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>, DataError> {
        self.rest.select(query).await
    }

    fn subscribe(&self, table: &str) -> Result<Subscription, DataError> {
        let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);

        if !self.realtime_enabled {
            tracing::warn!(table = %table, "Realtime disabled (REALTIME_ENABLED=false); changes will not be pushed");
            drop(tx);
            return Ok(Subscription::new(rx, None));
        }

        let task = tokio::spawn(run_realtime_listener(
            self.realtime_url.clone(),
            self.api_key.clone(),
            table.to_string(),
            tx,
        ));
        Ok(Subscription::new(rx, Some(task)))
    }
}

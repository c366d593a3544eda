use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("query rejected ({status}): {message}")]
    Query { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

// ---------------------------------------------------------------------------
// SelectQuery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lt,
}

impl FilterOp {
    fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub column: String,
    pub descending: bool,
}

/// A `select *` against one table with AND-ed filters and optional ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Option<Ordering>,
}

impl SelectQuery {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    pub fn gte(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(column, FilterOp::Gte, value)
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(column, FilterOp::Lt, value)
    }

    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order = Some(Ordering {
            column: column.into(),
            descending,
        });
        self
    }

    fn filter(mut self, column: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// PostgREST query-string pairs, e.g. `status=eq.approved`,
    /// `order=created_at.desc`.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        for f in &self.filters {
            params.push((f.column.clone(), format!("{}.{}", f.op.as_str(), f.value)));
        }
        if let Some(order) = &self.order {
            let dir = if order.descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, dir)));
        }
        params
    }
}

// ---------------------------------------------------------------------------
// Change subscription
// ---------------------------------------------------------------------------

/// Signal that rows in the subscribed table changed. Carries no rows; the
/// receiver is expected to re-query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Invalidate,
}

/// Live change feed for one table. Released by `unsubscribe` or on drop.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<ChangeEvent>, task: Option<JoinHandle<()>>) -> Self {
        Self { events, task }
    }

    /// Next change event. `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release();
        tracing::debug!("Change subscription released");
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.events.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// DataSource
// ---------------------------------------------------------------------------

/// Remote table service: row queries plus push-style change notifications.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>, DataError>;

    fn subscribe(&self, table: &str) -> Result<Subscription, DataError>;
}

/// Run `query` and decode the rows into `T`. Rows that fail to decode are
/// logged and skipped; they do not fail the batch.
pub async fn select_as<T: DeserializeOwned>(
    source: &dyn DataSource,
    query: &SelectQuery,
) -> Result<Vec<T>, DataError> {
    let rows = source.select(query).await?;
    let total = rows.len();

    let decoded: Vec<T> = rows
        .into_iter()
        .filter_map(|row| decode_row(&query.table, row))
        .collect();

    let skipped = total - decoded.len();
    if skipped > 0 {
        metrics::counter!("rows_skipped_total", "table" => query.table.clone())
            .increment(skipped as u64);
    }
    Ok(decoded)
}

fn decode_row<T: DeserializeOwned>(table: &str, row: Value) -> Option<T> {
    let id = row.get("id").map(Value::to_string).unwrap_or_default();
    match serde_json::from_value(row) {
        Ok(item) => Some(item),
        Err(e) => {
            tracing::warn!(table, id = %id, error = %e, "Skipping undecodable row");
            None
        }
    }
}

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch, Semaphore};

use salesboard::services::FeedState;
use salesboard::supabase::{
    ChangeEvent, DataError, DataSource, FilterOp, SelectQuery, Subscription,
};

/// In-memory `DataSource`. Applies `eq` filters, ignores ordering (so the
/// feeds' own sorting is exercised) and lets tests push change events.
#[allow(dead_code)]
pub struct FakeSource {
    rows: Mutex<Vec<Value>>,
    failure: Mutex<Option<(u16, String)>>,
    queries: Mutex<Vec<SelectQuery>>,
    listeners: Mutex<Vec<mpsc::Sender<ChangeEvent>>>,
    gate: Arc<Semaphore>,
}

#[allow(dead_code)]
impl FakeSource {
    pub fn new(rows: Vec<Value>) -> Arc<Self> {
        Self::with_gate(rows, Semaphore::MAX_PERMITS)
    }

    /// Each select consumes one permit; with `permits = 0` every fetch
    /// blocks until `release` is called.
    pub fn with_gate(rows: Vec<Value>, permits: usize) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
            failure: Mutex::new(None),
            queries: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            gate: Arc::new(Semaphore::new(permits)),
        })
    }

    pub fn release(&self, fetches: usize) {
        self.gate.add_permits(fetches);
    }

    pub fn set_rows(&self, rows: Vec<Value>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub fn fail_with(&self, status: u16, message: &str) {
        *self.failure.lock().unwrap() = Some((status, message.to_string()));
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn queries(&self) -> Vec<SelectQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub async fn emit_change(&self) {
        let listeners = self.listeners.lock().unwrap().clone();
        for tx in listeners {
            let _ = tx.send(ChangeEvent::Invalidate).await;
        }
    }

    pub fn open_subscriptions(&self) -> usize {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

#[async_trait]
impl DataSource for FakeSource {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>, DataError> {
        self.gate
            .acquire()
            .await
            .expect("gate closed")
            .forget();

        self.queries.lock().unwrap().push(query.clone());

        if let Some((status, message)) = self.failure.lock().unwrap().clone() {
            return Err(DataError::Query { status, message });
        }

        let rows = self.rows.lock().unwrap().clone();
        Ok(rows
            .into_iter()
            .filter(|row| {
                query.filters.iter().all(|f| match f.op {
                    FilterOp::Eq => row[f.column.as_str()].as_str() == Some(f.value.as_str()),
                    _ => true,
                })
            })
            .collect())
    }

    fn subscribe(&self, _table: &str) -> Result<Subscription, DataError> {
        let (tx, rx) = mpsc::channel(16);
        self.listeners.lock().unwrap().push(tx);
        Ok(Subscription::new(rx, None))
    }
}

#[allow(dead_code)]
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, day, hour, 0, 0).unwrap()
}

/// A `sales` row as PostgREST returns it.
#[allow(dead_code)]
#[allow(clippy::too_many_arguments)]
pub fn sale_row(
    id: &str,
    customer: &str,
    price: &str,
    amount_usd: Option<&str>,
    status: &str,
    method: &str,
    affiliate: Option<(&str, &str)>,
    created_at: DateTime<Utc>,
) -> Value {
    json!({
        "id": id,
        "cartpanda_id": format!("cp_{id}"),
        "customer_email": format!("{}@example.com", customer.split(' ').next().unwrap_or("x").to_lowercase()),
        "customer_name": customer,
        "product_name": "Produto Alpha",
        "product_id": "prod_1",
        "price": price,
        "currency": "BRL",
        "amount_usd": amount_usd,
        "status": status,
        "affiliate_code": affiliate.map(|(code, _)| code),
        "affiliate_name": affiliate.map(|(_, name)| name),
        "payment_method": method,
        "transaction_id": format!("tx_{id}"),
        "webhook_received_at": created_at,
        "metadata": { "webhook_type": "sale.approved" },
        "created_at": created_at,
        "updated_at": created_at,
    })
}

/// Three approved sales (100, 200, and 45 normalized to 50), one refund and
/// one cancellation, deliberately out of date order.
#[allow(dead_code)]
pub fn sample_rows() -> Vec<Value> {
    vec![
        sale_row("s2", "Pedro Martins", "200", None, "approved", "credit_card", Some(("PM", "Pedro Martins")), at(18, 9)),
        sale_row("s1", "Ana Costa", "100", None, "approved", "pix", Some(("AC", "Ana Costa")), at(20, 14)),
        sale_row("s3", "Carla Dias", "45", Some("50"), "approved", "pix", None, at(19, 10)),
        sale_row("s4", "Bruno Lima", "80", None, "refunded", "boleto", Some(("AC", "Ana Costa")), at(17, 8)),
        sale_row("s5", "Daniel Alves", "60", None, "cancelled", "pix", None, at(16, 8)),
    ]
}

/// Wait (bounded) until the feed state satisfies `pred` and return it.
#[allow(dead_code)]
pub async fn wait_for<T, F>(rx: &mut watch::Receiver<FeedState<T>>, pred: F) -> FeedState<T>
where
    F: FnMut(&FeedState<T>) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred))
        .await
        .expect("timed out waiting for feed state")
        .expect("feed stopped")
        .clone()
}

use std::future::pending;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::supabase::{ChangeEvent, DataError, DataSource, Subscription};

const COMMAND_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Published state of a feed. `data` keeps the last good result across
/// failures.
#[derive(Debug)]
pub struct FeedState<T> {
    pub data: Arc<T>,
    pub phase: Phase,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Number of fetches that completed successfully.
    pub generation: u64,
}

impl<T> Clone for FeedState<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            phase: self.phase,
            error: self.error.clone(),
            updated_at: self.updated_at,
            generation: self.generation,
        }
    }
}

impl<T: Default> Default for FeedState<T> {
    fn default() -> Self {
        Self {
            data: Arc::new(T::default()),
            phase: Phase::Idle,
            error: None,
            updated_at: None,
            generation: 0,
        }
    }
}

impl<T> FeedState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Idle | Phase::Loading)
    }
}

/// One query a feed keeps fresh.
#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    /// Table whose change notifications trigger a refresh.
    fn table(&self) -> &str;

    async fn fetch(&self, source: &dyn DataSource) -> Result<Self::Output, DataError>;
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Refetch,
}

/// Cloneable read/refetch access to a running feed.
#[derive(Debug)]
pub struct FeedHandle<T> {
    state: watch::Receiver<FeedState<T>>,
    commands: mpsc::Sender<Command>,
}

impl<T> Clone for FeedHandle<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            commands: self.commands.clone(),
        }
    }
}

impl<T> FeedHandle<T> {
    pub fn snapshot(&self) -> FeedState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState<T>> {
        self.state.clone()
    }

    /// Queue a refetch. Returns false once the feed has shut down.
    pub async fn refetch(&self) -> bool {
        self.commands.send(Command::Refetch).await.is_ok()
    }
}

/// A query kept fresh by a dedicated task: fetched once on start, again on
/// every change notification for its table, and on `refetch`.
///
/// All fetches run on that one task, so they complete in the order they
/// were requested. Changes that arrive while a fetch is in flight wait in
/// the subscription channel and each gets its own fetch afterwards.
pub struct LiveQuery<T> {
    name: &'static str,
    handle: FeedHandle<T>,
    task: JoinHandle<()>,
}

impl<T: Default + Send + Sync + 'static> LiveQuery<T> {
    pub fn spawn<F>(name: &'static str, source: Arc<dyn DataSource>, fetcher: F) -> Result<Self, DataError>
    where
        F: Fetch<Output = T>,
    {
        let subscription = source.subscribe(fetcher.table())?;
        let (state_tx, state_rx) = watch::channel(FeedState::default());
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let task = tokio::spawn(run_feed(name, source, fetcher, subscription, state_tx, cmd_rx));
        tracing::info!(feed = name, "Feed started");

        Ok(Self {
            name,
            handle: FeedHandle {
                state: state_rx,
                commands: cmd_tx,
            },
            task,
        })
    }
}

impl<T> LiveQuery<T> {
    pub fn handle(&self) -> FeedHandle<T> {
        self.handle.clone()
    }

    pub fn snapshot(&self) -> FeedState<T> {
        self.handle.snapshot()
    }

    pub async fn refetch(&self) -> bool {
        self.handle.refetch().await
    }

    /// Stop the feed. The subscription is released and a fetch still in
    /// flight is dropped without touching the published state.
    pub fn shutdown(self) {
        tracing::info!(feed = self.name, "Feed shut down");
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_feed<F: Fetch>(
    name: &'static str,
    source: Arc<dyn DataSource>,
    fetcher: F,
    subscription: Subscription,
    state: watch::Sender<FeedState<F::Output>>,
    mut commands: mpsc::Receiver<Command>,
) {
    let mut subscription = Some(subscription);

    refresh(name, source.as_ref(), &fetcher, &state).await;

    loop {
        tokio::select! {
            event = next_change(&mut subscription) => match event {
                Some(ChangeEvent::Invalidate) => {
                    tracing::debug!(feed = name, "Change notification; refreshing");
                    refresh(name, source.as_ref(), &fetcher, &state).await;
                }
                None => {
                    tracing::warn!(feed = name, "Change feed ended; only manual refetch will refresh");
                    if let Some(sub) = subscription.take() {
                        sub.unsubscribe();
                    }
                }
            },
            cmd = commands.recv() => match cmd {
                Some(Command::Refetch) => {
                    tracing::debug!(feed = name, "Manual refetch");
                    refresh(name, source.as_ref(), &fetcher, &state).await;
                }
                None => break,
            },
        }
    }

    if let Some(sub) = subscription.take() {
        sub.unsubscribe();
    }
}

async fn next_change(subscription: &mut Option<Subscription>) -> Option<ChangeEvent> {
    match subscription {
        Some(sub) => sub.next().await,
        None => pending().await,
    }
}

async fn refresh<F: Fetch>(
    name: &'static str,
    source: &dyn DataSource,
    fetcher: &F,
    state: &watch::Sender<FeedState<F::Output>>,
) {
    state.send_modify(|s| s.phase = Phase::Loading);
    metrics::counter!("feed_fetch_total", "feed" => name).increment(1);
    let started = Instant::now();

    match fetcher.fetch(source).await {
        Ok(data) => {
            state.send_modify(|s| {
                s.data = Arc::new(data);
                s.phase = Phase::Ready;
                s.error = None;
                s.updated_at = Some(Utc::now());
                s.generation += 1;
            });
            tracing::debug!(
                feed = name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Feed refreshed"
            );
        }
        Err(e) => {
            metrics::counter!("feed_fetch_failed", "feed" => name).increment(1);
            tracing::error!(feed = name, error = %e, "Feed fetch failed");
            state.send_modify(|s| {
                s.phase = Phase::Failed;
                s.error = Some(e.to_string());
            });
        }
    }
}

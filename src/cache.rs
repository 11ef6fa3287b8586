use std::fs;
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::domain::credentials::is_placeholder;
use crate::domain::search::SearchQuery;
use crate::domain::ticket::{FeedSource, TicketCollection};
use crate::error::{AppError, AppResult};
use crate::services::IssueTracker;

/// Maximum age at which a cached collection is served without a network call.
pub const FRESHNESS_THRESHOLD: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct TicketFeedConfig {
    pub enabled: bool,
    pub base_url: String,
    pub jql: String,
    pub max_results: u32,
    /// Zero disables the background refresh task.
    pub refresh_interval: Duration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketFeedStatus {
    pub enabled: bool,
    pub connected: bool,
    pub ticket_count: usize,
    pub last_fetch: Option<DateTime<Utc>>,
    pub next_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct CacheState {
    collection: Option<Arc<TicketCollection>>,
    last_fetch: Option<Instant>,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
    next_refresh: Option<Instant>,
    active: bool,
    // Bumped by every completed fetch, successful or not.
    generation: u64,
}

struct RefreshTask {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct Inner {
    tracker: Arc<dyn IssueTracker>,
    config: TicketFeedConfig,
    snapshot: Option<Arc<TicketCollection>>,
    state: RwLock<CacheState>,
    // Serializes fetches so overlapping timer and manual refreshes never
    // interleave their writes.
    fetch_lock: AsyncMutex<()>,
    refresh_task: Mutex<Option<RefreshTask>>,
}

/// Best-effort fresh snapshot of the ticket feed.
///
/// Cloning is cheap; clones share the same cache and refresh task.
#[derive(Clone)]
pub struct TicketCache {
    inner: Arc<Inner>,
}

impl TicketCache {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        config: TicketFeedConfig,
        snapshot: Option<TicketCollection>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                tracker,
                config,
                snapshot: snapshot.map(Arc::new),
                state: RwLock::new(CacheState::default()),
                fetch_lock: AsyncMutex::new(()),
                refresh_task: Mutex::new(None),
            }),
        }
    }

    /// Validates the configuration, performs the first fetch and arms the
    /// refresh task. A disabled feed stays inactive and never touches the
    /// network on its own.
    pub async fn initialize(&self) -> AppResult<()> {
        let config = &self.inner.config;
        if !config.enabled {
            info!("Ticket feed is disabled");
            return Ok(());
        }
        if self.is_active() {
            return Ok(());
        }

        if let Err(err) = self.validate().await {
            error!("Ticket feed configuration is invalid: {err}");
            return Err(err);
        }

        self.inner.state.write().active = true;
        self.fetch().await;

        if config.refresh_interval.is_zero() {
            info!("Ticket feed refresh task not armed (interval is zero)");
        } else {
            self.start_refresh_task(config.refresh_interval);
        }
        Ok(())
    }

    /// Serves the cached collection while it is fresh, otherwise fetches.
    pub async fn get_tickets(&self) -> Arc<TicketCollection> {
        if let Some(collection) = self.fresh_collection() {
            return collection;
        }
        if !self.is_active() {
            return self.inner.cached_or_fallback();
        }

        let seen = self.inner.state.read().generation;
        let _guard = self.inner.fetch_lock.lock().await;
        // Another caller may have fetched while we waited; its outcome stands
        // for ours even when it failed.
        if let Some(collection) = self.fresh_collection() {
            return collection;
        }
        if self.inner.state.read().generation != seen {
            return self.inner.cached_or_fallback();
        }
        self.inner.fetch_locked().await
    }

    /// Fetches regardless of freshness. The previous collection stays in
    /// place if the fetch fails.
    pub async fn refresh(&self) -> Arc<TicketCollection> {
        info!("Manual ticket refresh requested");
        self.fetch().await
    }

    pub async fn fetch(&self) -> Arc<TicketCollection> {
        let _guard = self.inner.fetch_lock.lock().await;
        self.inner.fetch_locked().await
    }

    /// Drops the cached collection so the next read goes to the network.
    pub fn invalidate(&self) {
        let mut state = self.inner.state.write();
        state.collection = None;
        state.last_fetch = None;
        debug!("Ticket cache invalidated");
    }

    pub fn status(&self) -> TicketFeedStatus {
        let state = self.inner.state.read();
        let now = Instant::now();
        let wall_now = Utc::now();

        TicketFeedStatus {
            enabled: state.active,
            connected: state.collection.is_some(),
            ticket_count: state.collection.as_ref().map_or(0, |c| c.len()),
            last_fetch: state.last_success,
            next_refresh: state.next_refresh.map(|at| {
                let remaining = chrono::Duration::from_std(at.saturating_duration_since(now))
                    .unwrap_or_else(|_| chrono::Duration::zero());
                wall_now + remaining
            }),
            last_error: state.last_error.clone(),
        }
    }

    /// Stops the refresh task and waits for an in-flight tick to finish.
    pub async fn shutdown(&self) {
        let task = self.inner.refresh_task.lock().take();
        if let Some(task) = task {
            let _ = task.stop.send(true);
            if let Err(err) = task.handle.await {
                warn!("Ticket refresh task ended abnormally: {err}");
            }
            info!("Ticket refresh task stopped");
        }
        self.inner.state.write().next_refresh = None;
    }

    fn is_active(&self) -> bool {
        self.inner.state.read().active
    }

    fn fresh_collection(&self) -> Option<Arc<TicketCollection>> {
        let state = self.inner.state.read();
        match (&state.collection, state.last_fetch) {
            (Some(collection), Some(at)) if at.elapsed() < FRESHNESS_THRESHOLD => {
                Some(collection.clone())
            }
            _ => None,
        }
    }

    async fn validate(&self) -> AppResult<()> {
        if is_placeholder(&self.inner.config.base_url) {
            return Err(AppError::Configuration(
                "issue tracker base URL is missing or a placeholder".to_string(),
            ));
        }
        self.inner.tracker.check_credentials().await
    }

    fn start_refresh_task(&self, period: Duration) {
        let (stop, mut stopped) = watch::channel(false);
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let first = Instant::now() + period;
        self.inner.state.write().next_refresh = Some(first);

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    tick = ticker.tick() => {
                        let Some(inner) = inner.upgrade() else { break };
                        inner.state.write().next_refresh = Some(tick + period);
                        let _guard = inner.fetch_lock.lock().await;
                        inner.fetch_locked().await;
                    }
                }
            }
        });

        info!("Ticket refresh task armed every {period:?}");
        *self.inner.refresh_task.lock() = Some(RefreshTask { stop, handle });
    }
}

impl Inner {
    async fn fetch_locked(&self) -> Arc<TicketCollection> {
        info!("Fetching tickets from issue tracker...");
        let query = SearchQuery::new(self.config.jql.clone(), self.config.max_results);

        match self.tracker.search(&query).await {
            Ok(results) => {
                let collection = Arc::new(TicketCollection::from_search(
                    results,
                    &self.config.base_url,
                ));
                info!("Successfully fetched {} tickets", collection.len());

                let mut state = self.state.write();
                state.last_success = Some(collection.fetched_at);
                state.collection = Some(collection.clone());
                state.last_fetch = Some(Instant::now());
                state.last_error = None;
                state.generation += 1;
                collection
            }
            Err(err) => {
                warn!("Error fetching tickets: {err}");
                {
                    let mut state = self.state.write();
                    state.last_error = Some(err.to_string());
                    state.generation += 1;
                }
                self.cached_or_fallback()
            }
        }
    }

    fn cached_or_fallback(&self) -> Arc<TicketCollection> {
        if let Some(collection) = self.state.read().collection.clone() {
            return collection;
        }
        if let Some(snapshot) = &self.snapshot {
            debug!("Using bootstrap ticket snapshot");
            return snapshot.clone();
        }
        info!("Using fallback ticket data");
        Arc::new(TicketCollection::unavailable())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.refresh_task.get_mut().take() {
            task.handle.abort();
        }
    }
}

/// Loads the optional JSON ticket snapshot used until a live fetch succeeds.
pub fn load_snapshot(path: &Path) -> AppResult<Option<TicketCollection>> {
    let mut collection = match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str::<TicketCollection>(&contents).map_err(|err| {
            AppError::Configuration(format!(
                "invalid ticket snapshot {}: {err}",
                path.display()
            ))
        })?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("Ticket snapshot {} not found, skipping", path.display());
            return Ok(None);
        }
        Err(err) => return Err(AppError::Io(err)),
    };

    collection.source = FeedSource::Snapshot;
    Ok(Some(collection))
}

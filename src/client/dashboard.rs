//! Client-side view state: one instance per session.
//!
//! Everything runs on the caller's task, one event at a time. Rendering only
//! ever reads already-known local state. Status writes go to the store
//! through a single writer task, in click order, and their outcome is
//! reported through the [`SyncStatus`] channel.

use super::api::StoreClient;
use super::cache::LocalCache;
use super::error::{ClientError, Result};
use super::merge::merge;
use crate::models::{MutationResponse, Statistics, StatusSymbol, TableSnapshot};
use crate::tracker::View;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Whether the store has confirmed our latest read or write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncStatus {
    #[default]
    Unknown,
    Connected,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    Toggle { habit: String, date: String },
    SetView(View),
    Refresh,
    Shutdown,
}

/// Outcome of a click: the symbol now shown and whether the store took it.
///
/// `write` resolves to `true` once the store confirms the write and `false`
/// if it did not.
#[derive(Debug)]
pub struct Toggled {
    pub status: StatusSymbol,
    pub write: oneshot::Receiver<bool>,
}

struct StatusWrite {
    habit: String,
    date: String,
    status: StatusSymbol,
    confirmed: oneshot::Sender<bool>,
}

struct Writer {
    queue: mpsc::UnboundedSender<StatusWrite>,
    task: JoinHandle<()>,
}

pub struct Dashboard<C> {
    api: StoreClient,
    cache: C,
    view: View,
    snapshot: TableSnapshot,
    local_stats: Statistics,
    store_stats: Option<Statistics>,
    status: Arc<watch::Sender<SyncStatus>>,
    writer: Option<Writer>,
}

impl<C: LocalCache> Dashboard<C> {
    /// Starts from whatever the cache holds so there is something to render
    /// before the first fetch completes.
    pub async fn new(api: StoreClient, cache: C, view: View) -> Self {
        let snapshot = cache.load().await.unwrap_or_default();
        let (status, _) = watch::channel(SyncStatus::Unknown);
        Self {
            api,
            cache,
            view,
            local_stats: snapshot.statistics(),
            snapshot,
            store_stats: None,
            status: Arc::new(status),
            writer: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn snapshot(&self) -> &TableSnapshot {
        &self.snapshot
    }

    /// Statistics recomputed from the local snapshot after every change.
    pub fn local_stats(&self) -> Statistics {
        self.local_stats
    }

    /// Table-wide statistics as last reported by the store.
    pub fn store_stats(&self) -> Option<Statistics> {
        self.store_stats
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Fetch the current view and merge the cached copy over it.
    ///
    /// An unreachable store is not an error: the cached snapshot is shown and
    /// the status channel reports the failure. Only a request the store
    /// refused is returned as `Err`.
    pub async fn load(&mut self) -> Result<()> {
        match self.api.snapshot(self.view).await {
            Ok(server) => {
                let local = self.cache.load().await;
                self.snapshot = merge(server, local.as_ref());
                self.persist().await;
                self.mark_connected();
            }
            Err(err @ ClientError::Rejected { .. }) => {
                self.mark_connected();
                return Err(err);
            }
            Err(err) => {
                warn!("showing cached snapshot: {err}");
                if let Some(cached) = self.cache.load().await {
                    self.snapshot = cached;
                }
                self.mark_failed(&err);
            }
        }
        self.local_stats = self.snapshot.statistics();
        Ok(())
    }

    /// Re-fetch store statistics and the current view.
    pub async fn refresh(&mut self) -> Result<()> {
        match self.api.statistics().await {
            Ok(stats) => self.store_stats = Some(stats),
            Err(err) => warn!("statistics refresh failed: {err}"),
        }
        self.load().await
    }

    /// Switch views; the previous view is kept if the store refuses the new one.
    pub async fn set_view(&mut self, view: View) -> Result<()> {
        let previous = self.view;
        self.view = view;
        let loaded = self.load().await;
        if loaded.is_err() {
            self.view = previous;
        }
        loaded
    }

    /// Advance one cell through its click cycle.
    ///
    /// The new symbol is applied and cached before this returns. The store
    /// write is queued behind earlier clicks and sent at most once; failures
    /// only update the status channel.
    pub async fn toggle(&mut self, habit: &str, date: &str) -> Result<Toggled> {
        let not_in_view = || ClientError::NotInView {
            habit: habit.to_string(),
            date: date.to_string(),
        };
        let TableSnapshot { habits, dates } = &mut self.snapshot;
        if !dates.iter().any(|known| known == date) {
            return Err(not_in_view());
        }
        let row = habits
            .iter_mut()
            .find(|row| row.name == habit)
            .ok_or_else(not_in_view)?;

        let next = row.status(date).next();
        row.daily_status.insert(date.to_string(), next);
        row.recompute(dates);
        self.local_stats = self.snapshot.statistics();
        self.persist().await;

        let (confirmed, write) = oneshot::channel();
        let job = StatusWrite {
            habit: habit.to_string(),
            date: date.to_string(),
            status: next,
            confirmed,
        };
        if self.writer().send(job).is_err() {
            self.writer = None;
            warn!(%habit, %date, "status writer stopped, write not sent");
            self.status.send_replace(SyncStatus::Failed {
                reason: "status writer stopped".to_string(),
            });
        }

        Ok(Toggled {
            status: next,
            write,
        })
    }

    /// Wait until every queued status write has been answered or has failed.
    pub async fn flush(&mut self) {
        if let Some(Writer { queue, task }) = self.writer.take() {
            drop(queue);
            if let Err(err) = task.await {
                warn!("status writer stopped: {err}");
            }
        }
    }

    pub async fn add_habit(&mut self, name: &str, emoji: Option<&str>) -> Result<MutationResponse> {
        let outcome = self.api.add_habit(name, emoji).await;
        self.after_mutation(outcome).await
    }

    pub async fn edit_habit(
        &mut self,
        old_name: &str,
        new_name: &str,
        emoji: Option<&str>,
    ) -> Result<MutationResponse> {
        let outcome = self.api.edit_habit(old_name, new_name, emoji).await;
        self.after_mutation(outcome).await
    }

    pub async fn delete_habit(&mut self, name: &str) -> Result<MutationResponse> {
        let outcome = self.api.delete_habit(name).await;
        self.after_mutation(outcome).await
    }

    /// Process events until `Shutdown` or the sender goes away, refreshing on
    /// every tick of `every`. `render` runs after each event. Queued status
    /// writes are flushed before this returns.
    pub async fn run<F>(
        mut self,
        mut events: mpsc::Receiver<DashboardEvent>,
        every: Duration,
        mut render: F,
    ) -> Self
    where
        F: FnMut(&Self),
    {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => {
                    if let Err(err) = self.refresh().await {
                        warn!("refresh failed: {err}");
                    }
                }
                event = events.recv() => match event {
                    None | Some(DashboardEvent::Shutdown) => break,
                    Some(DashboardEvent::Toggle { habit, date }) => {
                        if let Err(err) = self.toggle(&habit, &date).await {
                            warn!("{err}");
                        }
                    }
                    Some(DashboardEvent::SetView(view)) => {
                        if let Err(err) = self.set_view(view).await {
                            warn!("view change refused: {err}");
                        }
                    }
                    Some(DashboardEvent::Refresh) => {
                        if let Err(err) = self.refresh().await {
                            warn!("refresh failed: {err}");
                        }
                    }
                },
            }
            render(&self);
        }
        self.flush().await;
        self
    }

    fn writer(&mut self) -> &mpsc::UnboundedSender<StatusWrite> {
        let writer = self.writer.get_or_insert_with(|| {
            let (queue, pending) = mpsc::unbounded_channel();
            let task = tokio::spawn(write_in_order(
                self.api.clone(),
                Arc::clone(&self.status),
                pending,
            ));
            Writer { queue, task }
        });
        &writer.queue
    }

    async fn after_mutation(
        &mut self,
        outcome: Result<MutationResponse>,
    ) -> Result<MutationResponse> {
        match outcome {
            Ok(response) => {
                self.mark_connected();
                self.load().await?;
                Ok(response)
            }
            Err(err) => {
                if matches!(err, ClientError::Rejected { .. }) {
                    self.mark_connected();
                } else {
                    self.mark_failed(&err);
                }
                Err(err)
            }
        }
    }

    async fn persist(&mut self) {
        if let Err(err) = self.cache.store(&self.snapshot).await {
            warn!("failed to cache snapshot: {err}");
        }
    }

    fn mark_connected(&self) {
        self.status.send_replace(SyncStatus::Connected);
    }

    fn mark_failed(&self, err: &ClientError) {
        self.status.send_replace(SyncStatus::Failed {
            reason: err.to_string(),
        });
    }
}

/// Send status writes one at a time so the store applies them in click order.
async fn write_in_order(
    api: StoreClient,
    status: Arc<watch::Sender<SyncStatus>>,
    mut pending: mpsc::UnboundedReceiver<StatusWrite>,
) {
    while let Some(write) = pending.recv().await {
        let StatusWrite {
            habit,
            date,
            status: symbol,
            confirmed,
        } = write;
        let ok = match api.set_status(&habit, &date, symbol).await {
            Ok(()) => {
                debug!(%habit, %date, "status write confirmed");
                status.send_replace(SyncStatus::Connected);
                true
            }
            Err(err) => {
                warn!(%habit, %date, "status write not confirmed: {err}");
                status.send_replace(SyncStatus::Failed {
                    reason: err.to_string(),
                });
                false
            }
        };
        let _ = confirmed.send(ok);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::cache::MemoryCache;
    use crate::config::Settings;
    use crate::tracker::{date_labels, Tracker};
    use crate::models::{HabitRow, SetStatusRequest};
    use crate::{router, AppState};
    use axum::{
        extract::State,
        routing::{get, post},
        Json, Router,
    };
    use reqwest::StatusCode;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const RUNNING: &str = "🏃 Running";

    /// Store whose first status write answers late; records the order writes land.
    #[derive(Clone, Default)]
    struct SlowStore {
        first_write_delay: Duration,
        arrivals: Arc<AtomicUsize>,
        applied: Arc<Mutex<Vec<StatusSymbol>>>,
    }

    impl SlowStore {
        fn applied(&self) -> Vec<StatusSymbol> {
            self.applied.lock().unwrap().clone()
        }
    }

    async fn slow_snapshot() -> Json<TableSnapshot> {
        Json(TableSnapshot {
            habits: vec![HabitRow {
                name: "h".into(),
                daily_status: BTreeMap::new(),
                completed: 0,
                missed: 0,
                progress: 0,
                streak: 0,
            }],
            dates: vec!["d1".into()],
        })
    }

    async fn slow_stats() -> Json<Statistics> {
        Json(Statistics::default())
    }

    async fn slow_set_status(
        State(store): State<SlowStore>,
        Json(request): Json<SetStatusRequest>,
    ) -> Json<MutationResponse> {
        if store.arrivals.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(store.first_write_delay).await;
        }
        store.applied.lock().unwrap().push(request.status);
        Json(MutationResponse {
            success: true,
            message: "updated".into(),
            synced_to_sheets: false,
        })
    }

    async fn spawn_slow_store(first_write_delay: Duration) -> (StoreClient, SlowStore) {
        let store = SlowStore {
            first_write_delay,
            ..SlowStore::default()
        };
        let app = Router::new()
            .route("/api/habits", get(slow_snapshot))
            .route("/api/stats", get(slow_stats))
            .route("/api/habits/status", post(slow_set_status))
            .with_state(store.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (StoreClient::new(format!("http://{addr}")).unwrap(), store)
    }

    async fn spawn_store() -> (StoreClient, AppState) {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("habit_store_{}_{nanos}", std::process::id()));
        let settings = Settings {
            data_path: dir.join("tracker.json"),
            config_path: dir.join("config.json"),
            ..Settings::default()
        };
        let tracker = Tracker::seeded(date_labels(settings.start, settings.end));
        let state = AppState::new(settings, tracker);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (StoreClient::new(format!("http://{addr}")).unwrap(), state)
    }

    fn offline_client() -> StoreClient {
        StoreClient::new("http://127.0.0.1:1").unwrap()
    }

    #[tokio::test]
    async fn toggle_shows_immediately_and_writes_through() {
        let (api, state) = spawn_store().await;
        let mut dashboard = Dashboard::new(api, MemoryCache::default(), View::Week(1)).await;
        dashboard.load().await.unwrap();
        assert_eq!(dashboard.snapshot().dates.len(), 7);

        let toggled = dashboard.toggle(RUNNING, "05 Jan").await.unwrap();
        assert_eq!(toggled.status, StatusSymbol::Completed);
        let row = dashboard.snapshot().habit(RUNNING).unwrap();
        assert_eq!(row.status("05 Jan"), StatusSymbol::Completed);
        assert_eq!(row.progress, 100);
        assert_eq!(dashboard.local_stats().total_completed, 1);

        assert!(toggled.write.await.unwrap());
        assert_eq!(dashboard.sync_status(), SyncStatus::Connected);
        let stored = state.tracker.lock().await.habit(RUNNING).unwrap().status("05 Jan");
        assert_eq!(stored, StatusSymbol::Completed);
    }

    #[tokio::test]
    async fn three_toggles_restore_the_cell() {
        let (api, state) = spawn_store().await;
        let mut dashboard = Dashboard::new(api, MemoryCache::default(), View::All).await;
        dashboard.load().await.unwrap();

        for expected in [
            StatusSymbol::Completed,
            StatusSymbol::Missed,
            StatusSymbol::Pending,
        ] {
            let toggled = dashboard.toggle(RUNNING, "06 Jan").await.unwrap();
            assert_eq!(toggled.status, expected);
            assert!(toggled.write.await.unwrap());
        }
        let habit = state.tracker.lock().await.habit(RUNNING).cloned().unwrap();
        assert!(habit.daily_status.is_empty());
    }

    #[tokio::test]
    async fn cached_cell_wins_over_stale_server() {
        let (api, state) = spawn_store().await;
        state
            .tracker
            .lock()
            .await
            .set_status(RUNNING, "05 Jan", StatusSymbol::Completed)
            .unwrap();

        let mut cache = MemoryCache::default();
        let mut local = state.tracker.lock().await.snapshot(View::All).unwrap();
        local
            .habit_mut(RUNNING)
            .unwrap()
            .daily_status
            .insert("05 Jan".into(), StatusSymbol::Missed);
        cache.store(&local).await.unwrap();

        let mut dashboard = Dashboard::new(api, cache, View::All).await;
        dashboard.load().await.unwrap();
        let row = dashboard.snapshot().habit(RUNNING).unwrap();
        assert_eq!(row.status("05 Jan"), StatusSymbol::Missed);
        assert_eq!(dashboard.local_stats().total_missed, 1);
        assert_eq!(dashboard.local_stats().total_completed, 0);
    }

    #[tokio::test]
    async fn unreachable_store_falls_back_to_cache() {
        let (_, state) = spawn_store().await;
        let cached = state.tracker.lock().await.snapshot(View::All).unwrap();
        let mut cache = MemoryCache::default();
        cache.store(&cached).await.unwrap();

        let mut dashboard = Dashboard::new(offline_client(), cache, View::All).await;
        dashboard.load().await.unwrap();
        assert_eq!(dashboard.snapshot(), &cached);
        assert!(matches!(dashboard.sync_status(), SyncStatus::Failed { .. }));

        let mut statuses = dashboard.subscribe();
        let toggled = dashboard.toggle(RUNNING, "05 Jan").await.unwrap();
        assert_eq!(toggled.status, StatusSymbol::Completed);
        assert!(!toggled.write.await.unwrap());
        assert!(matches!(
            *statuses.borrow_and_update(),
            SyncStatus::Failed { .. }
        ));

        let row = dashboard.snapshot().habit(RUNNING).unwrap();
        assert_eq!(row.status("05 Jan"), StatusSymbol::Completed);
    }

    #[tokio::test]
    async fn toggle_outside_view_is_refused() {
        let (api, _) = spawn_store().await;
        let mut dashboard = Dashboard::new(api, MemoryCache::default(), View::Week(1)).await;
        dashboard.load().await.unwrap();
        assert!(matches!(
            dashboard.toggle(RUNNING, "20 Jan").await,
            Err(ClientError::NotInView { .. })
        ));
        assert!(matches!(
            dashboard.toggle("Juggling", "05 Jan").await,
            Err(ClientError::NotInView { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_week_keeps_previous_view() {
        let (api, _) = spawn_store().await;
        let mut dashboard = Dashboard::new(api, MemoryCache::default(), View::Week(1)).await;
        dashboard.load().await.unwrap();

        let err = dashboard.set_view(View::Week(9)).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Rejected {
                status: StatusCode::BAD_REQUEST,
                ..
            }
        ));
        assert_eq!(dashboard.view(), View::Week(1));
        assert_eq!(dashboard.snapshot().dates.len(), 7);
    }

    #[tokio::test]
    async fn habit_lifecycle_reloads_snapshot() {
        let (api, _) = spawn_store().await;
        let mut dashboard = Dashboard::new(api, MemoryCache::default(), View::All).await;
        dashboard.load().await.unwrap();

        dashboard.add_habit("Yoga", Some("🧘")).await.unwrap();
        assert!(dashboard.snapshot().habit("🧘 Yoga").is_some());

        let err = dashboard.add_habit("Yoga", Some("🧘")).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Rejected {
                status: StatusCode::CONFLICT,
                ..
            }
        ));

        dashboard.edit_habit("🧘 Yoga", "Stretching", Some("🤸")).await.unwrap();
        assert!(dashboard.snapshot().habit("🧘 Yoga").is_none());
        assert!(dashboard.snapshot().habit("🤸 Stretching").is_some());

        dashboard.delete_habit("🤸 Stretching").await.unwrap();
        assert!(dashboard.snapshot().habit("🤸 Stretching").is_none());
    }

    #[tokio::test]
    async fn event_loop_refreshes_then_applies_events() {
        let (api, _) = spawn_store().await;
        let dashboard = Dashboard::new(api, MemoryCache::default(), View::All).await;
        let (events, rx) = mpsc::channel(8);
        events
            .send(DashboardEvent::Toggle {
                habit: RUNNING.into(),
                date: "05 Jan".into(),
            })
            .await
            .unwrap();
        events.send(DashboardEvent::Shutdown).await.unwrap();

        let mut renders = 0;
        let dashboard = dashboard
            .run(rx, Duration::from_secs(3600), |_| renders += 1)
            .await;

        assert_eq!(renders, 2);
        assert!(dashboard.store_stats().is_some());
        let row = dashboard.snapshot().habit(RUNNING).unwrap();
        assert_eq!(row.status("05 Jan"), StatusSymbol::Completed);
    }

    #[tokio::test]
    async fn quick_toggles_reach_store_in_click_order() {
        let (api, store) = spawn_slow_store(Duration::from_millis(300)).await;
        let mut dashboard = Dashboard::new(api, MemoryCache::default(), View::All).await;
        dashboard.load().await.unwrap();

        let first = dashboard.toggle("h", "d1").await.unwrap();
        let second = dashboard.toggle("h", "d1").await.unwrap();
        assert_eq!(first.status, StatusSymbol::Completed);
        assert_eq!(second.status, StatusSymbol::Missed);

        assert!(first.write.await.unwrap());
        assert!(second.write.await.unwrap());
        assert_eq!(
            store.applied(),
            [StatusSymbol::Completed, StatusSymbol::Missed]
        );
        let row = dashboard.snapshot().habit("h").unwrap();
        assert_eq!(row.status("d1"), StatusSymbol::Missed);
    }

    #[tokio::test]
    async fn shutdown_waits_for_queued_writes() {
        let (api, store) = spawn_slow_store(Duration::from_millis(200)).await;
        let dashboard = Dashboard::new(api, MemoryCache::default(), View::All).await;
        let (events, rx) = mpsc::channel(4);
        events
            .send(DashboardEvent::Toggle {
                habit: "h".into(),
                date: "d1".into(),
            })
            .await
            .unwrap();
        events.send(DashboardEvent::Shutdown).await.unwrap();

        let dashboard = dashboard
            .run(rx, Duration::from_secs(3600), |_| {})
            .await;

        assert_eq!(store.applied(), [StatusSymbol::Completed]);
        assert_eq!(dashboard.sync_status(), SyncStatus::Connected);
    }
}

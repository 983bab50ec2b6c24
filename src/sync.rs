//! NotificationSync: the bell's local view of a user's notifications.
//!
//! Holds `{notifications, unread_count, is_loading, last_synced_at}` for one
//! user, refreshed by a fixed-interval poller and mutated optimistically when
//! the user acknowledges notifications. The remote store is the only source
//! of truth: every successful full fetch replaces the cache wholesale.
//!
//! Failures never escape this module. Fetch errors leave the last good cache
//! in place; failed read-acknowledgements keep their optimistic state until
//! the next poll reconciles them.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::notification::Notification;
use crate::store::NotificationStore;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// What a renderer sees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSnapshot {
    /// Owner of the cached notifications. `None` until the first fetch.
    pub user_id: Option<Uuid>,
    /// Newest first, unique ids.
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub is_loading: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl SyncSnapshot {
    /// Unread count recomputed from the list, ignoring any server-reported count.
    pub fn derived_unread(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }
}

/// Counters for observing how often the cache drifts from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub polls: u64,
    pub failed_fetches: u64,
    pub unconfirmed_writes: u64,
    pub discarded_responses: u64,
}

struct Inner {
    store: Arc<dyn NotificationStore>,
    state: watch::Sender<SyncSnapshot>,
    /// Bumped on every stop/start; responses from an older generation are dropped.
    generation: AtomicU64,
    in_flight: AtomicUsize,
    active_user: Mutex<Option<Uuid>>,
    polls: AtomicU64,
    failed_fetches: AtomicU64,
    unconfirmed_writes: AtomicU64,
    discarded_responses: AtomicU64,
}

/// Marks a full fetch as in flight for as long as it lives.
struct LoadingGuard<'a> {
    inner: &'a Inner,
}

impl<'a> LoadingGuard<'a> {
    fn new(inner: &'a Inner) -> Self {
        inner.state.send_modify(|s| {
            inner.in_flight.fetch_add(1, Ordering::SeqCst);
            s.is_loading = true;
        });
        Self { inner }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let inner = self.inner;
        inner.state.send_modify(|s| {
            let remaining = inner.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            s.is_loading = remaining > 0;
        });
    }
}

impl Inner {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    fn active_user(&self) -> Option<Uuid> {
        *self
            .active_user
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_active_user(&self, user_id: Option<Uuid>) {
        *self
            .active_user
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = user_id;
    }

    /// A running session pins the cache to its user.
    fn in_scope(&self, user_id: Uuid, op: &'static str) -> bool {
        match self.active_user() {
            Some(active) if active != user_id => {
                warn!(
                    op,
                    %user_id,
                    active_user = %active,
                    "ignoring request for a user other than the active session"
                );
                false
            }
            _ => true,
        }
    }

    fn discard(&self, op: &'static str, user_id: Uuid) {
        self.discarded_responses.fetch_add(1, Ordering::Relaxed);
        debug!(op, %user_id, "discarding response from a stopped session");
    }

    fn cached_for(&self, user_id: Uuid) -> Option<SyncSnapshot> {
        let snapshot = self.state.borrow();
        (snapshot.user_id == Some(user_id)).then(|| snapshot.clone())
    }

    async fn fetch_all(&self, user_id: Uuid) -> Vec<Notification> {
        if !self.in_scope(user_id, "fetch_all") {
            return Vec::new();
        }
        let generation = self.generation();
        let _loading = LoadingGuard::new(self);

        match self.store.list(user_id).await {
            Ok(rows) => {
                let rows = normalize(rows, user_id);
                let unread = rows.iter().filter(|n| !n.is_read).count();
                // checked under the channel lock so a concurrent stop() cannot interleave
                let applied = self.state.send_if_modified(|s| {
                    if !self.is_current(generation) {
                        return false;
                    }
                    s.user_id = Some(user_id);
                    s.notifications = rows.clone();
                    s.unread_count = unread;
                    s.last_synced_at = Some(Utc::now());
                    true
                });
                if !applied {
                    self.discard("fetch_all", user_id);
                    return rows;
                }
                debug!(%user_id, total = rows.len(), unread, "notifications synced");
                rows
            }
            Err(e) => {
                self.failed_fetches.fetch_add(1, Ordering::Relaxed);
                error!(%user_id, error = %e, "failed to fetch notifications");
                self.cached_for(user_id)
                    .map(|s| s.notifications)
                    .unwrap_or_default()
            }
        }
    }

    async fn fetch_unread_count(&self, user_id: Uuid) -> usize {
        if !self.in_scope(user_id, "fetch_unread_count") {
            return 0;
        }
        let generation = self.generation();

        match self.store.unread_count(user_id).await {
            Ok(count) => {
                let count = usize::try_from(count).unwrap_or(usize::MAX);
                let mut stale = false;
                self.state.send_if_modified(|s| {
                    if !self.is_current(generation) {
                        stale = true;
                        return false;
                    }
                    if s.user_id != Some(user_id) || s.unread_count == count {
                        return false;
                    }
                    s.unread_count = count;
                    true
                });
                if stale {
                    self.discard("fetch_unread_count", user_id);
                }
                count
            }
            Err(e) => {
                self.failed_fetches.fetch_add(1, Ordering::Relaxed);
                error!(%user_id, error = %e, "failed to fetch unread count");
                self.cached_for(user_id).map(|s| s.unread_count).unwrap_or(0)
            }
        }
    }

    async fn poll_once(&self, user_id: Uuid) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        self.fetch_all(user_id).await;
    }
}

/// Drop rows that belong to someone else, drop repeated ids (first wins),
/// then order newest first. The sort is stable, so equal timestamps keep the
/// store's order.
fn normalize(rows: Vec<Notification>, user_id: Uuid) -> Vec<Notification> {
    let received = rows.len();
    let mut seen = HashSet::with_capacity(received);
    let mut rows: Vec<Notification> = rows
        .into_iter()
        .filter(|n| n.user_id == user_id && seen.insert(n.id))
        .collect();
    if rows.len() != received {
        warn!(
            %user_id,
            received,
            kept = rows.len(),
            "store returned foreign or duplicate notifications"
        );
    }
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}

/// Owner of one user's notification cache and its poller.
///
/// Construct one per UI surface. Dropping it stops polling.
pub struct NotificationSync {
    inner: Arc<Inner>,
    poll_interval: Duration,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationSync {
    /// A zero `poll_interval` is raised to one millisecond.
    pub fn new(store: Arc<dyn NotificationStore>, poll_interval: Duration) -> Self {
        let poll_interval = poll_interval.max(Duration::from_millis(1));
        let (state, _) = watch::channel(SyncSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                store,
                state,
                generation: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                active_user: Mutex::new(None),
                polls: AtomicU64::new(0),
                failed_fetches: AtomicU64::new(0),
                unconfirmed_writes: AtomicU64::new(0),
                discarded_responses: AtomicU64::new(0),
            }),
            poll_interval,
            poller: Mutex::new(None),
        }
    }

    pub fn with_default_interval(store: Arc<dyn NotificationStore>) -> Self {
        Self::new(store, DEFAULT_POLL_INTERVAL)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Change feed for renderers. Every cache mutation marks the receiver changed.
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            polls: self.inner.polls.load(Ordering::Relaxed),
            failed_fetches: self.inner.failed_fetches.load(Ordering::Relaxed),
            unconfirmed_writes: self.inner.unconfirmed_writes.load(Ordering::Relaxed),
            discarded_responses: self.inner.discarded_responses.load(Ordering::Relaxed),
        }
    }

    pub fn active_user(&self) -> Option<Uuid> {
        self.inner.active_user()
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Fetch immediately, then every `poll_interval` until `stop`.
    ///
    /// Without a user id nothing happens beyond an error log.
    pub async fn start(&self, user_id: Option<Uuid>) {
        let Some(user_id) = user_id else {
            error!("notification sync not started: no user id");
            return;
        };

        self.stop();
        self.inner.set_active_user(Some(user_id));
        self.inner.state.send_if_modified(|s| {
            if s.user_id == Some(user_id) {
                return false;
            }
            *s = SyncSnapshot {
                user_id: Some(user_id),
                is_loading: s.is_loading,
                ..SyncSnapshot::default()
            };
            true
        });

        let generation = self.inner.generation();
        self.inner.poll_once(user_id).await;

        // stop() may have run while the first fetch was pending
        if !self.inner.is_current(generation) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let period = self.poll_interval;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !inner.is_current(generation) {
                    break;
                }
                inner.poll_once(user_id).await;
            }
        });

        *self.poller.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        info!(%user_id, interval_secs = period.as_secs(), "notification polling started");
    }

    /// Cancel polling. Responses still in flight are discarded when they land.
    pub fn stop(&self) {
        self.inner.state.send_if_modified(|_| {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            false
        });
        let user_id = self.inner.active_user();
        self.inner.set_active_user(None);

        let handle = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!(user_id = ?user_id, "notification polling stopped");
        }
    }

    /// Replace the cache with the store's current list for `user_id`.
    pub async fn fetch_all(&self, user_id: Uuid) -> Vec<Notification> {
        self.inner.fetch_all(user_id).await
    }

    /// Server-side unread count. Overwrites the cached count until the next full fetch.
    pub async fn fetch_unread_count(&self, user_id: Uuid) -> usize {
        self.inner.fetch_unread_count(user_id).await
    }

    /// Re-sync now without disturbing the poller's schedule.
    pub async fn refresh(&self, user_id: Uuid) {
        tokio::join!(
            self.inner.fetch_all(user_id),
            self.inner.fetch_unread_count(user_id)
        );
    }

    pub async fn mark_as_read(&self, id: Uuid) {
        let flipped = self.inner.state.send_if_modified(|s| {
            match s.notifications.iter_mut().find(|n| n.id == id) {
                Some(n) if !n.is_read => {
                    n.is_read = true;
                    s.unread_count = s.unread_count.saturating_sub(1);
                    true
                }
                _ => false,
            }
        });
        debug!(%id, flipped, "marked notification read locally");

        if let Err(e) = self.inner.store.mark_read(id).await {
            self.inner.unconfirmed_writes.fetch_add(1, Ordering::Relaxed);
            warn!(
                %id,
                error = %e,
                "unconfirmed write: store rejected mark-as-read, cache diverges until next sync"
            );
        }
    }

    pub async fn mark_all_as_read(&self, user_id: Uuid) {
        if !self.inner.in_scope(user_id, "mark_all_as_read") {
            return;
        }

        self.inner.state.send_if_modified(|s| {
            if s.user_id != Some(user_id) {
                return false;
            }
            let changed = s.unread_count != 0 || s.notifications.iter().any(|n| !n.is_read);
            for n in s.notifications.iter_mut() {
                n.is_read = true;
            }
            s.unread_count = 0;
            changed
        });

        match self.inner.store.mark_all_read(user_id).await {
            Ok(updated) => debug!(%user_id, updated, "store marked all notifications read"),
            Err(e) => {
                self.inner.unconfirmed_writes.fetch_add(1, Ordering::Relaxed);
                warn!(
                    %user_id,
                    error = %e,
                    "unconfirmed write: store rejected mark-all-as-read, cache diverges until next sync"
                );
            }
        }
    }
}

impl Drop for NotificationSync {
    fn drop(&mut self) {
        self.stop();
    }
}

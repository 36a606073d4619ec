// Sync engine: fetch, compare, ask, apply
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::book::{lock_book, SharedBook};
use crate::models::Quote;
use crate::notify::{Notification, Notifier, DEFAULT_NOTICE_DURATION};
use crate::remote::RemoteSource;

/// Where the current cycle is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Fetching,
    Comparing,
    AwaitingResolution,
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Local and remote snapshots were identical
    NoChange,
    /// Local quotes were replaced by the remote ones
    Overwritten { count: usize },
    /// Divergence found, the user kept local quotes
    KeptLocal,
    /// Another cycle was already running; this request was dropped
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Overwrite local with remote
    Accept,
    /// Keep local, ignore remote
    Decline,
}

/// Both sides of a detected divergence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub local: Vec<Quote>,
    pub remote: Vec<Quote>,
}

/// Decides what to do when local and remote differ.
///
/// Only the current sync cycle waits on the answer; local edits keep going.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    async fn resolve(&self, divergence: &Divergence) -> Resolution;
}

/// Always take the server's version
pub struct AlwaysAccept;

#[async_trait]
impl ConflictResolver for AlwaysAccept {
    async fn resolve(&self, _divergence: &Divergence) -> Resolution {
        Resolution::Accept
    }
}

/// Always keep what we have locally
pub struct AlwaysDecline;

#[async_trait]
impl ConflictResolver for AlwaysDecline {
    async fn resolve(&self, _divergence: &Divergence) -> Resolution {
        Resolution::Decline
    }
}

/// Reconciles the local quote book with a remote source
///
/// Comparison is whole-collection and order-sensitive: quotes carry no
/// identity, so there is nothing finer to merge on. At most one cycle runs
/// at a time; a request that arrives mid-cycle gets [`SyncOutcome::Busy`].
pub struct SyncEngine {
    book: SharedBook,
    remote: Arc<dyn RemoteSource>,
    resolver: Arc<dyn ConflictResolver>,
    notifier: Arc<dyn Notifier>,
    notice_duration: Duration,
    state: Mutex<SyncState>,
}

impl SyncEngine {
    pub fn new(
        book: SharedBook,
        remote: Arc<dyn RemoteSource>,
        resolver: Arc<dyn ConflictResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            book,
            remote,
            resolver,
            notifier,
            notice_duration: DEFAULT_NOTICE_DURATION,
            state: Mutex::new(SyncState::Idle),
        }
    }

    pub fn with_notice_duration(mut self, duration: Duration) -> Self {
        self.notice_duration = duration;
        self
    }

    pub fn book(&self) -> &SharedBook {
        &self.book
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: SyncState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Claim the engine for one cycle, unless someone else already has it
    fn try_begin(&self) -> Option<CycleGuard<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != SyncState::Idle {
            return None;
        }
        *state = SyncState::Fetching;
        Some(CycleGuard { state: &self.state })
    }

    /// Run one full cycle
    pub async fn sync_now(&self) -> SyncOutcome {
        let Some(_cycle) = self.try_begin() else {
            debug!("Sync already in progress, skipping");
            return SyncOutcome::Busy;
        };

        info!("Sync started");
        let candidates = self.remote.fetch_candidates().await;
        debug!("Fetched {} candidates", candidates.len());

        // Read local state now, not before the fetch: anything added while
        // we were waiting on the network has to be part of the comparison.
        self.set_state(SyncState::Comparing);
        let local = {
            let book = lock_book(&self.book);
            if book.quotes().same_as(&candidates) {
                None
            } else {
                Some(book.snapshot())
            }
        };

        let Some(local) = local else {
            info!("Sync finished: no changes");
            return SyncOutcome::NoChange;
        };

        self.set_state(SyncState::AwaitingResolution);
        info!(
            "Divergence detected ({} local vs {} remote), awaiting resolution",
            local.len(),
            candidates.len()
        );

        let divergence = Divergence {
            local,
            remote: candidates,
        };

        match self.resolver.resolve(&divergence).await {
            Resolution::Accept => {
                let count = divergence.remote.len();
                lock_book(&self.book).replace_all(divergence.remote);
                info!("Sync finished: local quotes overwritten with {} remote quotes", count);
                self.notifier.notify(Notification::success(
                    "Quotes synced with server. Server data took precedence.",
                    self.notice_duration,
                ));
                SyncOutcome::Overwritten { count }
            }
            Resolution::Decline => {
                info!("Sync finished: kept local quotes");
                self.notifier.notify(Notification::conflict(
                    "Conflict detected. Kept local quotes; server changes were not applied.",
                    self.notice_duration,
                ));
                SyncOutcome::KeptLocal
            }
        }
    }

    /// Run a cycle every `every` until the handle is cancelled or dropped.
    ///
    /// The first cycle happens one full interval after spawning. Ticks that
    /// fall due while a cycle is still waiting on the resolver are skipped.
    pub fn spawn_periodic(self: &Arc<Self>, every: Duration) -> SyncHandle {
        let engine = Arc::clone(self);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let outcome = engine.sync_now().await;
                        debug!(?outcome, "Scheduled sync done");
                    }
                }
            }
            debug!("Periodic sync stopped");
        });

        SyncHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Puts the engine back to idle however the cycle ends
struct CycleGuard<'a> {
    state: &'a Mutex<SyncState>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = SyncState::Idle;
    }
}

/// Cancel handle for [`SyncEngine::spawn_periodic`]
pub struct SyncHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Stop scheduling new cycles. A cycle already running finishes first.
    pub async fn cancel(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::QuoteBook;
    use crate::models::seed_quotes;
    use crate::notify::{ChannelNotifier, NotificationKind};
    use crate::remote::{MockRemoteSource, SERVER_SYNC_CATEGORY};
    use crate::storage::{DurableStore, EphemeralCache};

    fn server_quotes() -> Vec<Quote> {
        vec![Quote::new("Foo", SERVER_SYNC_CATEGORY).unwrap()]
    }

    fn book() -> SharedBook {
        QuoteBook::open(DurableStore::in_memory(), EphemeralCache::session()).into_shared()
    }

    fn remote_returning(quotes: Vec<Quote>) -> MockRemoteSource {
        let mut remote = MockRemoteSource::new();
        remote
            .expect_fetch_candidates()
            .times(1)
            .returning(move || quotes.clone());
        remote
    }

    #[tokio::test]
    async fn test_identical_snapshots_are_no_change() {
        let book = book();
        let mut resolver = MockConflictResolver::new();
        resolver.expect_resolve().never();
        let (notifier, mut rx) = ChannelNotifier::channel();

        let engine = SyncEngine::new(
            book.clone(),
            Arc::new(remote_returning(seed_quotes())),
            Arc::new(resolver),
            Arc::new(notifier),
        );

        assert_eq!(engine.sync_now().await, SyncOutcome::NoChange);
        assert_eq!(lock_book(&book).snapshot(), seed_quotes());
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_resolver_sees_both_sides() {
        let mut resolver = MockConflictResolver::new();
        resolver
            .expect_resolve()
            .withf(|d| d.local == seed_quotes() && d.remote == server_quotes())
            .times(1)
            .returning(|_| Resolution::Decline);

        let engine = SyncEngine::new(
            book(),
            Arc::new(remote_returning(server_quotes())),
            Arc::new(resolver),
            Arc::new(ChannelNotifier::channel().0),
        );

        assert_eq!(engine.sync_now().await, SyncOutcome::KeptLocal);
    }

    #[tokio::test]
    async fn test_accept_overwrites_and_notifies() {
        let book = book();
        let (notifier, mut rx) = ChannelNotifier::channel();
        let engine = SyncEngine::new(
            book.clone(),
            Arc::new(remote_returning(server_quotes())),
            Arc::new(AlwaysAccept),
            Arc::new(notifier),
        )
        .with_notice_duration(Duration::from_millis(1500));

        assert_eq!(engine.sync_now().await, SyncOutcome::Overwritten { count: 1 });
        assert_eq!(lock_book(&book).snapshot(), server_quotes());
        assert_eq!(lock_book(&book).store().load_quotes(), Some(server_quotes()));

        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.kind, NotificationKind::Success);
        assert_eq!(notice.duration, Duration::from_millis(1500));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_decline_keeps_local_and_notifies() {
        let book = book();
        let (notifier, mut rx) = ChannelNotifier::channel();
        let engine = SyncEngine::new(
            book.clone(),
            Arc::new(remote_returning(server_quotes())),
            Arc::new(AlwaysDecline),
            Arc::new(notifier),
        );

        assert_eq!(engine.sync_now().await, SyncOutcome::KeptLocal);
        assert_eq!(lock_book(&book).snapshot(), seed_quotes());
        assert_eq!(rx.try_recv().unwrap().kind, NotificationKind::Conflict);
    }

    #[tokio::test]
    async fn test_empty_fetch_counts_as_divergence() {
        let mut resolver = MockConflictResolver::new();
        resolver
            .expect_resolve()
            .withf(|d| d.remote.is_empty())
            .times(1)
            .returning(|_| Resolution::Decline);

        let engine = SyncEngine::new(
            book(),
            Arc::new(remote_returning(Vec::new())),
            Arc::new(resolver),
            Arc::new(ChannelNotifier::channel().0),
        );

        assert_eq!(engine.sync_now().await, SyncOutcome::KeptLocal);
    }

    /// Holds the cycle in AwaitingResolution until released
    struct GatedResolver {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl ConflictResolver for GatedResolver {
        async fn resolve(&self, _divergence: &Divergence) -> Resolution {
            self.entered.notify_one();
            self.release.notified().await;
            Resolution::Decline
        }
    }

    #[tokio::test]
    async fn test_second_request_while_awaiting_resolution_is_busy() {
        let book = book();
        let mut remote = MockRemoteSource::new();
        remote
            .expect_fetch_candidates()
            .times(1)
            .returning(server_quotes);

        let resolver = Arc::new(GatedResolver {
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });

        let engine = Arc::new(SyncEngine::new(
            book.clone(),
            Arc::new(remote),
            resolver.clone(),
            Arc::new(ChannelNotifier::channel().0),
        ));

        let first = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.sync_now().await }
        });

        resolver.entered.notified().await;
        assert_eq!(engine.state(), SyncState::AwaitingResolution);

        // Local edits are not blocked by the pending decision
        lock_book(&book).add_quote("Written mid-sync", "Life").unwrap();

        assert_eq!(engine.sync_now().await, SyncOutcome::Busy);

        resolver.release.notify_one();
        assert_eq!(first.await.unwrap(), SyncOutcome::KeptLocal);
        assert_eq!(engine.state(), SyncState::Idle);
        assert_eq!(lock_book(&book).quotes().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sync_runs_until_cancelled() {
        let mut remote = MockRemoteSource::new();
        remote
            .expect_fetch_candidates()
            .times(3)
            .returning(seed_quotes);

        let engine = Arc::new(SyncEngine::new(
            book(),
            Arc::new(remote),
            Arc::new(AlwaysDecline),
            Arc::new(ChannelNotifier::channel().0),
        ));

        let handle = engine.spawn_periodic(Duration::from_secs(30));

        // Paused clock auto-advances while every task is idle
        tokio::time::sleep(Duration::from_secs(95)).await;
        handle.cancel().await;

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(engine.state(), SyncState::Idle);
    }
}

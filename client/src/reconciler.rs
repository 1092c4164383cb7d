//! Leaderboard reconciler.
//!
//! Keeps the published leaderboard view, the device cache and the remote
//! store consistent:
//!
//! - A submitted score goes to the remote store first (atomic best write if
//!   the store has one, otherwise read, plan, then delete and create). Any
//!   failure falls back to the device cache and queues the score for sync.
//! - Loads and change notifications reduce remote rows, overlay scores still
//!   waiting for sync, and refresh the cache.
//! - Every result is stamped with a sequence number when it is issued; the
//!   view never moves back to an older one.
//!
//! Without an atomic best write, two clients improving the same player at
//! the same time can both read the old row and both create a new one. The
//! reduction still shows the higher score and the next improvement deletes
//! every row of that player.

use crate::config::ReconcilerConfig;
use crate::error::RemoteError;
use crate::local::{KeyValueStore, LocalStore};
use crate::remote::{with_timeout, RemoteStore, SubscribeOptions};
use crate::supervisor::{ConnectionState, ConnectionStatus, ConnectionSupervisor};
use futures::StreamExt;
use snakeboard_engine::{
    reconcile, Leaderboard, OrderKey, PlayerName, RemoteRow, Score, ScoreRecord, SequenceCounter,
    Sequenced, SubmitOutcome, ViewOrigin, WritePlan,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// The published leaderboard with the sequence number that produced it.
pub type LeaderboardView = Sequenced<Leaderboard>;

/// Result of a score submission. Submissions never fail outright: when the
/// remote store is unavailable the score is kept on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResult {
    /// The remote store recorded (or already had a better) score.
    Synced(SubmitOutcome),
    /// Saved to the device cache; queued for sync.
    RemoteUnavailable {
        local: SubmitOutcome,
        reason: RemoteError,
    },
}

impl SubmitResult {
    pub fn outcome(&self) -> SubmitOutcome {
        match self {
            SubmitResult::Synced(outcome) => *outcome,
            SubmitResult::RemoteUnavailable { local, .. } => *local,
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SubmitResult::Synced(_))
    }

    /// Message for the game-over screen.
    pub fn message(&self) -> String {
        match self {
            SubmitResult::Synced(SubmitOutcome::Created) => "Score saved online!".to_string(),
            SubmitResult::Synced(SubmitOutcome::Improved { previous }) => {
                format!("New personal best! Previous best was {previous}.")
            }
            SubmitResult::Synced(SubmitOutcome::NotImproved { best }) => {
                format!("Your best score is still {best}.")
            }
            SubmitResult::RemoteUnavailable { local, .. } if local.changed() => {
                "Score saved locally. It will sync when the connection returns.".to_string()
            }
            SubmitResult::RemoteUnavailable { .. } => {
                "Offline. Your best score is unchanged.".to_string()
            }
        }
    }
}

/// Handle to a change subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// False once cancelled, superseded, or given up after reconnects.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct Inner<R, K> {
    remote: R,
    local: LocalStore<K>,
    supervisor: ConnectionSupervisor,
    config: ReconcilerConfig,
    view: watch::Sender<LeaderboardView>,
    sequence: Mutex<SequenceCounter>,
    subscription: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
    /// Cleared once the store answers that it has no atomic best write,
    /// set again by an explicit reconnect
    atomic_writes: AtomicBool,
    retry_scheduled: AtomicBool,
    syncing: AtomicBool,
    following: AtomicBool,
}

/// Offline-first leaderboard sync. Clones share state.
pub struct Reconciler<R, K> {
    inner: Arc<Inner<R, K>>,
}

impl<R, K> Clone for Reconciler<R, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

impl<R: RemoteStore, K: KeyValueStore> Reconciler<R, K> {
    /// Create a reconciler. The view starts from the device cache, or from
    /// the configured default dataset when the cache is empty.
    pub fn new(remote: R, kv: K, config: ReconcilerConfig) -> Self {
        let local = LocalStore::new(kv);
        let mut sequence = SequenceCounter::new();

        let cached = local.get();
        let initial = if !cached.is_empty() {
            Sequenced::new(sequence.next(), ViewOrigin::Cache, cached)
        } else if let Some(seed) = config.default_dataset.clone().filter(|b| !b.is_empty()) {
            Sequenced::new(sequence.next(), ViewOrigin::Seed, seed)
        } else {
            Sequenced::default()
        };
        let (view, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                remote,
                local,
                supervisor: ConnectionSupervisor::new(config.supervisor.clone()),
                config,
                view,
                sequence: Mutex::new(sequence),
                subscription: Mutex::new(None),
                shutdown: CancellationToken::new(),
                atomic_writes: AtomicBool::new(true),
                retry_scheduled: AtomicBool::new(false),
                syncing: AtomicBool::new(false),
                following: AtomicBool::new(false),
            }),
        }
    }

    pub fn remote(&self) -> &R {
        &self.inner.remote
    }

    pub fn local(&self) -> &LocalStore<K> {
        &self.inner.local
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn leaderboard(&self) -> Leaderboard {
        self.inner.view.borrow().value.clone()
    }

    pub fn view(&self) -> LeaderboardView {
        self.inner.view.borrow().clone()
    }

    /// Observe every published view.
    pub fn watch(&self) -> watch::Receiver<LeaderboardView> {
        self.inner.view.subscribe()
    }

    /// Top score of the current view.
    pub fn high_score(&self) -> Option<Score> {
        self.inner.view.borrow().value.high_score()
    }

    /// Scores saved locally and not yet confirmed by the remote store.
    pub fn pending(&self) -> Vec<ScoreRecord> {
        self.inner.local.pending()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.supervisor.state()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.supervisor.status()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.supervisor.watch()
    }

    pub fn status_text(&self) -> &'static str {
        self.connection_state().status_text()
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    /// Connect to the remote store, follow its connectivity signal, flush
    /// pending scores and load the leaderboard.
    pub async fn start(&self) -> ConnectionState {
        self.spawn_connectivity_follower();
        let state = self
            .inner
            .supervisor
            .connect(&self.inner.remote, &self.inner.config.collection)
            .await;
        if state == ConnectionState::Connected {
            self.sync_pending().await;
            self.load_leaderboard(true).await;
        }
        state
    }

    /// Explicit reconnect; resets the automatic retry budget.
    pub async fn reconnect(&self) -> ConnectionState {
        let state = self
            .inner
            .supervisor
            .reconnect(&self.inner.remote, &self.inner.config.collection)
            .await;
        if state == ConnectionState::Connected {
            // The store may have gained an atomic best write since a
            // previous submit fell back to read-then-write.
            self.inner.atomic_writes.store(true, Ordering::SeqCst);
            self.sync_pending().await;
        }
        state
    }

    /// Stop background tasks and the active subscription.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        if let Some(token) = lock(&self.inner.subscription).take() {
            token.cancel();
        }
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Validate a raw player name and submit the final score of a game.
    pub async fn on_game_over(
        &self,
        player_name: &str,
        score: Score,
    ) -> Result<SubmitResult, snakeboard_engine::Error> {
        let name = PlayerName::parse(player_name)?;
        Ok(self.submit_score(&name, score).await)
    }

    /// Submit a score with the create-or-improve rule.
    pub async fn submit_score(&self, name: &PlayerName, score: Score) -> SubmitResult {
        let candidate = ScoreRecord::new(name.clone(), score, now_millis());

        let state = self.connection_state();
        if !state.allows_remote() {
            let reason = RemoteError::Unreachable(format!("connection {state}"));
            return self.save_locally(candidate, reason, false);
        }

        match self.submit_bounded(&candidate).await {
            Ok(outcome) => {
                tracing::info!(player = %name, score, ?outcome, "Score synced");
                self.confirm(&candidate, outcome);
                SubmitResult::Synced(outcome)
            }
            Err(reason) => self.save_locally(candidate, reason, true),
        }
    }

    /// Submit every queued offline score. Returns how many were synced.
    pub async fn sync_pending(&self) -> usize {
        if self.inner.syncing.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let synced = self.sync_pending_inner().await;
        self.inner.syncing.store(false, Ordering::SeqCst);
        synced
    }

    async fn sync_pending_inner(&self) -> usize {
        let pending = self.inner.local.pending();
        if pending.is_empty() || !self.connection_state().allows_remote() {
            return 0;
        }

        tracing::info!(count = pending.len(), "Syncing pending scores");
        let mut synced = 0;
        for record in pending {
            match self.submit_bounded(&record).await {
                Ok(outcome) => {
                    self.confirm(&record, outcome);
                    synced += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Pending sync interrupted");
                    self.schedule_retry();
                    break;
                }
            }
        }
        synced
    }

    /// Remote submission bounded by the whole-submit timeout.
    async fn submit_bounded(&self, candidate: &ScoreRecord) -> Result<SubmitOutcome, RemoteError> {
        let result = with_timeout(
            "submit",
            self.inner.config.submit_timeout,
            self.submit_remote(candidate),
        )
        .await;
        if let Err(e) = &result {
            if matches!(e, RemoteError::Timeout { operation: "submit", .. }) {
                self.inner.supervisor.record_failure(e);
            }
        }
        result
    }

    async fn submit_remote(&self, candidate: &ScoreRecord) -> Result<SubmitOutcome, RemoteError> {
        let remote = &self.inner.remote;
        let collection = self.inner.config.collection.as_str();
        let supervisor = &self.inner.supervisor;

        if self.inner.atomic_writes.load(Ordering::SeqCst) {
            let write = self
                .step("submit_best", remote.submit_best(collection, candidate.to_new_row()))
                .await
                .inspect_err(|e| supervisor.record_failure(e))?;
            match write {
                Some(write) => {
                    supervisor.record_success();
                    return Ok(write.outcome);
                }
                None => {
                    tracing::debug!("Remote store has no atomic best write; using read-then-write");
                    self.inner.atomic_writes.store(false, Ordering::SeqCst);
                }
            }
        }

        let rows = self
            .step("read", remote.read(collection))
            .await
            .inspect_err(|e| supervisor.record_failure(e))?;
        supervisor.record_success();

        let plan = reconcile::plan_remote_write(&rows, candidate);
        match &plan {
            WritePlan::Skip { best } => {
                tracing::debug!(player = %candidate.name, best, "Remote best not beaten; no write");
            }
            WritePlan::Create => {
                self.step("create", remote.create(collection, candidate.to_new_row()))
                    .await
                    .inspect_err(|e| supervisor.record_degraded(e))?;
            }
            WritePlan::Replace { stale, .. } => {
                // A failure after the deletes leaves no row for the player;
                // the queued local copy restores it on the next sync.
                for id in stale {
                    self.step("delete", remote.delete(collection, id))
                        .await
                        .inspect_err(|e| supervisor.record_degraded(e))?;
                }
                self.step("create", remote.create(collection, candidate.to_new_row()))
                    .await
                    .inspect_err(|e| supervisor.record_degraded(e))?;
            }
        }
        Ok(plan.outcome())
    }

    async fn step<T>(
        &self,
        operation: &'static str,
        call: impl std::future::Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        with_timeout(operation, self.inner.config.step_timeout, call).await
    }

    /// Publish a remotely confirmed score and settle matching queued scores.
    fn confirm(&self, candidate: &ScoreRecord, outcome: SubmitOutcome) {
        // A rejected candidate shows the remote best, which another writer
        // may have raised since the view was last loaded.
        let shown = match outcome {
            SubmitOutcome::NotImproved { best } => {
                ScoreRecord::new(candidate.name.clone(), best, candidate.timestamp)
            }
            _ => candidate.clone(),
        };
        let seq = self.next_seq();
        let mut board = self.leaderboard();
        reconcile::apply_candidate(&mut board, &shown);
        if self.publish(seq, ViewOrigin::LocalWrite, board.clone()) {
            self.persist(&board);
        }

        let confirmed = shown.score.max(candidate.score);
        let settled: Vec<ScoreRecord> = self
            .inner
            .local
            .pending()
            .into_iter()
            .filter(|r| r.name == candidate.name && r.score <= confirmed)
            .collect();
        if let Err(e) = self.inner.local.remove_pending(&settled) {
            tracing::warn!(error = %e, "Failed to update pending scores");
        }
    }

    /// Apply the score to the device cache and queue it for sync.
    fn save_locally(
        &self,
        candidate: ScoreRecord,
        reason: RemoteError,
        attempted: bool,
    ) -> SubmitResult {
        tracing::warn!(
            player = %candidate.name,
            score = candidate.score,
            error = %reason,
            "Remote store unavailable; saving score locally"
        );

        let seq = self.next_seq();
        let mut board = self.inner.local.get();
        if board.is_empty() {
            let view = self.view();
            if view.origin == ViewOrigin::Seed {
                board = view.value;
            }
        }

        let outcome = reconcile::apply_candidate(&mut board, &candidate);
        self.persist(&board);
        if outcome.changed() {
            if let Err(e) = self.inner.local.push_pending(candidate) {
                tracing::warn!(error = %e, "Failed to queue score for sync");
            }
        }
        self.publish(seq, ViewOrigin::LocalWrite, board);

        if attempted {
            self.schedule_retry();
        }
        SubmitResult::RemoteUnavailable {
            local: outcome,
            reason,
        }
    }

    // ------------------------------------------------------------------
    // Loading and subscriptions
    // ------------------------------------------------------------------

    /// Refresh the leaderboard from the remote store.
    ///
    /// Returns the cached view when the store is unreachable, or when a
    /// live subscription already keeps the view current and `force_remote`
    /// is false.
    pub async fn load_leaderboard(&self, force_remote: bool) -> Leaderboard {
        let state = self.connection_state();
        if !state.allows_remote() || (self.subscription_active() && !force_remote) {
            return self.leaderboard();
        }

        let seq = self.next_seq();
        let collection = self.inner.config.collection.as_str();
        match self
            .step("read", self.inner.remote.read_ordered(collection, OrderKey::Score))
            .await
        {
            Ok(rows) => {
                self.inner.supervisor.record_success();
                self.apply_remote(seq, &rows);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load leaderboard; showing cached view");
                self.inner.supervisor.record_failure(&e);
                self.schedule_retry();
            }
        }
        self.leaderboard()
    }

    /// Deliver the leaderboard to `callback` on every remote change.
    ///
    /// A new subscription replaces the previous one. After a stream error
    /// the subscription reconnects within the retry budget.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&Leaderboard) + Send + 'static,
    {
        let token = self.inner.shutdown.child_token();
        if let Some(previous) = lock(&self.inner.subscription).replace(token.clone()) {
            previous.cancel();
        }

        let this = self.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            this.run_subscription(&task_token, callback).await;
            task_token.cancel();
        });

        Subscription { token }
    }

    fn subscription_active(&self) -> bool {
        lock(&self.inner.subscription)
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    async fn run_subscription<F>(&self, token: &CancellationToken, mut callback: F)
    where
        F: FnMut(&Leaderboard) + Send + 'static,
    {
        let collection = self.inner.config.collection.as_str();
        loop {
            let opened = tokio::select! {
                _ = token.cancelled() => return,
                opened = self.step(
                    "subscribe",
                    self.inner.remote.subscribe(collection, SubscribeOptions::default()),
                ) => opened,
            };

            match opened {
                Ok(mut changes) => loop {
                    let event = tokio::select! {
                        _ = token.cancelled() => return,
                        event = changes.next() => event,
                    };
                    match event {
                        Some(Ok(rows)) => {
                            let seq = self.next_seq();
                            self.inner.supervisor.record_success();
                            self.apply_remote(seq, &rows);
                            callback(&self.leaderboard());
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Change stream failed");
                            self.inner.supervisor.record_stream_error(&e);
                            break;
                        }
                        None => {
                            let e = RemoteError::Unreachable("change stream closed".into());
                            self.inner.supervisor.record_stream_error(&e);
                            break;
                        }
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to subscribe to remote changes");
                    self.inner.supervisor.record_failure(&e);
                }
            }

            if !self.recover(token).await {
                tracing::warn!("Stopping change subscription; remote store unreachable");
                return;
            }
        }
    }

    /// Wait for the supervisor's automatic retry. True if reconnected.
    async fn recover(&self, token: &CancellationToken) -> bool {
        let state = tokio::select! {
            _ = token.cancelled() => return false,
            state = self
                .inner
                .supervisor
                .retry(&self.inner.remote, &self.inner.config.collection) => state,
        };
        if state != ConnectionState::Connected {
            return false;
        }
        self.sync_pending().await;
        true
    }

    /// Reduce remote rows, overlay unsynced scores, publish and cache.
    fn apply_remote(&self, seq: u64, rows: &[RemoteRow]) -> bool {
        let remote = reconcile::reduce_rows(rows);
        let (settled, open) = reconcile::partition_pending(&remote, self.inner.local.pending());
        if let Err(e) = self.inner.local.remove_pending(&settled) {
            tracing::warn!(error = %e, "Failed to update pending scores");
        }

        let board = reconcile::merge_pending(&remote, &open);
        let accepted = self.publish(seq, ViewOrigin::Remote, board.clone());
        if accepted {
            self.persist(&board);
        }
        accepted
    }

    // ------------------------------------------------------------------
    // Background work
    // ------------------------------------------------------------------

    /// Start the supervisor's automatic retry unless one is running or the
    /// budget is spent. Pending scores are flushed once it reconnects.
    fn schedule_retry(&self) {
        if !self.inner.supervisor.can_auto_retry()
            || self.inner.retry_scheduled.swap(true, Ordering::SeqCst)
        {
            return;
        }

        let this = self.clone();
        tokio::spawn(async move {
            let shutdown = this.inner.shutdown.clone();
            let state = tokio::select! {
                _ = shutdown.cancelled() => None,
                state = this
                    .inner
                    .supervisor
                    .retry(&this.inner.remote, &this.inner.config.collection) => Some(state),
            };
            this.inner.retry_scheduled.store(false, Ordering::SeqCst);
            if state == Some(ConnectionState::Connected) {
                this.sync_pending().await;
            }
        });
    }

    fn spawn_connectivity_follower(&self) {
        if self.inner.following.swap(true, Ordering::SeqCst) {
            return;
        }

        let this = self.clone();
        tokio::spawn(async move {
            let shutdown = this.inner.shutdown.clone();
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = this.follow_connectivity() => {}
            }
            this.inner.following.store(false, Ordering::SeqCst);
        });
    }

    /// Follow the store's connectivity signal, re-opening it with backoff
    /// whenever it fails to open or ends.
    async fn follow_connectivity(&self) {
        let mut last = None;
        let mut reopens: u32 = 0;
        loop {
            match self.inner.remote.connectivity().await {
                Ok(mut signal) => {
                    while let Some(online) = signal.next().await {
                        tracing::debug!(online, "Connectivity signal");
                        self.inner.supervisor.record_connectivity(online);
                        if online {
                            reopens = 0;
                            if last == Some(false) {
                                self.sync_pending().await;
                            }
                        }
                        last = Some(online);
                    }
                    tracing::debug!("Connectivity signal ended");
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Failed to open connectivity signal");
                    last = Some(false);
                }
            }

            reopens = reopens.saturating_add(1);
            let delay = self.inner.config.supervisor.backoff.delay(reopens);
            tokio::time::sleep(delay).await;
        }
    }

    // ------------------------------------------------------------------
    // View bookkeeping
    // ------------------------------------------------------------------

    fn next_seq(&self) -> u64 {
        lock(&self.inner.sequence).next()
    }

    /// Publish unless a newer result is already showing.
    fn publish(&self, seq: u64, origin: ViewOrigin, board: Leaderboard) -> bool {
        let accepted = self
            .inner
            .view
            .send_if_modified(|view| view.replace_if_newer(Sequenced::new(seq, origin, board)));
        if !accepted {
            tracing::debug!(seq, ?origin, "Discarding stale leaderboard result");
        }
        accepted
    }

    fn persist(&self, board: &Leaderboard) {
        if let Err(e) = self.inner.local.set(board) {
            tracing::warn!(error = %e, "Failed to write leaderboard cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::MemoryKv;
    use crate::remote::MemoryRemote;

    fn reconciler() -> (Reconciler<MemoryRemote, MemoryKv>, MemoryRemote) {
        let remote = MemoryRemote::new();
        let reconciler = Reconciler::new(remote.clone(), MemoryKv::new(), ReconcilerConfig::default());
        (reconciler, remote)
    }

    #[test]
    fn submit_result_messages() {
        assert_eq!(
            SubmitResult::Synced(SubmitOutcome::Created).message(),
            "Score saved online!"
        );
        assert_eq!(
            SubmitResult::Synced(SubmitOutcome::Improved { previous: 120 }).message(),
            "New personal best! Previous best was 120."
        );
        let offline = SubmitResult::RemoteUnavailable {
            local: SubmitOutcome::Created,
            reason: RemoteError::Unreachable("down".into()),
        };
        assert!(!offline.is_synced());
        assert_eq!(offline.outcome(), SubmitOutcome::Created);
        assert!(offline.message().contains("saved locally"));
    }

    #[tokio::test]
    async fn starts_empty_and_disconnected() {
        let (reconciler, _) = reconciler();
        assert!(reconciler.leaderboard().is_empty());
        assert_eq!(reconciler.view().origin, ViewOrigin::Empty);
        assert_eq!(reconciler.status_text(), "Not connected");
        assert_eq!(reconciler.high_score(), None);
    }

    #[tokio::test]
    async fn rejects_blank_names_before_any_io() {
        let (reconciler, remote) = reconciler();
        reconciler.start().await;
        let before = remote.calls();

        let err = reconciler.on_game_over("   ", 10).await.unwrap_err();
        assert_eq!(err, snakeboard_engine::Error::EmptyPlayerName);
        assert_eq!(remote.calls(), before);
    }

    #[tokio::test]
    async fn trims_player_names() {
        let (reconciler, remote) = reconciler();
        reconciler.start().await;

        let result = reconciler.on_game_over("  Alex  ", 150).await.unwrap();
        assert_eq!(result, SubmitResult::Synced(SubmitOutcome::Created));
        assert_eq!(remote.rows("scores")[0].player_name, "Alex");
    }

    #[tokio::test]
    async fn disconnected_submit_skips_remote() {
        let (reconciler, remote) = reconciler();
        let name = PlayerName::parse("Alex").unwrap();

        let result = reconciler.submit_score(&name, 50).await;
        assert!(matches!(
            result,
            SubmitResult::RemoteUnavailable {
                local: SubmitOutcome::Created,
                ..
            }
        ));
        assert_eq!(remote.calls(), Default::default());
        assert_eq!(reconciler.pending().len(), 1);
    }

    #[tokio::test]
    async fn default_dataset_only_at_cold_start() {
        let seed = Leaderboard::from_records(vec![ScoreRecord::new(
            PlayerName::parse("Demo").unwrap(),
            10,
            0,
        )]);
        let config = ReconcilerConfig {
            default_dataset: Some(seed.clone()),
            ..ReconcilerConfig::default()
        };

        let cold = Reconciler::new(MemoryRemote::new(), MemoryKv::new(), config.clone());
        assert_eq!(cold.view().origin, ViewOrigin::Seed);
        assert_eq!(cold.leaderboard(), seed);

        let kv = MemoryKv::new();
        LocalStore::new(kv.clone())
            .set(&Leaderboard::from_records(vec![ScoreRecord::new(
                PlayerName::parse("Alex").unwrap(),
                150,
                0,
            )]))
            .unwrap();
        let warm = Reconciler::new(MemoryRemote::new(), kv, config);
        assert_eq!(warm.view().origin, ViewOrigin::Cache);
        assert_eq!(warm.leaderboard().len(), 1);
        assert_eq!(warm.high_score(), Some(150));
    }

    #[tokio::test]
    async fn shutdown_cancels_subscription() {
        let (reconciler, _) = reconciler();
        reconciler.start().await;
        let subscription = reconciler.subscribe(|_| {});
        assert!(subscription.is_active());
        reconciler.shutdown();
        assert!(!subscription.is_active());
    }
}

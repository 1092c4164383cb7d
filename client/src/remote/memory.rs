//! In-process remote store.
//!
//! Behaves like the hosted store (append-only ids, full-snapshot change
//! notifications, a connectivity signal) and adds knobs for exercising
//! the sync paths: simulated latency, an online switch, scripted failures,
//! per-operation call counts and an optional atomic best-score write.

use super::{ChangeStream, ConnectivityStream, RemoteStore, SubscribeOptions};
use crate::error::RemoteError;
use futures::stream::{self, StreamExt};
use snakeboard_engine::{reconcile, BestWrite, NewRow, OrderKey, RemoteRow, RowId, WritePlan};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Remote operations that can be counted or made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    Read,
    Subscribe,
    Create,
    Delete,
    SubmitBest,
}

/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub reads: usize,
    pub subscribes: usize,
    pub creates: usize,
    pub deletes: usize,
    pub best_writes: usize,
}

impl CallCounts {
    /// Calls that changed or could have changed stored rows.
    pub fn mutations(&self) -> usize {
        self.creates + self.deletes + self.best_writes
    }
}

#[derive(Debug, Clone)]
enum Event {
    Changed {
        collection: String,
        rows: Vec<RemoteRow>,
    },
    Lost,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, Vec<RemoteRow>>,
    next_id: u64,
    latency: Duration,
    atomic_best: bool,
    failures: VecDeque<(RemoteOp, RemoteError)>,
    calls: CallCounts,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    events: broadcast::Sender<Event>,
    online: watch::Sender<bool>,
}

/// In-process remote store. Clones share the same rows.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    shared: Arc<Shared>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        let (online, _) = watch::channel(true);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                events,
                online,
            }),
        }
    }

    /// Delay applied to every operation before it takes effect.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Enable the atomic best-score write.
    pub fn set_atomic_best(&self, enabled: bool) {
        self.lock().atomic_best = enabled;
    }

    /// Switch reachability. Going offline ends every open change stream
    /// with an error.
    pub fn set_online(&self, online: bool) {
        let changed = self.shared.online.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        if changed && !online {
            let _ = self.shared.events.send(Event::Lost);
        }
    }

    pub fn is_online(&self) -> bool {
        *self.shared.online.borrow()
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        self.lock().failures.push_back((op, error));
    }

    /// Insert a row with a caller-chosen id, as another writer would.
    pub fn insert_row(&self, collection: &str, row: RemoteRow) {
        let rows = {
            let mut state = self.lock();
            let rows = state.collections.entry(collection.to_string()).or_default();
            rows.push(row);
            rows.clone()
        };
        self.notify(collection, rows);
    }

    /// Current rows of a collection in storage order.
    pub fn rows(&self, collection: &str) -> Vec<RemoteRow> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, collection: &str, rows: Vec<RemoteRow>) {
        // No subscribers is fine.
        let _ = self.shared.events.send(Event::Changed {
            collection: collection.to_string(),
            rows,
        });
    }

    /// Count the call, then check reachability and scripted failures.
    /// Returns the latency the caller should apply.
    fn enter(&self, op: RemoteOp) -> Result<Duration, RemoteError> {
        let mut state = self.lock();
        let calls = &mut state.calls;
        match op {
            RemoteOp::Read => calls.reads += 1,
            RemoteOp::Subscribe => calls.subscribes += 1,
            RemoteOp::Create => calls.creates += 1,
            RemoteOp::Delete => calls.deletes += 1,
            RemoteOp::SubmitBest => calls.best_writes += 1,
        }

        if !*self.shared.online.borrow() {
            return Err(RemoteError::Unreachable("remote store is offline".into()));
        }
        if let Some(pos) = state.failures.iter().position(|(o, _)| *o == op) {
            if let Some((_, error)) = state.failures.remove(pos) {
                return Err(error);
            }
        }
        Ok(state.latency)
    }

    fn append(state: &mut State, collection: &str, row: NewRow) -> (RowId, Vec<RemoteRow>) {
        state.next_id += 1;
        let id = RowId::new(format!("row-{}", state.next_id));
        let rows = state.collections.entry(collection.to_string()).or_default();
        rows.push(row.into_row(id.clone()));
        (id, rows.clone())
    }
}

async fn delay(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

impl RemoteStore for MemoryRemote {
    // Reads see the rows as of the request; writes land after the delay.
    async fn read(&self, collection: &str) -> Result<Vec<RemoteRow>, RemoteError> {
        let latency = self.enter(RemoteOp::Read)?;
        let rows = self.rows(collection);
        delay(latency).await;
        Ok(rows)
    }

    async fn read_ordered(
        &self,
        collection: &str,
        order: OrderKey,
    ) -> Result<Vec<RemoteRow>, RemoteError> {
        let latency = self.enter(RemoteOp::Read)?;
        let mut rows = self.rows(collection);
        order.sort(&mut rows);
        delay(latency).await;
        Ok(rows)
    }

    async fn subscribe(
        &self,
        collection: &str,
        options: SubscribeOptions,
    ) -> Result<ChangeStream, RemoteError> {
        delay(self.enter(RemoteOp::Subscribe)?).await;

        // Subscribe before reading so no change falls between the two.
        let receiver = self.shared.events.subscribe();
        let initial = self.rows(collection);
        let first = stream::once(async move { Ok(initial) });
        if options.once {
            return Ok(first.boxed());
        }

        let collection = collection.to_string();
        let changes = stream::unfold(Some(receiver), move |receiver| {
            let collection = collection.clone();
            async move {
                let mut receiver = receiver?;
                loop {
                    match receiver.recv().await {
                        Ok(Event::Changed { collection: c, rows }) if c == collection => {
                            return Some((Ok(rows), Some(receiver)));
                        }
                        Ok(Event::Changed { .. }) => continue,
                        // Every event is a full snapshot; skipping is safe.
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Ok(Event::Lost) => {
                            let error = RemoteError::Unreachable("connection lost".into());
                            return Some((Err(error), None));
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(first.chain(changes).boxed())
    }

    async fn create(&self, collection: &str, row: NewRow) -> Result<RowId, RemoteError> {
        delay(self.enter(RemoteOp::Create)?).await;
        let (id, rows) = Self::append(&mut self.lock(), collection, row);
        self.notify(collection, rows);
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &RowId) -> Result<(), RemoteError> {
        delay(self.enter(RemoteOp::Delete)?).await;
        let rows = {
            let mut state = self.lock();
            let Some(rows) = state.collections.get_mut(collection) else {
                return Ok(());
            };
            let before = rows.len();
            rows.retain(|row| &row.row_id != id);
            if rows.len() == before {
                return Ok(());
            }
            rows.clone()
        };
        self.notify(collection, rows);
        Ok(())
    }

    async fn connectivity(&self) -> Result<ConnectivityStream, RemoteError> {
        let receiver = self.shared.online.subscribe();
        let signal = stream::unfold((receiver, true), |(mut receiver, first)| async move {
            if !first {
                receiver.changed().await.ok()?;
            }
            let online = *receiver.borrow_and_update();
            Some((online, (receiver, false)))
        });
        Ok(signal.boxed())
    }

    async fn submit_best(
        &self,
        collection: &str,
        row: NewRow,
    ) -> Result<Option<BestWrite>, RemoteError> {
        if !self.lock().atomic_best {
            return Ok(None);
        }
        delay(self.enter(RemoteOp::SubmitBest)?).await;

        let (write, rows) = {
            let mut state = self.lock();
            let current = state
                .collections
                .get(collection)
                .cloned()
                .unwrap_or_default();
            let plan = reconcile::plan_remote_write(&current, &row.to_record());
            let outcome = plan.outcome();
            let removed = match plan {
                WritePlan::Skip { .. } => None,
                WritePlan::Create => Some(Vec::new()),
                WritePlan::Replace { stale, .. } => Some(stale),
            };
            match removed {
                None => (
                    BestWrite {
                        outcome,
                        row_id: None,
                        removed: Vec::new(),
                    },
                    None,
                ),
                Some(removed) => {
                    if let Some(rows) = state.collections.get_mut(collection) {
                        rows.retain(|r| !removed.contains(&r.row_id));
                    }
                    let (id, rows) = Self::append(&mut state, collection, row);
                    (
                        BestWrite {
                            outcome,
                            row_id: Some(id),
                            removed,
                        },
                        Some(rows),
                    )
                }
            }
        };

        if let Some(rows) = rows {
            self.notify(collection, rows);
        }
        Ok(Some(write))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snakeboard_engine::{PlayerName, SubmitOutcome};

    fn new_row(player: &str, score: u64) -> NewRow {
        NewRow {
            player_name: PlayerName::parse(player).unwrap(),
            score,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn create_read_delete() {
        let remote = MemoryRemote::new();
        let id = remote.create("scores", new_row("Alex", 150)).await.unwrap();
        remote.create("scores", new_row("Maya", 120)).await.unwrap();

        let rows = remote.read("scores").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_id, id);

        remote.delete("scores", &id).await.unwrap();
        // Deleting twice is fine.
        remote.delete("scores", &id).await.unwrap();
        assert_eq!(remote.rows("scores").len(), 1);
        assert_eq!(remote.calls().deletes, 2);
    }

    #[tokio::test]
    async fn read_ordered_sorts_descending() {
        let remote = MemoryRemote::new();
        remote.insert_row("scores", RemoteRow::new("a", "Sam", 90, 3));
        remote.insert_row("scores", RemoteRow::new("b", "Alex", 150, 1));

        let rows = remote.read_ordered("scores", OrderKey::Score).await.unwrap();
        assert_eq!(rows[0].player_name, "Alex");

        let rows = remote
            .read_ordered("scores", OrderKey::Timestamp)
            .await
            .unwrap();
        assert_eq!(rows[0].player_name, "Sam");
    }

    #[tokio::test]
    async fn offline_store_is_unreachable() {
        let remote = MemoryRemote::new();
        remote.set_online(false);
        let err = remote.read("scores").await.unwrap_err();
        assert!(matches!(err, RemoteError::Unreachable(_)));
        assert_eq!(remote.calls().reads, 1);
    }

    #[tokio::test]
    async fn scripted_failure_applies_once() {
        let remote = MemoryRemote::new();
        remote.fail_next(RemoteOp::Create, RemoteError::Transport("reset".into()));

        assert!(remote.create("scores", new_row("Alex", 1)).await.is_err());
        assert!(remote.create("scores", new_row("Alex", 1)).await.is_ok());
    }

    #[tokio::test]
    async fn subscription_delivers_snapshots() {
        let remote = MemoryRemote::new();
        remote.insert_row("scores", RemoteRow::new("a", "Alex", 150, 0));

        let mut stream = remote
            .subscribe("scores", SubscribeOptions::default())
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 1);

        remote.create("other", new_row("Maya", 5)).await.unwrap();
        remote.create("scores", new_row("Maya", 120)).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 2);

        remote.set_online(false);
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn subscribe_once_ends_after_current_contents() {
        let remote = MemoryRemote::new();
        let mut stream = remote
            .subscribe("scores", SubscribeOptions { once: true })
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), Vec::new());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn connectivity_reports_changes() {
        let remote = MemoryRemote::new();
        let mut signal = remote.connectivity().await.unwrap();
        assert_eq!(signal.next().await, Some(true));

        remote.set_online(false);
        assert_eq!(signal.next().await, Some(false));
        remote.set_online(true);
        assert_eq!(signal.next().await, Some(true));
    }

    #[tokio::test]
    async fn atomic_best_write() {
        let remote = MemoryRemote::new();
        assert_eq!(
            remote.submit_best("scores", new_row("Alex", 1)).await,
            Ok(None)
        );

        remote.set_atomic_best(true);
        remote.insert_row("scores", RemoteRow::new("1", "Alex", 150, 0));
        remote.insert_row("scores", RemoteRow::new("2", "Alex", 90, 0));

        let write = remote
            .submit_best("scores", new_row("Alex", 100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(write.outcome, SubmitOutcome::NotImproved { best: 150 });
        assert_eq!(remote.rows("scores").len(), 2);

        let write = remote
            .submit_best("scores", new_row("Alex", 200))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(write.outcome, SubmitOutcome::Improved { previous: 150 });
        assert_eq!(write.removed.len(), 2);
        let rows = remote.rows("scores");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, 200);
        assert_eq!(Some(rows[0].row_id.clone()), write.row_id);
    }
}

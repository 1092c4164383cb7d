//! Remote store abstraction.
//!
//! The remote store is a shared collection of score rows that many clients
//! write to. It offers appends, deletes, full reads and a change stream. It
//! may optionally offer an atomic best-score write; stores that do not
//! return `None` and the reconciler falls back to read, plan, then mutate.

mod http;
mod memory;

pub use http::HttpRemote;
pub use memory::{CallCounts, MemoryRemote, RemoteOp};

use crate::error::RemoteError;
use futures::stream::BoxStream;
use futures::StreamExt;
use snakeboard_engine::{BestWrite, NewRow, OrderKey, RemoteRow, RowId};
use std::future::Future;
use std::time::Duration;

/// Full contents of a collection, delivered on every change.
pub type ChangeStream = BoxStream<'static, Result<Vec<RemoteRow>, RemoteError>>;

/// `true` when the store becomes reachable, `false` when it is lost.
pub type ConnectivityStream = BoxStream<'static, bool>;

/// Options for a change subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Deliver only the current contents, then end the stream
    pub once: bool,
}

/// A shared, multi-writer store of score rows.
pub trait RemoteStore: Send + Sync + 'static {
    /// Read every row of a collection in storage order.
    fn read(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<Vec<RemoteRow>, RemoteError>> + Send;

    /// Read every row of a collection sorted descending by `order`.
    fn read_ordered(
        &self,
        collection: &str,
        order: OrderKey,
    ) -> impl Future<Output = Result<Vec<RemoteRow>, RemoteError>> + Send;

    /// Subscribe to a collection. The stream yields the current contents
    /// first, then the full contents after each change.
    fn subscribe(
        &self,
        collection: &str,
        options: SubscribeOptions,
    ) -> impl Future<Output = Result<ChangeStream, RemoteError>> + Send;

    /// Append a row and return its store-assigned id.
    fn create(
        &self,
        collection: &str,
        row: NewRow,
    ) -> impl Future<Output = Result<RowId, RemoteError>> + Send;

    /// Delete a row. Deleting a row that no longer exists succeeds.
    fn delete(
        &self,
        collection: &str,
        id: &RowId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Reachability signal. Stores without one never report a change.
    fn connectivity(
        &self,
    ) -> impl Future<Output = Result<ConnectivityStream, RemoteError>> + Send {
        async { Ok(futures::stream::pending().boxed()) }
    }

    /// Apply the create-or-improve rule in one atomic step, if supported.
    fn submit_best(
        &self,
        _collection: &str,
        row: NewRow,
    ) -> impl Future<Output = Result<Option<BestWrite>, RemoteError>> + Send {
        async move {
            drop(row);
            Ok(None)
        }
    }
}

/// Bound a remote call, mapping expiry to [`RemoteError::Timeout`].
pub async fn with_timeout<T>(
    operation: &'static str,
    after: Duration,
    call: impl Future<Output = Result<T, RemoteError>>,
) -> Result<T, RemoteError> {
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout { operation, after }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn with_timeout_maps_expiry() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, RemoteError>(())
        };
        let err = with_timeout("read", Duration::from_secs(8), slow)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::Timeout {
                operation: "read",
                after: Duration::from_secs(8)
            }
        );
    }

    #[tokio::test]
    async fn with_timeout_passes_results_through() {
        let fast = async { Ok::<_, RemoteError>(7) };
        assert_eq!(
            with_timeout("read", Duration::from_secs(1), fast).await,
            Ok(7)
        );
    }
}

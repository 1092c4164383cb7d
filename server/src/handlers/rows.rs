//! Row handlers - reads, appends, deletes and atomic best writes.

use crate::db::{self, InsertScore};
use crate::error::{AppError, Result};
use crate::websocket::{ConnectionManager, ServerMessage};
use snakeboard_engine::protocol::{CreateRowRequest, CreateRowResponse, ReadQuery};
use snakeboard_engine::{BestWrite, RemoteRow, SCORES_COLLECTION};
use sqlx::PgPool;

/// Reject every collection but `scores`.
pub fn ensure_collection(collection: &str) -> Result<()> {
    if collection == SCORES_COLLECTION {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("unknown collection: {collection}")))
    }
}

/// Read every row of a collection.
pub async fn handle_list(pool: &PgPool, collection: &str, query: ReadQuery) -> Result<Vec<RemoteRow>> {
    ensure_collection(collection)?;
    Ok(db::list_rows(pool, collection, query.order_by).await?)
}

/// Append a row and notify subscribers.
pub async fn handle_create(
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    collection: &str,
    request: CreateRowRequest,
) -> Result<CreateRowResponse> {
    ensure_collection(collection)?;
    let row = InsertScore::try_from(&request)?;

    let row_id = db::insert_row(pool, collection, &row).await?;
    tracing::info!(
        row_id = %row_id,
        player = %request.player_name,
        score = request.score,
        "Score row created"
    );

    broadcast_snapshot(pool, conn_manager, collection).await;
    Ok(CreateRowResponse { row_id })
}

/// Delete a row. Deleting a missing row succeeds.
pub async fn handle_delete(
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    collection: &str,
    row_id: &str,
) -> Result<()> {
    ensure_collection(collection)?;

    if db::delete_row(pool, collection, row_id).await? {
        tracing::info!(row_id, "Score row deleted");
        broadcast_snapshot(pool, conn_manager, collection).await;
    } else {
        tracing::debug!(row_id, "Delete of missing row ignored");
    }
    Ok(())
}

/// Create or improve a player's best in one transaction.
pub async fn handle_best(
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    collection: &str,
    request: CreateRowRequest,
) -> Result<BestWrite> {
    ensure_collection(collection)?;
    let row = InsertScore::try_from(&request)?;

    let write = db::best_write(pool, collection, &request, &row).await?;
    tracing::info!(
        player = %request.player_name,
        score = request.score,
        outcome = ?write.outcome,
        removed = write.removed.len(),
        "Best score write"
    );

    if write.outcome.changed() {
        broadcast_snapshot(pool, conn_manager, collection).await;
    }
    Ok(write)
}

/// Push the current contents of `collection` to its subscribers.
pub async fn broadcast_snapshot(pool: &PgPool, conn_manager: &ConnectionManager, collection: &str) {
    if conn_manager.subscriber_count(collection) == 0 {
        return;
    }
    match db::list_rows(pool, collection, None).await {
        Ok(rows) => {
            conn_manager.broadcast(collection, ServerMessage::snapshot(collection, rows));
        }
        Err(e) => {
            tracing::warn!(collection, "Failed to load snapshot for broadcast: {}", e);
        }
    }
}

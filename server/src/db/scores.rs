//! Database operations for the scores table.

use snakeboard_engine::protocol::BestWrite;
use snakeboard_engine::reconcile::plan_remote_write;
use snakeboard_engine::{NewRow, OrderKey, RemoteRow, RowId, WritePlan};
use sqlx::{PgPool, Postgres, Row, Transaction};

/// A score row as stored in the database.
#[derive(Debug)]
pub struct StoredScore {
    pub row_id: String,
    pub player_name: String,
    pub score: i64,
    pub written_at: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredScore {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredScore {
            row_id: row.try_get("row_id")?,
            player_name: row.try_get("player_name")?,
            score: row.try_get("score")?,
            written_at: row.try_get("written_at")?,
        })
    }
}

impl StoredScore {
    /// Convert database row to the wire row.
    pub fn to_remote_row(&self) -> RemoteRow {
        RemoteRow::new(
            self.row_id.clone(),
            self.player_name.clone(),
            self.score.max(0) as u64,
            self.written_at.max(0) as u64,
        )
    }
}

/// A validated row ready for insertion.
#[derive(Debug, Clone)]
pub struct InsertScore {
    pub player_name: String,
    pub score: i64,
    pub written_at: i64,
}

impl TryFrom<&NewRow> for InsertScore {
    type Error = snakeboard_engine::Error;

    fn try_from(row: &NewRow) -> Result<Self, Self::Error> {
        let score = i64::try_from(row.score).map_err(|_| {
            snakeboard_engine::Error::InvalidPayload(format!("score {} is out of range", row.score))
        })?;
        let written_at = i64::try_from(row.timestamp).map_err(|_| {
            snakeboard_engine::Error::InvalidPayload(format!(
                "timestamp {} is out of range",
                row.timestamp
            ))
        })?;
        Ok(Self {
            player_name: row.player_name.as_str().to_string(),
            score,
            written_at,
        })
    }
}

fn order_clause(order: Option<OrderKey>) -> &'static str {
    match order {
        None => "seq ASC",
        Some(OrderKey::Score) => "score DESC, seq ASC",
        Some(OrderKey::Timestamp) => "written_at DESC, seq ASC",
    }
}

/// List every row of a collection, in storage order unless `order` is given.
pub async fn list_rows(
    pool: &PgPool,
    collection: &str,
    order: Option<OrderKey>,
) -> Result<Vec<RemoteRow>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT row_id, player_name, score, written_at
        FROM scores
        WHERE collection = $1
        ORDER BY {}
        "#,
        order_clause(order)
    );

    let rows = sqlx::query_as::<_, StoredScore>(&sql)
        .bind(collection)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(StoredScore::to_remote_row).collect())
}

async fn insert<'e, E>(executor: E, collection: &str, row: &InsertScore) -> Result<RowId, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let row_id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO scores (row_id, collection, player_name, score, written_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&row_id)
    .bind(collection)
    .bind(&row.player_name)
    .bind(row.score)
    .bind(row.written_at)
    .execute(executor)
    .await?;

    Ok(RowId::new(row_id))
}

/// Append a row and return its new id.
pub async fn insert_row(
    pool: &PgPool,
    collection: &str,
    row: &InsertScore,
) -> Result<RowId, sqlx::Error> {
    insert(pool, collection, row).await
}

/// Delete a row. Returns whether a row was removed.
pub async fn delete_row(pool: &PgPool, collection: &str, row_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM scores WHERE collection = $1 AND row_id = $2")
        .bind(collection)
        .bind(row_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Lock the player's rows for the rest of the transaction.
async fn lock_player(
    tx: &mut Transaction<'_, Postgres>,
    collection: &str,
    player_name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("{collection}/{player_name}"))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Compare, delete stale rows and insert, all inside one transaction.
///
/// Concurrent best writes for the same player serialize on an advisory
/// lock, so the compare always sees the previous writer's result.
pub async fn best_write(
    pool: &PgPool,
    collection: &str,
    candidate: &NewRow,
    row: &InsertScore,
) -> Result<BestWrite, sqlx::Error> {
    let mut tx = pool.begin().await?;
    lock_player(&mut tx, collection, &row.player_name).await?;

    let owned = sqlx::query_as::<_, StoredScore>(
        r#"
        SELECT row_id, player_name, score, written_at
        FROM scores
        WHERE collection = $1 AND btrim(player_name) = $2
        ORDER BY seq ASC
        "#,
    )
    .bind(collection)
    .bind(&row.player_name)
    .fetch_all(&mut *tx)
    .await?;
    let owned: Vec<RemoteRow> = owned.iter().map(StoredScore::to_remote_row).collect();

    let plan = plan_remote_write(&owned, &candidate.to_record());
    let outcome = plan.outcome();

    let removed = match plan {
        WritePlan::Skip { .. } => {
            tx.rollback().await?;
            return Ok(BestWrite {
                outcome,
                row_id: None,
                removed: Vec::new(),
            });
        }
        WritePlan::Create => Vec::new(),
        WritePlan::Replace { stale, .. } => {
            let ids: Vec<String> = stale.iter().map(|id| id.as_str().to_string()).collect();
            sqlx::query("DELETE FROM scores WHERE collection = $1 AND row_id = ANY($2)")
                .bind(collection)
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
            stale
        }
    };

    let row_id = insert(&mut *tx, collection, row).await?;
    tx.commit().await?;

    Ok(BestWrite {
        outcome,
        row_id: Some(row_id),
        removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use snakeboard_engine::PlayerName;

    fn new_row(name: &str, score: u64) -> NewRow {
        NewRow {
            player_name: PlayerName::parse(name).unwrap(),
            score,
            timestamp: 1_706_745_600_000,
        }
    }

    #[test]
    fn insert_score_from_new_row() {
        let insert = InsertScore::try_from(&new_row("Maya", 130)).unwrap();
        assert_eq!(insert.player_name, "Maya");
        assert_eq!(insert.score, 130);
        assert_eq!(insert.written_at, 1_706_745_600_000);
    }

    #[test]
    fn insert_score_rejects_scores_beyond_bigint() {
        let err = InsertScore::try_from(&new_row("Maya", u64::MAX)).unwrap_err();
        assert!(matches!(err, snakeboard_engine::Error::InvalidPayload(_)));
    }

    #[test]
    fn stored_score_to_remote_row() {
        let stored = StoredScore {
            row_id: "8f1c".to_string(),
            player_name: "Alex".to_string(),
            score: 200,
            written_at: 42,
        };
        assert_eq!(stored.to_remote_row(), RemoteRow::new("8f1c", "Alex", 200, 42));
    }

    #[test]
    fn order_clauses_keep_storage_order_for_ties() {
        assert_eq!(order_clause(None), "seq ASC");
        assert!(order_clause(Some(OrderKey::Score)).ends_with("seq ASC"));
        assert!(order_clause(Some(OrderKey::Timestamp)).starts_with("written_at DESC"));
    }
}

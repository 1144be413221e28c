//! Repository for the `status_changes` ledger.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use stitch_core::types::DbId;

use crate::history::HistoryWriter;
use crate::models::status_change::{NewStatusChange, StatusChange, StatusChangeQuery};
use crate::query::push_joiner;

/// Column list for `status_changes` SELECT queries.
const COLUMNS: &str = "id, entity_type, entity_id, status, timestamp, created_at";

/// Newest first. `id` breaks ties between transitions stamped at the same instant.
const ORDERING: &str = "timestamp DESC, id DESC";

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

/// Provides get-or-create and query operations for status history.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusChangeRepo;

impl StatusChangeRepo {
    /// Return the row for `input`'s (entity_type, entity_id, status,
    /// timestamp) tuple, inserting it if absent.
    ///
    /// The unique constraint arbitrates concurrent writers: a losing insert
    /// does nothing and the winner's row is read back. The boolean is `true`
    /// when this call created the row.
    pub async fn get_or_create(
        conn: &mut PgConnection,
        input: &NewStatusChange,
    ) -> Result<(StatusChange, bool), sqlx::Error> {
        let insert = format!(
            "INSERT INTO status_changes (entity_type, entity_id, status, timestamp) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT ON CONSTRAINT uq_status_changes_entity_status_timestamp DO NOTHING \
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, StatusChange>(&insert)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(input.status.id())
            .bind(input.timestamp)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(row) = inserted {
            return Ok((row, true));
        }

        let select = format!(
            "SELECT {COLUMNS} FROM status_changes \
             WHERE entity_type = $1 AND entity_id = $2 AND status = $3 AND timestamp = $4"
        );
        let existing = sqlx::query_as::<_, StatusChange>(&select)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(input.status.id())
            .bind(input.timestamp)
            .fetch_one(&mut *conn)
            .await?;
        Ok((existing, false))
    }

    /// Full history of one entity, newest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Vec<StatusChange>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM status_changes \
             WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY {ORDERING}"
        );
        sqlx::query_as::<_, StatusChange>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }

    /// Most recent transition of one entity.
    pub async fn latest_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Option<StatusChange>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM status_changes \
             WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY {ORDERING} LIMIT 1"
        );
        sqlx::query_as::<_, StatusChange>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_optional(pool)
            .await
    }

    /// Query history with filtering and pagination, newest first.
    pub async fn query(
        pool: &PgPool,
        params: &StatusChangeQuery,
    ) -> Result<Vec<StatusChange>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let mut qb = QueryBuilder::new(format!("SELECT {COLUMNS} FROM status_changes"));
        push_filter(&mut qb, params);
        qb.push(format!(" ORDER BY {ORDERING} LIMIT "))
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        qb.build_query_as::<StatusChange>().fetch_all(pool).await
    }

    /// Count history rows matching the filter (pagination ignored).
    pub async fn count(pool: &PgPool, params: &StatusChangeQuery) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM status_changes");
        push_filter(&mut qb, params);
        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Remove every history row of one entity. Maintenance only; application
    /// code never edits the ledger.
    pub async fn delete_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM status_changes WHERE entity_type = $1 AND entity_id = $2")
                .bind(entity_type)
                .bind(entity_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl HistoryWriter for StatusChangeRepo {
    async fn record(
        &self,
        conn: &mut PgConnection,
        change: &NewStatusChange,
    ) -> Result<StatusChange, sqlx::Error> {
        Self::get_or_create(conn, change).await.map(|(row, _)| row)
    }
}

/// Push ` WHERE ...` for every set filter field.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, params: &StatusChangeQuery) {
    let mut first = true;

    if let Some(entity_type) = &params.entity_type {
        push_joiner(qb, &mut first);
        qb.push("entity_type = ").push_bind(entity_type.clone());
    }
    if let Some(entity_id) = params.entity_id {
        push_joiner(qb, &mut first);
        qb.push("entity_id = ").push_bind(entity_id);
    }
    if let Some(status) = params.status {
        push_joiner(qb, &mut first);
        qb.push("status = ").push_bind(status.id());
    }
    if let Some(from) = params.from {
        push_joiner(qb, &mut first);
        qb.push("timestamp >= ").push_bind(from);
    }
    if let Some(to) = params.to {
        push_joiner(qb, &mut first);
        qb.push("timestamp <= ").push_bind(to);
    }
}

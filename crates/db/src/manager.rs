//! Storage operations for one status-bearing entity type.
//!
//! [`StatusManager`] is the single path through which entities are saved:
//! every save stamps the transition timestamp when the status moved, writes
//! the row, and hands the save to the injected [`HistoryWriter`] on the same
//! transaction.
//!
//! Deleting through the manager is a soft delete (status → DELETED). Row
//! removal is only available through the `hard_delete*` methods, which
//! bypass the lifecycle entirely.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use stitch_core::clock::{Clock, SystemClock};
use stitch_core::status::Status;
use stitch_core::types::DbId;

use crate::history::{capture_status_change, HistoryWriter};
use crate::models::status_change::StatusChange;
use crate::query::{update_ids_sql, Direction, FieldChanges, StatusQuery};
use crate::repositories::StatusChangeRepo;
use crate::status_model::StatusModel;

/// Result of a bulk delete.
///
/// Soft deletes report only the row count; hard deletes also break the
/// count down by entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    pub deleted: u64,
    pub per_type: BTreeMap<String, u64>,
}

pub struct StatusManager<T: StatusModel> {
    pool: PgPool,
    history: Arc<dyn HistoryWriter>,
    clock: Arc<dyn Clock>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: StatusModel> Clone for StatusManager<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            history: Arc::clone(&self.history),
            clock: Arc::clone(&self.clock),
            _entity: PhantomData,
        }
    }
}

impl<T: StatusModel> StatusManager<T> {
    /// Manager recording history in `status_changes` and stamping wall-clock time.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            history: Arc::new(StatusChangeRepo),
            clock: Arc::new(SystemClock),
            _entity: PhantomData,
        }
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryWriter>) -> Self {
        self.history = history;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ── Query entry points ────────────────────────────────────────────

    /// Default query: every non-deleted row.
    pub fn query(&self) -> StatusQuery<T> {
        StatusQuery::new()
    }

    pub fn all(&self) -> StatusQuery<T> {
        self.query().all()
    }

    pub fn enabled(&self) -> StatusQuery<T> {
        self.query().enabled()
    }

    pub fn suspended(&self) -> StatusQuery<T> {
        self.query().suspended()
    }

    pub fn archived(&self) -> StatusQuery<T> {
        self.query().archived()
    }

    pub fn deleted(&self) -> StatusQuery<T> {
        self.query().deleted()
    }

    // ── Single-entity lifecycle ───────────────────────────────────────

    /// Persist `entity`, stamping and recording a status transition if
    /// there is one.
    ///
    /// On failure the transaction is rolled back and `entity` is restored to
    /// its state before the call, so the save can be retried.
    pub async fn save(&self, entity: &mut T) -> Result<(), sqlx::Error> {
        let snapshot = entity.clone();
        let result = self.save_committed(entity).await;
        if let Err(err) = &result {
            tracing::warn!(
                entity_type = T::ENTITY_TYPE,
                id = ?snapshot.id(),
                error = %err,
                "Save rolled back"
            );
            *entity = snapshot;
        }
        result
    }

    /// Save a new entity and return it with its generated id.
    pub async fn create(&self, mut entity: T) -> Result<T, sqlx::Error> {
        self.save(&mut entity).await?;
        Ok(entity)
    }

    /// Set `status` and save. Any status may follow any other.
    pub async fn transition(&self, entity: &mut T, status: Status) -> Result<(), sqlx::Error> {
        entity.set_status(status);
        self.save(entity).await
    }

    pub async fn enable(&self, entity: &mut T) -> Result<(), sqlx::Error> {
        self.transition(entity, Status::Enabled).await
    }

    pub async fn suspend(&self, entity: &mut T) -> Result<(), sqlx::Error> {
        self.transition(entity, Status::Suspended).await
    }

    pub async fn archive(&self, entity: &mut T) -> Result<(), sqlx::Error> {
        self.transition(entity, Status::Archived).await
    }

    /// Soft delete: mark DELETED and save. The row stays in place.
    ///
    /// Returns the number of rows deleted (always 1), matching
    /// [`hard_delete`](Self::hard_delete).
    pub async fn delete(&self, entity: &mut T) -> Result<u64, sqlx::Error> {
        self.transition(entity, Status::Deleted).await?;
        Ok(1)
    }

    /// Remove the row, bypassing the lifecycle and history. Maintenance only.
    ///
    /// Fails with [`sqlx::Error::RowNotFound`] if the entity was never saved
    /// or its row is already gone.
    pub async fn hard_delete(&self, entity: &T) -> Result<u64, sqlx::Error> {
        let id = entity.id().ok_or(sqlx::Error::RowNotFound)?;
        let query = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        tracing::info!(entity_type = T::ENTITY_TYPE, id, "Hard-deleted entity");
        Ok(result.rows_affected())
    }

    /// Look up a row by id, whatever its status.
    pub async fn get(&self, id: DbId) -> Result<T, sqlx::Error> {
        self.find(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Look up a row by id, whatever its status.
    pub async fn find(&self, id: DbId) -> Result<Option<T>, sqlx::Error> {
        let query = format!("SELECT {} FROM {} WHERE id = $1", T::COLUMNS, T::TABLE);
        sqlx::query_as::<_, T>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Reload `entity` from its row. The per-instance tracking flag is kept.
    pub async fn refresh(&self, entity: &mut T) -> Result<(), sqlx::Error> {
        let id = entity.id().ok_or(sqlx::Error::RowNotFound)?;
        let tracking = entity.lifecycle().track_status_changes();
        let mut fresh = self.get(id).await?;
        if tracking {
            fresh.enable_status_change_tracking();
        } else {
            fresh.disable_status_change_tracking();
        }
        *entity = fresh;
        Ok(())
    }

    /// Status history of `entity`, newest first. Empty for unsaved entities.
    pub async fn history(&self, entity: &T) -> Result<Vec<StatusChange>, sqlx::Error> {
        match entity.id() {
            Some(id) => StatusChangeRepo::list_for_entity(&self.pool, T::ENTITY_TYPE, id).await,
            None => Ok(Vec::new()),
        }
    }

    // ── Query execution ───────────────────────────────────────────────

    pub async fn fetch(&self, query: &StatusQuery<T>) -> Result<Vec<T>, sqlx::Error> {
        let mut qb = query.select_sql();
        qb.build_query_as::<T>().fetch_all(&self.pool).await
    }

    /// First row of `query` in its ordering, if any.
    pub async fn fetch_optional(&self, query: &StatusQuery<T>) -> Result<Option<T>, sqlx::Error> {
        let mut qb = query.limit(1).select_sql();
        qb.build_query_as::<T>().fetch_optional(&self.pool).await
    }

    pub async fn count(&self, query: &StatusQuery<T>) -> Result<i64, sqlx::Error> {
        let mut qb = query.count_sql();
        qb.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }

    pub async fn exists(&self, query: &StatusQuery<T>) -> Result<bool, sqlx::Error> {
        Ok(self.fetch_optional(query).await?.is_some())
    }

    // ── Bulk operations ───────────────────────────────────────────────

    /// Soft-delete every row of `query` through the per-entity save path,
    /// so each gets its timestamp and history row. All or nothing.
    pub async fn delete_matching(
        &self,
        query: &StatusQuery<T>,
    ) -> Result<DeletionSummary, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut qb = query.select_for_update_sql();
        let rows: Vec<T> = qb.build_query_as::<T>().fetch_all(&mut *tx).await?;

        let mut deleted = 0;
        for mut row in rows {
            row.set_status(Status::Deleted);
            self.save_in(&mut tx, &mut row).await?;
            deleted += 1;
        }
        tx.commit().await?;

        tracing::info!(entity_type = T::ENTITY_TYPE, deleted, "Soft-deleted entities");
        Ok(DeletionSummary {
            deleted,
            per_type: BTreeMap::new(),
        })
    }

    /// Remove every row of `query` in one statement, bypassing the
    /// lifecycle and history. Maintenance only.
    pub async fn hard_delete_matching(
        &self,
        query: &StatusQuery<T>,
    ) -> Result<DeletionSummary, sqlx::Error> {
        let mut qb = query.delete_sql();
        let deleted = qb.build().execute(&self.pool).await?.rows_affected();

        let mut per_type = BTreeMap::new();
        if deleted > 0 {
            per_type.insert(T::ENTITY_TYPE.to_string(), deleted);
        }
        tracing::info!(entity_type = T::ENTITY_TYPE, deleted, "Hard-deleted entities");
        Ok(DeletionSummary { deleted, per_type })
    }

    /// Bulk update.
    ///
    /// Without a status change this is one plain `UPDATE` over the query's
    /// rows. With one, the matching rows are locked, every row not already
    /// at the target status is saved individually (timestamp + history),
    /// and the remaining fields are then applied to all locked rows with one
    /// plain `UPDATE`. The whole operation is one transaction.
    ///
    /// Returns the number of rows matched.
    pub async fn update_matching(
        &self,
        query: &StatusQuery<T>,
        changes: &T::Changes,
    ) -> Result<u64, sqlx::Error> {
        let Some(target) = changes.status() else {
            return match query.update_sql(changes) {
                Some(mut qb) => Ok(qb.build().execute(&self.pool).await?.rows_affected()),
                None => Ok(0),
            };
        };

        let mut tx = self.pool.begin().await?;

        let mut qb = query.select_ids_for_update_sql();
        let ids: Vec<DbId> = qb.build_query_scalar::<DbId>().fetch_all(&mut *tx).await?;
        if ids.is_empty() {
            tx.commit().await?;
            return Ok(0);
        }

        let pending = StatusQuery::<T>::new()
            .include_deleted()
            .filter_ids(ids.iter().copied())
            .order_by("id", Direction::Asc);
        let mut qb = pending.select_sql();
        let rows: Vec<T> = qb.build_query_as::<T>().fetch_all(&mut *tx).await?;

        let mut transitioned = 0_u64;
        for mut row in rows.into_iter().filter(|row| row.status() != target) {
            row.set_status(target);
            self.save_in(&mut tx, &mut row).await?;
            transitioned += 1;
        }

        if let Some(mut qb) = update_ids_sql::<T>(&ids, changes) {
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        tracing::info!(
            entity_type = T::ENTITY_TYPE,
            matched = ids.len(),
            transitioned,
            status = %target,
            "Bulk status update"
        );
        Ok(ids.len() as u64)
    }

    // ── Internals ─────────────────────────────────────────────────────

    async fn save_committed(&self, entity: &mut T) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        self.save_in(&mut tx, entity).await?;
        tx.commit().await?;
        Ok(())
    }

    /// The save protocol, on a caller-supplied connection.
    async fn save_in(&self, conn: &mut PgConnection, entity: &mut T) -> Result<(), sqlx::Error> {
        let changed = entity.lifecycle_mut().prepare_save(self.clock.now());

        let created = match entity.id() {
            Some(_) => {
                entity.update_row(&mut *conn).await?;
                false
            }
            None => {
                entity.insert_row(&mut *conn).await?;
                true
            }
        };

        capture_status_change(self.history.as_ref(), &mut *conn, &*entity, created).await?;
        entity.lifecycle_mut().mark_persisted();

        tracing::debug!(
            entity_type = T::ENTITY_TYPE,
            id = ?entity.id(),
            status = %entity.status(),
            changed,
            created,
            "Saved entity"
        );
        Ok(())
    }
}

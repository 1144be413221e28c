//! Repository for the `stitchers` table.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use stitch_core::lifecycle::Lifecycle;
use stitch_core::types::{DbId, Timestamp};

use crate::models::stitcher::{Stitcher, UpdateStitcher};
use crate::query::StatusQuery;
use crate::status_model::StatusModel;

const COLUMNS: &str = "id, username, email, motto, status, \
                       status_update_timestamp, created_at, updated_at";

#[async_trait]
impl StatusModel for Stitcher {
    const ENTITY_TYPE: &'static str = "stitcher";
    const TABLE: &'static str = "stitchers";
    const COLUMNS: &'static str = COLUMNS;

    type Changes = UpdateStitcher;

    fn id(&self) -> Option<DbId> {
        self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    async fn insert_row(&mut self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        let (id, created_at, updated_at): (DbId, Timestamp, Timestamp) = sqlx::query_as(
            "INSERT INTO stitchers (username, email, motto, status, status_update_timestamp)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, created_at, updated_at",
        )
        .bind(&self.username)
        .bind(&self.email)
        .bind(&self.motto)
        .bind(self.lifecycle.status().id())
        .bind(self.lifecycle.status_update_timestamp())
        .fetch_one(conn)
        .await?;

        self.id = Some(id);
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
        Ok(())
    }

    async fn update_row(&mut self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        let id = self.id.ok_or(sqlx::Error::RowNotFound)?;
        let updated_at: Timestamp = sqlx::query_scalar(
            "UPDATE stitchers SET
                username = $2,
                email = $3,
                motto = $4,
                status = $5,
                status_update_timestamp = $6
             WHERE id = $1
             RETURNING updated_at",
        )
        .bind(id)
        .bind(&self.username)
        .bind(&self.email)
        .bind(&self.motto)
        .bind(self.lifecycle.status().id())
        .bind(self.lifecycle.status_update_timestamp())
        .fetch_optional(conn)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

        self.updated_at = Some(updated_at);
        Ok(())
    }
}

/// Stitcher queries beyond the generic lifecycle operations.
pub struct StitcherRepo;

impl StitcherRepo {
    /// Find a stitcher by username. Excludes soft-deleted rows.
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Stitcher>, sqlx::Error> {
        let mut qb = StatusQuery::<Stitcher>::new()
            .filter_eq("username", username)
            .select_sql();
        qb.build_query_as::<Stitcher>()
            .fetch_optional(pool)
            .await
    }
}

//! Repository for the `projects` table.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use stitch_core::lifecycle::Lifecycle;
use stitch_core::types::{DbId, Timestamp};

use crate::models::project::{Project, UpdateProject};
use crate::query::StatusQuery;
use crate::status_model::StatusModel;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, owner_id, title, description, kind, status, \
                       status_update_timestamp, created_at, updated_at";

#[async_trait]
impl StatusModel for Project {
    const ENTITY_TYPE: &'static str = "project";
    const TABLE: &'static str = "projects";
    const COLUMNS: &'static str = COLUMNS;
    const ORDERING: &'static str = "created_at ASC, id ASC";

    type Changes = UpdateProject;

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
            "INSERT INTO projects
                (owner_id, title, description, kind, status, status_update_timestamp)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, created_at, updated_at",
        )
        .bind(self.owner_id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.kind.id())
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
            "UPDATE projects SET
                owner_id = $2,
                title = $3,
                description = $4,
                kind = $5,
                status = $6,
                status_update_timestamp = $7
             WHERE id = $1
             RETURNING updated_at",
        )
        .bind(id)
        .bind(self.owner_id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.kind.id())
        .bind(self.lifecycle.status().id())
        .bind(self.lifecycle.status_update_timestamp())
        .fetch_optional(conn)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

        self.updated_at = Some(updated_at);
        Ok(())
    }
}

/// Project queries beyond the generic lifecycle operations.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Projects owned by `owner_id`, oldest first. Excludes soft-deleted rows.
    pub async fn list_for_owner(pool: &PgPool, owner_id: DbId) -> Result<Vec<Project>, sqlx::Error> {
        let mut qb = StatusQuery::<Project>::new()
            .filter_eq("owner_id", owner_id)
            .select_sql();
        qb.build_query_as::<Project>()
            .fetch_all(pool)
            .await
    }
}

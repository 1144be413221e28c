//! Repository for the `media_assets` table.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use stitch_core::assets::AssetKind;
use stitch_core::lifecycle::Lifecycle;
use stitch_core::types::{DbId, Timestamp};

use crate::models::media_asset::{MediaAsset, UpdateMediaAsset};
use crate::query::StatusQuery;
use crate::status_model::StatusModel;

const COLUMNS: &str = "id, project_id, kind, file_path, content_type, size_bytes, status, \
                       status_update_timestamp, created_at, updated_at";

#[async_trait]
impl StatusModel for MediaAsset {
    const ENTITY_TYPE: &'static str = "media_asset";
    const TABLE: &'static str = "media_assets";
    const COLUMNS: &'static str = COLUMNS;
    /// Uploads are high-volume; their transitions are not recorded unless
    /// enabled per instance.
    const TRACK_STATUS_CHANGES: bool = false;

    type Changes = UpdateMediaAsset;

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
            "INSERT INTO media_assets
                (project_id, kind, file_path, content_type, size_bytes,
                 status, status_update_timestamp)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, created_at, updated_at",
        )
        .bind(self.project_id)
        .bind(self.kind.id())
        .bind(&self.file_path)
        .bind(&self.content_type)
        .bind(self.size_bytes)
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
            "UPDATE media_assets SET
                project_id = $2,
                kind = $3,
                file_path = $4,
                content_type = $5,
                size_bytes = $6,
                status = $7,
                status_update_timestamp = $8
             WHERE id = $1
             RETURNING updated_at",
        )
        .bind(id)
        .bind(self.project_id)
        .bind(self.kind.id())
        .bind(&self.file_path)
        .bind(&self.content_type)
        .bind(self.size_bytes)
        .bind(self.lifecycle.status().id())
        .bind(self.lifecycle.status_update_timestamp())
        .fetch_optional(conn)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

        self.updated_at = Some(updated_at);
        Ok(())
    }
}

/// Media asset queries beyond the generic lifecycle operations.
pub struct MediaAssetRepo;

impl MediaAssetRepo {
    /// Assets of a project, newest first, optionally narrowed to one kind.
    /// Excludes soft-deleted rows.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
        kind: Option<AssetKind>,
    ) -> Result<Vec<MediaAsset>, sqlx::Error> {
        let mut query = StatusQuery::<MediaAsset>::new().filter_eq("project_id", project_id);
        if let Some(kind) = kind {
            query = query.filter_eq("kind", kind.id());
        }
        let mut qb = query.select_sql();
        qb.build_query_as::<MediaAsset>().fetch_all(pool).await
    }
}

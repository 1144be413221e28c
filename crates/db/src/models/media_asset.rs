//! Media asset entity model and DTOs.
//!
//! One table holds every upload type; `kind` discriminates image, audio,
//! video and document assets.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use stitch_core::assets::{validate_asset, AssetKind};
use stitch_core::error::CoreError;
use stitch_core::lifecycle::Lifecycle;
use stitch_core::status::Status;
use stitch_core::types::{DbId, Timestamp};

use crate::query::{Assignments, FieldChanges};
use crate::status_model::{decode_code, lifecycle_from_row, StatusModel};

#[derive(Debug, Clone, Serialize)]
pub struct MediaAsset {
    pub id: Option<DbId>,
    pub project_id: DbId,
    pub kind: AssetKind,
    pub file_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(flatten)]
    pub(crate) lifecycle: Lifecycle,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl MediaAsset {
    /// Build an unsaved asset from validated upload metadata.
    pub fn new(input: CreateMediaAsset) -> Result<Self, CoreError> {
        validate_asset(
            input.kind,
            &input.file_path,
            &input.content_type,
            input.size_bytes,
        )?;
        Ok(Self {
            id: None,
            project_id: input.project_id,
            kind: input.kind,
            file_path: input.file_path,
            content_type: input.content_type,
            size_bytes: input.size_bytes,
            lifecycle: Lifecycle::new(
                input.status.unwrap_or_default(),
                <Self as StatusModel>::TRACK_STATUS_CHANGES,
            ),
            created_at: None,
            updated_at: None,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for MediaAsset {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            project_id: row.try_get("project_id")?,
            kind: decode_code(row, "kind")?,
            file_path: row.try_get("file_path")?,
            content_type: row.try_get("content_type")?,
            size_bytes: row.try_get("size_bytes")?,
            lifecycle: lifecycle_from_row::<Self>(row)?,
            created_at: Some(row.try_get("created_at")?),
            updated_at: Some(row.try_get("updated_at")?),
        })
    }
}

/// DTO for registering an uploaded asset.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMediaAsset {
    pub project_id: DbId,
    pub kind: AssetKind,
    pub file_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// Defaults to Enabled if omitted.
    pub status: Option<Status>,
}

/// DTO for bulk-updating assets. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMediaAsset {
    pub project_id: Option<DbId>,
    pub file_path: Option<String>,
    pub status: Option<Status>,
}

impl FieldChanges for UpdateMediaAsset {
    fn status(&self) -> Option<Status> {
        self.status
    }

    fn push_assignments(&self, set: &mut Assignments<'_>) {
        if let Some(project_id) = self.project_id {
            set.set("project_id", project_id);
        }
        if let Some(file_path) = &self.file_path {
            set.set("file_path", file_path.clone());
        }
    }
}

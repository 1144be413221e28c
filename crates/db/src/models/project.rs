//! Project entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use stitch_core::error::CoreError;
use stitch_core::lifecycle::Lifecycle;
use stitch_core::project::{validate_title, ProjectKind};
use stitch_core::status::Status;
use stitch_core::types::{DbId, Timestamp};

use crate::query::{Assignments, FieldChanges};
use crate::status_model::{decode_code, lifecycle_from_row, StatusModel};

/// A project owned by a stitcher.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: Option<DbId>,
    pub owner_id: DbId,
    pub title: String,
    pub description: String,
    pub kind: ProjectKind,
    #[serde(flatten)]
    pub(crate) lifecycle: Lifecycle,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl Project {
    /// Build an unsaved project from validated input.
    pub fn new(input: CreateProject) -> Result<Self, CoreError> {
        validate_title(&input.title)?;
        Ok(Self {
            id: None,
            owner_id: input.owner_id,
            title: input.title,
            description: input.description.unwrap_or_default(),
            kind: input.kind.unwrap_or_default(),
            lifecycle: Lifecycle::new(
                input.status.unwrap_or_default(),
                <Self as StatusModel>::TRACK_STATUS_CHANGES,
            ),
            created_at: None,
            updated_at: None,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Project {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            owner_id: row.try_get("owner_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            kind: decode_code(row, "kind")?,
            lifecycle: lifecycle_from_row::<Self>(row)?,
            created_at: Some(row.try_get("created_at")?),
            updated_at: Some(row.try_get("updated_at")?),
        })
    }
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub owner_id: DbId,
    pub title: String,
    pub description: Option<String>,
    /// Defaults to Music if omitted.
    pub kind: Option<ProjectKind>,
    /// Defaults to Enabled if omitted.
    pub status: Option<Status>,
}

/// DTO for bulk-updating projects. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub owner_id: Option<DbId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<ProjectKind>,
    pub status: Option<Status>,
}

impl FieldChanges for UpdateProject {
    fn status(&self) -> Option<Status> {
        self.status
    }

    fn push_assignments(&self, set: &mut Assignments<'_>) {
        if let Some(owner_id) = self.owner_id {
            set.set("owner_id", owner_id);
        }
        if let Some(title) = &self.title {
            set.set("title", title.clone());
        }
        if let Some(description) = &self.description {
            set.set("description", description.clone());
        }
        if let Some(kind) = self.kind {
            set.set("kind", kind.id());
        }
    }
}

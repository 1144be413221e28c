//! Stitcher (user profile) entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use stitch_core::error::CoreError;
use stitch_core::lifecycle::Lifecycle;
use stitch_core::status::Status;
use stitch_core::stitcher::{validate_email, validate_motto, validate_username};
use stitch_core::types::{DbId, Timestamp};

use crate::query::{Assignments, FieldChanges};
use crate::status_model::{lifecycle_from_row, StatusModel};

#[derive(Debug, Clone, Serialize)]
pub struct Stitcher {
    pub id: Option<DbId>,
    pub username: String,
    pub email: String,
    pub motto: Option<String>,
    #[serde(flatten)]
    pub(crate) lifecycle: Lifecycle,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl Stitcher {
    /// Build an unsaved stitcher from validated input.
    pub fn new(input: CreateStitcher) -> Result<Self, CoreError> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;
        validate_motto(input.motto.as_deref())?;
        Ok(Self {
            id: None,
            username: input.username,
            email: input.email,
            motto: input.motto,
            lifecycle: Lifecycle::new(
                input.status.unwrap_or_default(),
                <Self as StatusModel>::TRACK_STATUS_CHANGES,
            ),
            created_at: None,
            updated_at: None,
        })
    }

    /// The motto in upper case, or an empty string when unset.
    pub fn motto_uppercase(&self) -> String {
        self.motto
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_default()
    }
}

impl<'r> FromRow<'r, PgRow> for Stitcher {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            motto: row.try_get("motto")?,
            lifecycle: lifecycle_from_row::<Self>(row)?,
            created_at: Some(row.try_get("created_at")?),
            updated_at: Some(row.try_get("updated_at")?),
        })
    }
}

/// DTO for creating a new stitcher.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStitcher {
    pub username: String,
    pub email: String,
    pub motto: Option<String>,
    /// Defaults to Enabled if omitted.
    pub status: Option<Status>,
}

/// DTO for bulk-updating stitchers. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStitcher {
    pub email: Option<String>,
    pub motto: Option<String>,
    pub status: Option<Status>,
}

impl FieldChanges for UpdateStitcher {
    fn status(&self) -> Option<Status> {
        self.status
    }

    fn push_assignments(&self, set: &mut Assignments<'_>) {
        if let Some(email) = &self.email {
            set.set("email", email.clone());
        }
        if let Some(motto) = &self.motto {
            set.set("motto", motto.clone());
        }
    }
}

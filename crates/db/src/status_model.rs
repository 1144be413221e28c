//! The lifecycle mixin: what an entity type supplies to take part in the
//! status lifecycle.
//!
//! Implementors provide table metadata, their row SQL and access to their
//! embedded [`Lifecycle`]. Everything else (timestamping, history capture,
//! soft delete, bulk operations) lives in [`StatusManager`](crate::StatusManager).

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, Row};
use stitch_core::error::CoreError;
use stitch_core::lifecycle::Lifecycle;
use stitch_core::status::Status;
use stitch_core::types::{CodeId, DbId, Timestamp};

use crate::query::FieldChanges;

#[async_trait]
pub trait StatusModel:
    for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static
{
    /// Discriminator written to `status_changes.entity_type`.
    const ENTITY_TYPE: &'static str;

    const TABLE: &'static str;

    /// Column list for SELECT queries. Must include `id`, `status` and
    /// `status_update_timestamp`.
    const COLUMNS: &'static str;

    /// Default ORDER BY clause for listings.
    const ORDERING: &'static str = "created_at DESC, id DESC";

    /// Type-level default for [`Lifecycle::track_status_changes`].
    const TRACK_STATUS_CHANGES: bool = true;

    /// Bulk-update field set.
    type Changes: FieldChanges;

    /// `None` until the entity has been inserted.
    fn id(&self) -> Option<DbId>;

    fn lifecycle(&self) -> &Lifecycle;

    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    /// Insert every column and record the generated id.
    async fn insert_row(&mut self, conn: &mut PgConnection) -> Result<(), sqlx::Error>;

    /// Write every column of an existing row. Fails with
    /// [`sqlx::Error::RowNotFound`] if the row is gone.
    async fn update_row(&mut self, conn: &mut PgConnection) -> Result<(), sqlx::Error>;

    fn status(&self) -> Status {
        self.lifecycle().status()
    }

    fn set_status(&mut self, status: Status) {
        self.lifecycle_mut().set_status(status);
    }

    /// Status as last persisted.
    fn original_status(&self) -> Status {
        self.lifecycle().original_status()
    }

    fn status_update_timestamp(&self) -> Option<Timestamp> {
        self.lifecycle().status_update_timestamp()
    }

    fn enable_status_change_tracking(&mut self) {
        self.lifecycle_mut().enable_status_change_tracking();
    }

    fn disable_status_change_tracking(&mut self) {
        self.lifecycle_mut().disable_status_change_tracking();
    }
}

/// Build the lifecycle state of a freshly loaded row of `T`.
pub fn lifecycle_from_row<T: StatusModel>(row: &PgRow) -> Result<Lifecycle, sqlx::Error> {
    let status: Status = decode_code(row, "status")?;
    let status_update_timestamp: Option<Timestamp> = row.try_get("status_update_timestamp")?;
    Ok(Lifecycle::loaded(
        status,
        status_update_timestamp,
        T::TRACK_STATUS_CHANGES,
    ))
}

/// Decode a SMALLINT code column into one of the core code enums.
pub fn decode_code<C>(row: &PgRow, column: &str) -> Result<C, sqlx::Error>
where
    C: TryFrom<CodeId, Error = CoreError>,
{
    let raw: CodeId = row.try_get(column)?;
    C::try_from(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

//! Status change history models and DTOs.
//!
//! History rows are immutable once created (no `updated_at`) and address
//! their entity through a polymorphic `(entity_type, entity_id)` pair.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stitch_core::status::Status;
use stitch_core::types::{DbId, Timestamp};

/// A single observed status transition.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct StatusChange {
    pub id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    /// The status transitioned to.
    #[sqlx(try_from = "i16")]
    pub status: Status,
    /// The entity's `status_update_timestamp` at the time of the transition.
    pub timestamp: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for recording a transition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewStatusChange {
    pub entity_type: String,
    pub entity_id: DbId,
    pub status: Status,
    pub timestamp: Timestamp,
}

/// Filter parameters for querying history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusChangeQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub status: Option<Status>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl StatusChangeQuery {
    /// History of one entity.
    pub fn for_entity(entity_type: &str, entity_id: DbId) -> Self {
        Self {
            entity_type: Some(entity_type.to_string()),
            entity_id: Some(entity_id),
            ..Default::default()
        }
    }
}

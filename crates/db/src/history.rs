//! Status change capture.
//!
//! Every successful save of a status-bearing entity calls
//! [`capture_status_change`] on the same connection, which decides whether
//! the save is a recordable transition and hands it to the injected
//! [`HistoryWriter`].

use async_trait::async_trait;
use sqlx::PgConnection;

use crate::models::status_change::{NewStatusChange, StatusChange};
use crate::status_model::StatusModel;

/// Persists status transitions.
///
/// Implementations must be idempotent for an identical
/// `(entity_type, entity_id, status, timestamp)` tuple, returning the
/// existing row rather than failing.
#[async_trait]
pub trait HistoryWriter: Send + Sync {
    async fn record(
        &self,
        conn: &mut PgConnection,
        change: &NewStatusChange,
    ) -> Result<StatusChange, sqlx::Error>;
}

/// Record the save of `entity` if it is a tracked transition.
///
/// Skips, returning `Ok(None)`, when tracking is disabled on the instance,
/// when the entity has no id, or when the status did not change and the
/// save was not the initial insert.
pub async fn capture_status_change<T: StatusModel>(
    writer: &dyn HistoryWriter,
    conn: &mut PgConnection,
    entity: &T,
    created: bool,
) -> Result<Option<StatusChange>, sqlx::Error> {
    let lifecycle = entity.lifecycle();

    if !lifecycle.track_status_changes() {
        return Ok(None);
    }

    let Some(entity_id) = entity.id() else {
        tracing::debug!(
            entity_type = T::ENTITY_TYPE,
            "Skipping status history for entity without id"
        );
        return Ok(None);
    };

    if !lifecycle.status_changed() && !created {
        return Ok(None);
    }

    let Some(timestamp) = lifecycle.status_update_timestamp() else {
        return Ok(None);
    };

    let change = NewStatusChange {
        entity_type: T::ENTITY_TYPE.to_string(),
        entity_id,
        status: lifecycle.status(),
        timestamp,
    };
    let recorded = writer.record(conn, &change).await?;

    tracing::debug!(
        entity_type = T::ENTITY_TYPE,
        entity_id,
        status = %change.status,
        history_id = recorded.id,
        "Recorded status change"
    );

    Ok(Some(recorded))
}

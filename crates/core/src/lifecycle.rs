//! In-memory status lifecycle state carried by every status-bearing entity.
//!
//! [`Lifecycle`] holds the persisted columns (`status`,
//! `status_update_timestamp`) together with the state that only lives for
//! the lifetime of an instance:
//!
//! - `original_status`: the status as last persisted (or as constructed),
//!   used to detect a transition at save time.
//! - `status_changed`: whether the most recent save stamped a transition.
//! - `track_status_changes`: whether saves of this instance are recorded in
//!   the status history. Defaults from the entity type and can be toggled
//!   per instance.
//!
//! The save protocol is [`Lifecycle::prepare_save`] before the row is
//! written, then [`Lifecycle::mark_persisted`] once it is.

use chrono::SubsecRound;
use serde::Serialize;

use crate::status::Status;
use crate::types::Timestamp;

/// PostgreSQL `TIMESTAMPTZ` keeps microseconds.
const STORED_SUBSEC_DIGITS: u16 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lifecycle {
    status: Status,
    status_update_timestamp: Option<Timestamp>,
    #[serde(skip)]
    track_status_changes: bool,
    #[serde(skip)]
    original_status: Status,
    #[serde(skip)]
    status_changed: bool,
}

impl Lifecycle {
    /// State for a freshly constructed, never-saved entity.
    pub fn new(status: Status, track_status_changes: bool) -> Self {
        Self::loaded(status, None, track_status_changes)
    }

    /// State for an entity materialized from storage.
    pub fn loaded(
        status: Status,
        status_update_timestamp: Option<Timestamp>,
        track_status_changes: bool,
    ) -> Self {
        Self {
            status,
            status_update_timestamp,
            track_status_changes,
            original_status: status,
            status_changed: false,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Change the in-memory status. Takes effect on the next save.
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn status_update_timestamp(&self) -> Option<Timestamp> {
        self.status_update_timestamp
    }

    /// Status as last persisted.
    pub fn original_status(&self) -> Status {
        self.original_status
    }

    /// Whether the most recent save stamped a transition.
    pub fn status_changed(&self) -> bool {
        self.status_changed
    }

    pub fn track_status_changes(&self) -> bool {
        self.track_status_changes
    }

    pub fn enable_status_change_tracking(&mut self) {
        self.track_status_changes = true;
    }

    pub fn disable_status_change_tracking(&mut self) {
        self.track_status_changes = false;
    }

    /// `true` when the next save will stamp a new transition timestamp.
    pub fn has_pending_transition(&self) -> bool {
        self.status != self.original_status || self.status_update_timestamp.is_none()
    }

    /// Stamp the transition timestamp if the status moved away from the
    /// persisted value or was never stamped. Returns whether it did.
    pub fn prepare_save(&mut self, now: Timestamp) -> bool {
        let changed = self.has_pending_transition();
        if changed {
            self.status_update_timestamp = Some(now.trunc_subsecs(STORED_SUBSEC_DIGITS));
        }
        self.status_changed = changed;
        changed
    }

    /// Record that the current status is now the persisted one.
    pub fn mark_persisted(&mut self) {
        self.original_status = self.status;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(Status::default(), true)
    }
}

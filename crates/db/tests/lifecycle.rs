//! Integration tests for single-entity lifecycle operations.
//!
//! Verifies that:
//! - Every transition stamps `status_update_timestamp` and records history
//! - Soft delete keeps the row; hard delete removes it
//! - `original_status` follows persistence, not in-memory edits
//! - Per-instance tracking can be switched off and back on

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Duration;
use sqlx::PgPool;
use stitch_core::status::Status;
use stitch_db::models::media_asset::MediaAsset;
use stitch_db::models::project::Project;
use stitch_db::models::stitcher::Stitcher;
use stitch_db::{StatusManager, StatusModel};

use common::*;

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_stamps_and_records(pool: PgPool) {
    let clock = frozen_clock();
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone()).with_clock(clock.clone());

    let project = create_project(&projects, owner.id.unwrap(), "First", Status::Enabled).await;

    assert!(project.id.is_some());
    assert_eq!(project.status(), Status::Enabled);
    assert_eq!(project.status_update_timestamp(), Some(frozen_instant()));
    assert_eq!(project.original_status(), Status::Enabled);

    let history = projects.history(&project).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].entity_type, "project");
    assert_eq!(history[0].entity_id, project.id.unwrap());
    assert_eq!(history[0].status, Status::Enabled);
    assert_eq!(history[0].timestamp, frozen_instant());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_with_initial_status(pool: PgPool) {
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone());

    let project = create_project(&projects, owner.id.unwrap(), "Draft", Status::Suspended).await;

    let loaded = projects.get(project.id.unwrap()).await.unwrap();
    assert_eq!(loaded.status(), Status::Suspended);
    assert_eq!(loaded.original_status(), Status::Suspended);
    assert_eq!(loaded.status_update_timestamp(), project.status_update_timestamp());
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_archive_records_matching_history(pool: PgPool) {
    let clock = frozen_clock();
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone()).with_clock(clock.clone());
    let mut project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;

    clock.advance(Duration::minutes(10));
    projects.archive(&mut project).await.unwrap();

    let loaded = projects.get(project.id.unwrap()).await.unwrap();
    assert_eq!(loaded.status(), Status::Archived);
    assert_eq!(
        loaded.status_update_timestamp(),
        Some(frozen_instant() + Duration::minutes(10))
    );

    let latest = projects.history(&project).await.unwrap().remove(0);
    assert_eq!(latest.status, Status::Archived);
    assert_eq!(Some(latest.timestamp), loaded.status_update_timestamp());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_enable_suspend_archive_cycle(pool: PgPool) {
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone());
    let mut project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;

    projects.suspend(&mut project).await.unwrap();
    assert_eq!(project.status(), Status::Suspended);
    projects.archive(&mut project).await.unwrap();
    assert_eq!(project.status(), Status::Archived);
    projects.enable(&mut project).await.unwrap();
    assert_eq!(project.status(), Status::Enabled);

    let statuses: Vec<Status> = projects
        .history(&project)
        .await
        .unwrap()
        .into_iter()
        .map(|change| change.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            Status::Enabled,
            Status::Archived,
            Status::Suspended,
            Status::Enabled
        ]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unchanged_save_keeps_timestamp(pool: PgPool) {
    let clock = frozen_clock();
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone()).with_clock(clock.clone());
    let mut project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;

    clock.advance(Duration::hours(1));
    project.title = "Renamed".to_string();
    projects.save(&mut project).await.unwrap();

    let loaded = projects.get(project.id.unwrap()).await.unwrap();
    assert_eq!(loaded.title, "Renamed");
    assert_eq!(loaded.status_update_timestamp(), Some(frozen_instant()));
    assert_eq!(history_rows(&pool, "project", project.id.unwrap()).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_original_status_follows_persistence(pool: PgPool) {
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone());
    let mut project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;

    project.set_status(Status::Suspended);
    assert_eq!(project.status(), Status::Suspended);
    assert_eq!(project.original_status(), Status::Enabled);

    projects.save(&mut project).await.unwrap();
    assert_eq!(project.original_status(), Status::Suspended);

    project.set_status(Status::Archived);
    project.set_status(Status::Suspended);
    projects.save(&mut project).await.unwrap();
    assert_eq!(history_rows(&pool, "project", project.id.unwrap()).await, 2);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_delete_keeps_row(pool: PgPool) {
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone());
    let mut project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;
    let id = project.id.unwrap();

    assert_eq!(projects.delete(&mut project).await.unwrap(), 1);
    assert_eq!(project.status(), Status::Deleted);

    // Hidden from default listings, still reachable by id.
    assert_eq!(projects.count(&projects.query()).await.unwrap(), 0);
    let loaded = projects.get(id).await.unwrap();
    assert_eq!(loaded.status(), Status::Deleted);
    assert_eq!(projects.count(&projects.deleted()).await.unwrap(), 1);

    let latest = projects.history(&project).await.unwrap().remove(0);
    assert_eq!(latest.status, Status::Deleted);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_restore_soft_deleted(pool: PgPool) {
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone());
    let mut project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;

    projects.delete(&mut project).await.unwrap();
    projects.enable(&mut project).await.unwrap();

    assert_eq!(projects.count(&projects.query()).await.unwrap(), 1);
    assert_eq!(history_rows(&pool, "project", project.id.unwrap()).await, 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_hard_delete_removes_row(pool: PgPool) {
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone());
    let project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;
    let id = project.id.unwrap();

    assert_eq!(projects.hard_delete(&project).await.unwrap(), 1);
    assert!(projects.find(id).await.unwrap().is_none());
    assert_matches!(projects.get(id).await, Err(sqlx::Error::RowNotFound));

    // The ledger outlives the entity.
    assert_eq!(history_rows(&pool, "project", id).await, 1);

    assert_matches!(
        projects.hard_delete(&project).await,
        Err(sqlx::Error::RowNotFound)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_hard_delete_unsaved_fails(pool: PgPool) {
    let projects = StatusManager::<Project>::new(pool.clone());
    let unsaved = Project::new(project_input(1, "Never saved", None)).unwrap();

    assert_matches!(
        projects.hard_delete(&unsaved).await,
        Err(sqlx::Error::RowNotFound)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_save_of_vanished_row_fails(pool: PgPool) {
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone());
    let mut project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;
    let id = project.id.unwrap();

    projects.hard_delete(&project).await.unwrap();
    project.set_status(Status::Archived);
    assert_matches!(
        projects.save(&mut project).await,
        Err(sqlx::Error::RowNotFound)
    );

    // The failed save rolled back its history row.
    assert_eq!(history_rows(&pool, "project", id).await, 1);
}

// ---------------------------------------------------------------------------
// Tracking
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tracking_toggle(pool: PgPool) {
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone());
    let mut project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;
    let id = project.id.unwrap();

    project.disable_status_change_tracking();
    projects.suspend(&mut project).await.unwrap();
    assert_eq!(history_rows(&pool, "project", id).await, 1);

    // The timestamp still moves when tracking is off.
    let loaded = projects.get(id).await.unwrap();
    assert_eq!(loaded.status(), Status::Suspended);
    assert!(loaded.status_update_timestamp().is_some());

    project.enable_status_change_tracking();
    projects.archive(&mut project).await.unwrap();
    assert_eq!(history_rows(&pool, "project", id).await, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_refresh_keeps_tracking_flag(pool: PgPool) {
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone());
    let mut project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;
    project.disable_status_change_tracking();

    let mut other = projects.get(project.id.unwrap()).await.unwrap();
    projects.archive(&mut other).await.unwrap();

    projects.refresh(&mut project).await.unwrap();
    assert_eq!(project.status(), Status::Archived);
    assert_eq!(project.original_status(), Status::Archived);
    assert!(!project.lifecycle().track_status_changes());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_untracked_type_writes_no_history(pool: PgPool) {
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone());
    let project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;

    let assets = StatusManager::<MediaAsset>::new(pool.clone());
    let mut asset = create_asset(&pool, project.id.unwrap(), "/media/cover.png").await;
    assets.archive(&mut asset).await.unwrap();

    assert_eq!(history_rows(&pool, "media_asset", asset.id.unwrap()).await, 0);
    assert!(asset.status_update_timestamp().is_some());

    // Opting in per instance works for untracked types.
    asset.enable_status_change_tracking();
    assets.enable(&mut asset).await.unwrap();
    assert_eq!(history_rows(&pool, "media_asset", asset.id.unwrap()).await, 1);
}

// ---------------------------------------------------------------------------
// History writer injection
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stitcher_lifecycle_uses_own_entity_type(pool: PgPool) {
    let clock = frozen_clock();
    let stitchers = StatusManager::<Stitcher>::new(pool.clone()).with_clock(clock.clone());
    let mut stitcher = stitchers
        .create(Stitcher::new(stitcher_input("bob")).unwrap())
        .await
        .unwrap();

    clock.advance(Duration::seconds(1));
    stitchers.suspend(&mut stitcher).await.unwrap();

    let history = stitchers.history(&stitcher).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|change| change.entity_type == "stitcher"));
    assert_eq!(history[0].status, Status::Suspended);
    assert_eq!(history[1].status, Status::Enabled);
}

#[derive(Debug, Default)]
struct RefusingWriter;

#[async_trait::async_trait]
impl stitch_db::history::HistoryWriter for RefusingWriter {
    async fn record(
        &self,
        _conn: &mut sqlx::PgConnection,
        _change: &stitch_db::models::status_change::NewStatusChange,
    ) -> Result<stitch_db::models::status_change::StatusChange, sqlx::Error> {
        Err(sqlx::Error::Protocol("history unavailable".into()))
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_history_failure_rolls_back_save(pool: PgPool) {
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone());
    let mut project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;
    let id = project.id.unwrap();

    let failing = projects.clone().with_history(Arc::new(RefusingWriter));
    assert!(failing.archive(&mut project).await.is_err());

    let loaded = projects.get(id).await.unwrap();
    assert_eq!(loaded.status(), Status::Enabled);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_create_can_be_retried(pool: PgPool) {
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone());
    let failing = projects.clone().with_history(Arc::new(RefusingWriter));

    let mut project =
        Project::new(project_input(owner.id.unwrap(), "Song", Some(Status::Enabled))).unwrap();
    assert!(failing.save(&mut project).await.is_err());

    // Nothing from the rolled-back insert sticks to the instance.
    assert!(project.id.is_none());
    assert!(project.created_at.is_none());
    assert!(project.status_update_timestamp().is_none());
    assert_eq!(projects.count(&projects.all()).await.unwrap(), 0);

    projects.save(&mut project).await.unwrap();
    let id = project.id.unwrap();
    assert_eq!(projects.get(id).await.unwrap().status(), Status::Enabled);
    assert_eq!(history_rows(&pool, "project", id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_transition_can_be_retried(pool: PgPool) {
    let clock = frozen_clock();
    let owner = create_stitcher(&pool, "alice").await;
    let projects = StatusManager::<Project>::new(pool.clone()).with_clock(clock.clone());
    let mut project = create_project(&projects, owner.id.unwrap(), "Song", Status::Enabled).await;
    let id = project.id.unwrap();

    clock.advance(Duration::minutes(5));
    let failing = projects.clone().with_history(Arc::new(RefusingWriter));
    assert!(failing.archive(&mut project).await.is_err());

    // The requested status is still pending against the persisted one.
    assert_eq!(project.status(), Status::Archived);
    assert_eq!(project.original_status(), Status::Enabled);
    assert_eq!(project.status_update_timestamp(), Some(frozen_instant()));

    projects.save(&mut project).await.unwrap();
    let loaded = projects.get(id).await.unwrap();
    assert_eq!(loaded.status(), Status::Archived);
    assert_eq!(
        loaded.status_update_timestamp(),
        Some(frozen_instant() + Duration::minutes(5))
    );

    let history = projects.history(&project).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, Status::Archived);
}

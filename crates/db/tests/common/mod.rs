//! Shared fixtures for the lifecycle integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use sqlx::PgPool;
use stitch_core::assets::AssetKind;
use stitch_core::clock::FixedClock;
use stitch_core::status::Status;
use stitch_core::types::{DbId, Timestamp};
use stitch_db::models::media_asset::{CreateMediaAsset, MediaAsset};
use stitch_db::models::project::{CreateProject, Project};
use stitch_db::models::stitcher::{CreateStitcher, Stitcher};
use stitch_db::StatusManager;

/// 2020-01-01T00:00:00Z, the instant fixed clocks start at.
pub fn frozen_instant() -> Timestamp {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

pub fn frozen_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(frozen_instant()))
}

pub fn stitcher_input(username: &str) -> CreateStitcher {
    CreateStitcher {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        motto: None,
        status: None,
    }
}

pub fn project_input(owner_id: DbId, title: &str, status: Option<Status>) -> CreateProject {
    CreateProject {
        owner_id,
        title: title.to_string(),
        description: None,
        kind: None,
        status,
    }
}

pub async fn create_stitcher(pool: &PgPool, username: &str) -> Stitcher {
    StatusManager::<Stitcher>::new(pool.clone())
        .create(Stitcher::new(stitcher_input(username)).unwrap())
        .await
        .unwrap()
}

pub async fn create_project(
    manager: &StatusManager<Project>,
    owner_id: DbId,
    title: &str,
    status: Status,
) -> Project {
    manager
        .create(Project::new(project_input(owner_id, title, Some(status))).unwrap())
        .await
        .unwrap()
}

/// Five projects in each of the four statuses, created through `manager`.
pub async fn seed_projects(manager: &StatusManager<Project>, owner_id: DbId) -> Vec<Project> {
    let mut projects = Vec::new();
    for &status in Status::ALL {
        for i in 0..5 {
            let title = format!("{} {i}", status.name());
            projects.push(create_project(manager, owner_id, &title, status).await);
        }
    }
    projects
}

pub async fn create_asset(pool: &PgPool, project_id: DbId, file_path: &str) -> MediaAsset {
    let input = CreateMediaAsset {
        project_id,
        kind: AssetKind::Image,
        file_path: file_path.to_string(),
        content_type: "image/png".to_string(),
        size_bytes: 1024,
        status: None,
    };
    StatusManager::<MediaAsset>::new(pool.clone())
        .create(MediaAsset::new(input).unwrap())
        .await
        .unwrap()
}

/// Raw count of history rows for one entity, bypassing the repository.
pub async fn history_rows(pool: &PgPool, entity_type: &str, entity_id: DbId) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM status_changes WHERE entity_type = $1 AND entity_id = $2",
    )
    .bind(entity_type)
    .bind(entity_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

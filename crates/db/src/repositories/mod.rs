//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` (or a `&mut PgConnection` when they must join the
//! caller's transaction) as the first argument. Entity repositories also
//! hold the entity's [`StatusModel`](crate::StatusModel) row SQL.

pub mod media_asset_repo;
pub mod project_repo;
pub mod status_change_repo;
pub mod stitcher_repo;

pub use media_asset_repo::MediaAssetRepo;
pub use project_repo::ProjectRepo;
pub use status_change_repo::StatusChangeRepo;
pub use stitcher_repo::StitcherRepo;

//! Domain model structs and DTOs.
//!
//! Each status-bearing entity module contains:
//! - The entity struct with its embedded [`Lifecycle`](stitch_core::lifecycle::Lifecycle)
//!   and a `FromRow` impl that initializes it from the row
//! - A `Deserialize` create DTO, validated when the entity is constructed
//! - A `Deserialize` bulk-update DTO (all `Option` fields) implementing
//!   [`FieldChanges`](crate::query::FieldChanges)

pub mod media_asset;
pub mod project;
pub mod status_change;
pub mod stitcher;

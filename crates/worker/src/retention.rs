//! Periodic purge of long-deleted rows.
//!
//! Rows that have been DELETED for longer than the retention window are
//! hard-deleted, per entity type, children first. A row that still has
//! children of any status is kept until those children are purged, so the
//! cascading foreign keys never remove a live row. Status history is left in
//! place so the ledger outlives the entities it describes.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use stitch_core::types::Timestamp;
use stitch_db::models::media_asset::MediaAsset;
use stitch_db::models::project::Project;
use stitch_db::models::stitcher::Stitcher;
use stitch_db::{DeletionSummary, StatusManager, StatusModel};
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;

/// Outcome of one purge run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub deleted: u64,
    pub per_type: BTreeMap<String, u64>,
}

impl PurgeReport {
    fn absorb(&mut self, summary: DeletionSummary) {
        self.deleted += summary.deleted;
        for (entity_type, count) in summary.per_type {
            *self.per_type.entry(entity_type).or_default() += count;
        }
    }
}

/// Hard-delete every row soft-deleted strictly before `cutoff`.
pub async fn purge_once(pool: &PgPool, cutoff: Timestamp) -> Result<PurgeReport, sqlx::Error> {
    let mut report = PurgeReport::default();
    report.absorb(purge_type::<MediaAsset>(pool, cutoff, &[]).await?);
    report.absorb(purge_type::<Project>(pool, cutoff, &[("media_assets", "project_id")]).await?);
    report.absorb(purge_type::<Stitcher>(pool, cutoff, &[("projects", "owner_id")]).await?);
    Ok(report)
}

/// `children` lists the `(table, foreign key column)` pairs referencing `T`.
async fn purge_type<T: StatusModel>(
    pool: &PgPool,
    cutoff: Timestamp,
    children: &[(&'static str, &'static str)],
) -> Result<DeletionSummary, sqlx::Error> {
    let manager = StatusManager::<T>::new(pool.clone());
    let expired = children.iter().fold(
        manager.deleted().status_updated_before(cutoff),
        |query, &(table, fk)| query.without_children(table, fk),
    );
    manager.hard_delete_matching(&expired).await
}

/// Run the purge loop until `cancel` is triggered.
///
/// A failed run is logged and retried on the next tick.
pub async fn run(pool: PgPool, config: WorkerConfig, cancel: CancellationToken) {
    tracing::info!(
        retention_days = config.retention_days,
        interval_secs = config.interval_secs,
        "Purge job started"
    );

    let mut interval = tokio::time::interval(config.interval());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Purge job stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - config.retention();
                match purge_once(&pool, cutoff).await {
                    Ok(report) if report.deleted > 0 => {
                        tracing::info!(
                            deleted = report.deleted,
                            per_type = ?report.per_type,
                            %cutoff,
                            "Purge: removed expired rows"
                        );
                    }
                    Ok(_) => {
                        tracing::debug!(%cutoff, "Purge: no rows to remove");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Purge: run failed");
                    }
                }
            }
        }
    }
}

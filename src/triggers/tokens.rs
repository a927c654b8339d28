//! Scheduled purge of push tokens that have not been refreshed in a while

use super::schedule::Schedule;
use crate::store::{DocumentStore, MAX_BATCH_SIZE};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub const DEFAULT_STALE_AFTER_DAYS: i64 = 30;
/// Upper bound on the staleness window, ten years
pub const MAX_STALE_AFTER_DAYS: i64 = 3650;

/// Summary of one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub total: usize,
    pub stale: usize,
    pub deleted: usize,
    pub batches: usize,
}

#[derive(Clone)]
pub struct TokenSweeper {
    store: Arc<dyn DocumentStore>,
    stale_after: Duration,
    batch_size: usize,
}

impl TokenSweeper {
    pub fn new(store: Arc<dyn DocumentStore>, stale_after_days: i64, batch_size: usize) -> Self {
        Self {
            store,
            stale_after: Duration::days(stale_after_days.clamp(1, MAX_STALE_AFTER_DAYS)),
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    /// Delete every token last refreshed before `now - stale_after`.
    ///
    /// Batches are committed one after another; a failing batch stops the
    /// sweep and earlier batches stay deleted.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let cutoff = now - self.stale_after;
        info!(cutoff = %cutoff.to_rfc3339(), "Starting stale push token cleanup");

        let total = self
            .store
            .count_push_tokens()
            .await
            .context("Failed to count push tokens")?;
        info!(total, "Push tokens in store");

        let stale = self
            .store
            .list_stale_push_tokens(cutoff)
            .await
            .context("Failed to query stale push tokens")?;
        info!(stale = stale.len(), "Stale push tokens found");

        let mut report = SweepReport {
            total,
            stale: stale.len(),
            ..Default::default()
        };
        if stale.is_empty() {
            info!("No stale tokens to delete");
            return Ok(report);
        }

        for batch in stale.chunks(self.batch_size) {
            let deleted = self
                .store
                .delete_push_tokens(batch)
                .await
                .with_context(|| format!("Failed to commit token batch {}", report.batches + 1))?;
            report.batches += 1;
            report.deleted += deleted;
            info!(batch = report.batches, deleted, "Deleted batch of stale tokens");
        }

        info!(
            deleted = report.deleted,
            batches = report.batches,
            "Stale push token cleanup finished"
        );
        Ok(report)
    }

    /// Run the sweep forever on `schedule`. Failures are logged and the
    /// loop waits for the next tick.
    pub fn start(self, schedule: Schedule) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(schedule = %schedule, "Token cleanup scheduled (UTC)");
            loop {
                let wait = schedule.until_next(Utc::now());
                tokio::time::sleep(wait).await;

                if let Err(e) = self.sweep(Utc::now()).await {
                    error!("Error cleaning up stale tokens: {:#}", e);
                }
            }
        })
    }
}

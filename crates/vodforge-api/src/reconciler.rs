//! Background service for recovering orphaned transcode jobs.
//!
//! A worker that crashes mid-transcode never posts its completion callback,
//! so its record stays PROCESSING and its admission slot stays taken. This
//! service sweeps periodically, pushes jobs stuck past the deadline back
//! into the queue, and frees their slots.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info, warn};

use crate::metrics;
use crate::scheduler::Scheduler;
use crate::store::MetadataStore;

/// Orphaned job reconciler service.
pub struct Reconciler {
    scheduler: Arc<Scheduler>,
    store: Arc<dyn MetadataStore>,
    sweep_interval: Duration,
    processing_deadline: Duration,
    enabled: bool,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(
        scheduler: Arc<Scheduler>,
        store: Arc<dyn MetadataStore>,
        sweep_interval: Duration,
        processing_deadline: Duration,
    ) -> Self {
        // Check if reconciliation is enabled via environment variable
        let enabled = std::env::var("ENABLE_RECONCILER")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true); // Enabled by default

        Self {
            scheduler,
            store,
            sweep_interval,
            processing_deadline,
            enabled,
        }
    }

    /// Start the background sweep loop.
    ///
    /// This function runs indefinitely and should be spawned as a background task.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Orphan reconciliation is disabled");
            return;
        }

        info!(
            "Starting orphan reconciler (interval: {:?}, deadline: {:?})",
            self.sweep_interval, self.processing_deadline
        );

        let mut ticker = interval(self.sweep_interval);

        loop {
            ticker.tick().await;

            if let Err(e) = self.sweep().await {
                error!("Orphan reconciliation error: {}", e);
            }
        }
    }

    /// Run a single sweep and recovery cycle.
    pub async fn sweep(&self) -> anyhow::Result<u32> {
        let keys = self.store.processing_keys().await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let deadline_secs = self.processing_deadline.as_secs() as i64;
        let now = chrono::Utc::now();
        let mut recovered = 0u32;

        for object_key in keys {
            let Some(record) = self.store.find(&object_key).await? else {
                // Index entry without a record; nothing left to recover.
                continue;
            };

            if record.progress.is_terminal() {
                continue;
            }
            if record.age_in_state_secs(now) < deadline_secs {
                continue;
            }

            warn!(
                object_key = %object_key,
                stuck_secs = record.age_in_state_secs(now),
                "Detected orphaned job, requeueing"
            );

            match self.scheduler.requeue_orphan(&object_key).await {
                Ok(()) => {
                    recovered += 1;
                    metrics::record_job_requeued();
                    info!(object_key = %object_key, "Recovered orphaned job");
                }
                Err(e) => {
                    error!(object_key = %object_key, "Failed to recover orphaned job: {}", e);
                }
            }
        }

        if recovered > 0 {
            info!("Orphan reconciliation complete: {} recovered", recovered);
            // Recovered slots may open room for the queue.
            self.scheduler.drain().await?;
        }

        Ok(recovered)
    }
}

//! Admission-controlled job scheduling.
//!
//! At most `max_concurrent_jobs` transcodes run at once; excess jobs wait in
//! the shared FIFO queue. API instances coordinate only through the atomic
//! counter and queue primitives of the backing store, so every capacity
//! decision here is made with a slot reservation: INCR first, compare the
//! returned value against the ceiling, DECR to roll back. The counter is
//! never read-modify-written.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use vodforge_models::{CompletionReport, ProgressState, TranscodeJob};
use vodforge_queue::{AdmissionCounter, JobQueue, QueueResult};

use crate::error::{ApiError, ApiResult};
use crate::launcher::Launch;
use crate::metrics;
use crate::store::MetadataStore;

/// Atomic counter and queue operations against the shared store.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Atomic increment, returning the new counter value.
    async fn increment(&self) -> QueueResult<i64>;
    /// Atomic decrement, returning the new counter value.
    async fn decrement(&self) -> QueueResult<i64>;
    /// Current counter value.
    async fn count(&self) -> QueueResult<i64>;
    /// Reset the counter to zero (self-healing clamp only).
    async fn reset(&self) -> QueueResult<()>;
    /// Push a job onto the queue tail.
    async fn queue_push(&self, job: &TranscodeJob) -> QueueResult<()>;
    /// Pop the job at the queue head.
    async fn queue_pop(&self) -> QueueResult<Option<TranscodeJob>>;
    /// Number of queued jobs.
    async fn queue_len(&self) -> QueueResult<u64>;
}

/// Production slot store over the Redis counter and queue clients.
pub struct RedisSlotStore {
    counter: AdmissionCounter,
    queue: JobQueue,
}

impl RedisSlotStore {
    pub fn new(counter: AdmissionCounter, queue: JobQueue) -> Self {
        Self { counter, queue }
    }
}

#[async_trait]
impl SlotStore for RedisSlotStore {
    async fn increment(&self) -> QueueResult<i64> {
        self.counter.increment().await
    }

    async fn decrement(&self) -> QueueResult<i64> {
        self.counter.decrement().await
    }

    async fn count(&self) -> QueueResult<i64> {
        self.counter.get().await
    }

    async fn reset(&self) -> QueueResult<()> {
        self.counter.reset().await
    }

    async fn queue_push(&self, job: &TranscodeJob) -> QueueResult<()> {
        self.queue.enqueue(job).await
    }

    async fn queue_pop(&self) -> QueueResult<Option<TranscodeJob>> {
        self.queue.dequeue().await
    }

    async fn queue_len(&self) -> QueueResult<u64> {
        self.queue.len().await
    }
}

/// Outcome of an admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Admission {
    /// A worker was launched immediately
    Launched,
    /// Capacity was exhausted; the job waits in the queue
    Queued,
}

/// What one drain cycle did, reported in a single response.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainSummary {
    /// Object keys for which workers were launched
    pub launched: Vec<String>,
    /// Object keys whose launch was rejected and that went back to the queue
    pub requeued: Vec<String>,
    /// Whether the negative-counter clamp fired
    pub clamped: bool,
}

/// The admission controller and completion handler.
pub struct Scheduler {
    slots: Arc<dyn SlotStore>,
    launcher: Arc<dyn Launch>,
    store: Arc<dyn MetadataStore>,
    max_concurrent_jobs: i64,
}

impl Scheduler {
    pub fn new(
        slots: Arc<dyn SlotStore>,
        launcher: Arc<dyn Launch>,
        store: Arc<dyn MetadataStore>,
        max_concurrent_jobs: i64,
    ) -> Self {
        Self {
            slots,
            launcher,
            store,
            max_concurrent_jobs,
        }
    }

    /// Admit a new job: launch immediately when a slot is free, queue
    /// otherwise.
    ///
    /// The slot is reserved with an atomic increment before launching; a
    /// rejected launch rolls the reservation back and queues the job
    /// instead, so no capacity is leaked.
    pub async fn admit(&self, job: TranscodeJob) -> ApiResult<Admission> {
        let admission = self.admit_inner(job).await?;
        self.publish_gauges().await;
        Ok(admission)
    }

    async fn admit_inner(&self, job: TranscodeJob) -> ApiResult<Admission> {
        let reserved = self.slots.increment().await?;
        if reserved > self.max_concurrent_jobs {
            self.slots.decrement().await?;
            return self.queue_job(job).await;
        }

        match self.launch_job(job).await {
            Ok(object_key) => {
                metrics::record_job_admitted();
                info!(object_key = %object_key, "Transcoding started");
                Ok(Admission::Launched)
            }
            Err((job, e)) => {
                // Compensate: free the reserved slot and queue the job so
                // it is retried on the next drain.
                error!(object_key = %job.object_key, "Launch failed, requeueing: {}", e);
                metrics::record_launch_failure();
                self.slots.decrement().await?;
                self.queue_job(job).await
            }
        }
    }

    /// Handle a worker completion callback, then drain the queue up to the
    /// freed capacity.
    ///
    /// The decrement is unconditional: failed jobs vacate their slot like
    /// completed ones.
    pub async fn complete(&self, report: &CompletionReport) -> ApiResult<DrainSummary> {
        let record = self.store.apply_completion(report).await?;
        match report.progress {
            ProgressState::Completed => metrics::record_job_completed(),
            _ => metrics::record_job_failed(),
        }
        info!(
            object_key = %record.object_key,
            progress = %record.progress,
            "Worker reported completion"
        );

        self.slots.decrement().await?;
        self.drain().await
    }

    /// Pull queued jobs into running state while capacity is free.
    ///
    /// Each iteration re-reserves a slot atomically, so overlapping drain
    /// cycles from racing completion callbacks still converge on the
    /// capacity ceiling. A launch rejection for one dequeued job is
    /// compensated and does not abort the remaining slots.
    pub async fn drain(&self) -> ApiResult<DrainSummary> {
        let summary = self.drain_inner().await?;
        self.publish_gauges().await;
        Ok(summary)
    }

    async fn drain_inner(&self) -> ApiResult<DrainSummary> {
        let mut summary = DrainSummary::default();

        // Lost decrements and duplicate callbacks can push the counter
        // negative; clamp before computing capacity.
        let count = self.slots.count().await?;
        if count < 0 {
            warn!(count, "Negative admission counter, clamping to 0");
            self.slots.reset().await?;
            summary.clamped = true;
        }

        if self.slots.queue_len().await? == 0 {
            return Ok(summary);
        }

        // Upper bound only; the real guard is the per-iteration reservation.
        let count = self.slots.count().await?.max(0);
        let available = (self.max_concurrent_jobs - count).max(0);

        for _ in 0..available {
            let reserved = self.slots.increment().await?;
            if reserved > self.max_concurrent_jobs {
                self.slots.decrement().await?;
                break;
            }

            let Some(job) = self.slots.queue_pop().await? else {
                // Queue emptied mid-loop; give the slot back and stop.
                self.slots.decrement().await?;
                break;
            };

            match self.launch_job(job).await {
                Ok(object_key) => {
                    metrics::record_job_admitted();
                    summary.launched.push(object_key);
                }
                Err((job, e)) => {
                    error!(
                        object_key = %job.object_key,
                        "Drain launch failed, requeueing: {}", e
                    );
                    metrics::record_launch_failure();
                    self.slots.decrement().await?;
                    let object_key = job.object_key.clone();
                    self.requeue(job).await?;
                    summary.requeued.push(object_key);
                }
            }
        }

        if !summary.launched.is_empty() {
            info!(launched = summary.launched.len(), "Drained queued jobs");
        }
        Ok(summary)
    }

    /// Requeue jobs that sat in PROCESSING past the deadline (reconciler).
    pub async fn requeue_orphan(&self, object_key: &str) -> ApiResult<()> {
        let record = self
            .store
            .update_progress(object_key, ProgressState::Queued)
            .await?;
        let job = TranscodeJob {
            filename: record.filename,
            object_key: record.object_key,
            progress: ProgressState::Queued,
        };
        self.slots.queue_push(&job).await?;
        // The orphan held a slot nobody will release; give it back.
        self.slots.decrement().await?;
        Ok(())
    }

    /// Refresh the active/queued gauges after any capacity movement.
    async fn publish_gauges(&self) {
        if let (Ok(active), Ok(queued)) =
            (self.slots.count().await, self.slots.queue_len().await)
        {
            metrics::set_active_jobs(active);
            metrics::set_queue_length(queued);
        }
    }

    /// Launch with the slot already reserved; marks the record PROCESSING
    /// on acknowledgment. Returns the job back to the caller on failure so
    /// it can be compensated.
    async fn launch_job(
        &self,
        job: TranscodeJob,
    ) -> Result<String, (TranscodeJob, crate::launcher::LaunchError)> {
        let job = job.with_progress(ProgressState::Processing);
        if let Err(e) = self.launcher.launch(&job).await {
            return Err((job, e));
        }
        let object_key = job.object_key.clone();
        if let Err(e) = self
            .store
            .update_progress(&object_key, ProgressState::Processing)
            .await
        {
            // The worker is already running; the record catches up when it
            // reports completion.
            warn!(object_key = %object_key, "Failed to persist PROCESSING: {}", e);
        }
        Ok(object_key)
    }

    async fn queue_job(&self, job: TranscodeJob) -> ApiResult<Admission> {
        let object_key = job.object_key.clone();
        self.requeue(job).await?;
        metrics::record_job_queued();
        info!(object_key = %object_key, "Transcoding queued");
        Ok(Admission::Queued)
    }

    async fn requeue(&self, job: TranscodeJob) -> ApiResult<()> {
        let job = job.with_progress(ProgressState::Queued);
        self.slots.queue_push(&job).await?;
        self.store
            .update_progress(&job.object_key, ProgressState::Queued)
            .await
            .map_err(ApiError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::Mutex;

    use vodforge_models::{LinkMap, VideoRecord};
    use vodforge_queue::QueueError;

    const MAX: i64 = 5;

    /// In-memory counter + queue with the same atomicity as the Redis ops.
    #[derive(Default)]
    struct MemorySlots {
        count: Mutex<i64>,
        queue: Mutex<VecDeque<TranscodeJob>>,
        peak: Mutex<i64>,
    }

    impl MemorySlots {
        fn peak(&self) -> i64 {
            *self.peak.lock().unwrap()
        }
    }

    #[async_trait]
    impl SlotStore for MemorySlots {
        async fn increment(&self) -> QueueResult<i64> {
            let mut count = self.count.lock().unwrap();
            *count += 1;
            let mut peak = self.peak.lock().unwrap();
            *peak = (*peak).max(*count);
            Ok(*count)
        }

        async fn decrement(&self) -> QueueResult<i64> {
            let mut count = self.count.lock().unwrap();
            *count -= 1;
            Ok(*count)
        }

        async fn count(&self) -> QueueResult<i64> {
            Ok(*self.count.lock().unwrap())
        }

        async fn reset(&self) -> QueueResult<()> {
            *self.count.lock().unwrap() = 0;
            Ok(())
        }

        async fn queue_push(&self, job: &TranscodeJob) -> QueueResult<()> {
            self.queue.lock().unwrap().push_back(job.clone());
            Ok(())
        }

        async fn queue_pop(&self) -> QueueResult<Option<TranscodeJob>> {
            Ok(self.queue.lock().unwrap().pop_front())
        }

        async fn queue_len(&self) -> QueueResult<u64> {
            Ok(self.queue.lock().unwrap().len() as u64)
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<HashMap<String, VideoRecord>>,
    }

    impl MemoryStore {
        fn seed(&self, object_key: &str) {
            let record = VideoRecord::new(object_key, object_key, "user", "title", "");
            self.records
                .lock()
                .unwrap()
                .insert(object_key.to_string(), record);
        }

        fn progress_of(&self, object_key: &str) -> ProgressState {
            self.records.lock().unwrap()[object_key].progress
        }
    }

    #[async_trait]
    impl MetadataStore for MemoryStore {
        async fn find(&self, object_key: &str) -> QueueResult<Option<VideoRecord>> {
            Ok(self.records.lock().unwrap().get(object_key).cloned())
        }

        async fn upsert(&self, record: &VideoRecord) -> QueueResult<()> {
            self.records
                .lock()
                .unwrap()
                .insert(record.object_key.clone(), record.clone());
            Ok(())
        }

        async fn update_progress(
            &self,
            object_key: &str,
            progress: ProgressState,
        ) -> QueueResult<VideoRecord> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(object_key)
                .ok_or_else(|| QueueError::record_not_found(object_key))?;
            record.set_progress(progress);
            Ok(record.clone())
        }

        async fn apply_completion(&self, report: &CompletionReport) -> QueueResult<VideoRecord> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(&report.object_key)
                .ok_or_else(|| QueueError::record_not_found(&report.object_key))?;
            record.renditions = report.video_resolutions.clone();
            record.subtitle_url = report.subtitle_url.clone();
            record.thumbnail_url = report.thumbnail_url.clone();
            record.set_progress(report.progress);
            Ok(record.clone())
        }

        async fn processing_keys(&self) -> QueueResult<Vec<String>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.progress == ProgressState::Processing)
                .map(|r| r.object_key.clone())
                .collect())
        }
    }

    /// Records launch order; configurable per-key rejections.
    #[derive(Default)]
    struct RecordingLauncher {
        launched: Mutex<Vec<String>>,
        reject: Mutex<HashSet<String>>,
    }

    impl RecordingLauncher {
        fn launched(&self) -> Vec<String> {
            self.launched.lock().unwrap().clone()
        }

        fn reject_key(&self, key: &str) {
            self.reject.lock().unwrap().insert(key.to_string());
        }
    }

    #[async_trait]
    impl Launch for RecordingLauncher {
        async fn launch(&self, job: &TranscodeJob) -> crate::launcher::LaunchResult {
            if self.reject.lock().unwrap().remove(&job.object_key) {
                return Err(crate::launcher::LaunchError::Rejected("no capacity".into()));
            }
            self.launched.lock().unwrap().push(job.object_key.clone());
            Ok(())
        }
    }

    struct Harness {
        slots: Arc<MemorySlots>,
        store: Arc<MemoryStore>,
        launcher: Arc<RecordingLauncher>,
        scheduler: Scheduler,
    }

    fn harness() -> Harness {
        let slots = Arc::new(MemorySlots::default());
        let store = Arc::new(MemoryStore::default());
        let launcher = Arc::new(RecordingLauncher::default());
        let scheduler = Scheduler::new(
            slots.clone(),
            launcher.clone(),
            store.clone(),
            MAX,
        );
        Harness {
            slots,
            store,
            launcher,
            scheduler,
        }
    }

    fn job(key: &str) -> TranscodeJob {
        TranscodeJob::from_key(key)
    }

    async fn submit(h: &Harness, key: &str) -> Admission {
        h.store.seed(key);
        h.scheduler.admit(job(key)).await.unwrap()
    }

    fn completed(key: &str) -> CompletionReport {
        CompletionReport::completed(key, LinkMap::new(), None)
    }

    #[tokio::test]
    async fn admit_under_capacity_launches() {
        let h = harness();
        let admission = submit(&h, "uploads/videos/a.mp4").await;

        assert_eq!(admission, Admission::Launched);
        assert_eq!(h.slots.count().await.unwrap(), 1);
        assert_eq!(h.launcher.launched(), vec!["uploads/videos/a.mp4"]);
        assert_eq!(
            h.store.progress_of("uploads/videos/a.mp4"),
            ProgressState::Processing
        );
    }

    #[tokio::test]
    async fn admit_at_capacity_queues() {
        let h = harness();
        for i in 0..MAX {
            submit(&h, &format!("v/{i}.mp4")).await;
        }

        let admission = submit(&h, "v/overflow.mp4").await;
        assert_eq!(admission, Admission::Queued);
        assert_eq!(h.slots.count().await.unwrap(), MAX);
        assert_eq!(h.slots.queue_len().await.unwrap(), 1);
        assert_eq!(h.store.progress_of("v/overflow.mp4"), ProgressState::Queued);
    }

    #[tokio::test]
    async fn seven_jobs_five_run_two_wait_fifo() {
        let h = harness();
        let mut admissions = Vec::new();
        for i in 0..7 {
            admissions.push(submit(&h, &format!("v/{i}.mp4")).await);
        }

        let launched = admissions
            .iter()
            .filter(|a| **a == Admission::Launched)
            .count();
        assert_eq!(launched, 5);
        assert_eq!(h.slots.queue_len().await.unwrap(), 2);
        assert_eq!(h.slots.count().await.unwrap(), MAX);

        // One completion frees exactly one slot for the earliest queued job.
        let summary = h.scheduler.complete(&completed("v/0.mp4")).await.unwrap();
        assert_eq!(summary.launched, vec!["v/5.mp4"]);
        assert_eq!(h.slots.count().await.unwrap(), MAX);
        assert_eq!(h.slots.queue_len().await.unwrap(), 1);
        assert_eq!(h.store.progress_of("v/5.mp4"), ProgressState::Processing);
        assert_eq!(h.store.progress_of("v/6.mp4"), ProgressState::Queued);
        assert_eq!(h.store.progress_of("v/0.mp4"), ProgressState::Completed);
    }

    #[tokio::test]
    async fn counter_never_exceeds_capacity_under_concurrent_admits() {
        let h = harness();
        for i in 0..12 {
            h.store.seed(&format!("v/{i}.mp4"));
        }

        let mut handles = Vec::new();
        let scheduler = Arc::new(h.scheduler);
        for i in 0..12 {
            let scheduler = scheduler.clone();
            handles.push(tokio::spawn(async move {
                scheduler.admit(job(&format!("v/{i}.mp4"))).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(h.slots.peak() <= MAX, "peak {} exceeded {}", h.slots.peak(), MAX);
        assert_eq!(h.slots.count().await.unwrap(), MAX);
        assert_eq!(h.slots.queue_len().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn drain_preserves_fifo_order() {
        let h = harness();
        for i in 0..8 {
            submit(&h, &format!("v/{i}.mp4")).await;
        }
        // v/5, v/6, v/7 queued in that order.

        h.scheduler.complete(&completed("v/0.mp4")).await.unwrap();
        h.scheduler.complete(&completed("v/1.mp4")).await.unwrap();
        h.scheduler.complete(&completed("v/2.mp4")).await.unwrap();

        let order = h.launcher.launched();
        let drained: Vec<_> = order.iter().skip(5).cloned().collect();
        assert_eq!(drained, vec!["v/5.mp4", "v/6.mp4", "v/7.mp4"]);
    }

    #[tokio::test]
    async fn drain_with_empty_queue_leaves_counter_unchanged() {
        let h = harness();
        for i in 0..3 {
            submit(&h, &format!("v/{i}.mp4")).await;
        }

        let summary = h.scheduler.drain().await.unwrap();
        assert!(summary.launched.is_empty());
        assert!(!summary.clamped);
        assert_eq!(h.slots.count().await.unwrap(), 3);
        assert_eq!(h.launcher.launched().len(), 3);
    }

    #[tokio::test]
    async fn negative_counter_is_clamped_to_zero() {
        let h = harness();
        h.slots.decrement().await.unwrap();
        h.slots.decrement().await.unwrap();
        assert_eq!(h.slots.count().await.unwrap(), -2);

        let summary = h.scheduler.drain().await.unwrap();
        assert!(summary.clamped);
        assert_eq!(h.slots.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejected_launch_is_compensated_into_queue() {
        let h = harness();
        h.store.seed("v/bad.mp4");
        h.launcher.reject_key("v/bad.mp4");

        let admission = h.scheduler.admit(job("v/bad.mp4")).await.unwrap();
        assert_eq!(admission, Admission::Queued);
        assert_eq!(h.slots.count().await.unwrap(), 0);
        assert_eq!(h.slots.queue_len().await.unwrap(), 1);
        assert_eq!(h.store.progress_of("v/bad.mp4"), ProgressState::Queued);
    }

    #[tokio::test]
    async fn drain_launch_failure_does_not_abort_remaining_slots() {
        let h = harness();
        for i in 0..MAX {
            submit(&h, &format!("v/{i}.mp4")).await;
        }
        submit(&h, "v/flaky.mp4").await;
        submit(&h, "v/steady.mp4").await;
        h.launcher.reject_key("v/flaky.mp4");

        h.scheduler.complete(&completed("v/0.mp4")).await.unwrap();
        let summary = h.scheduler.complete(&completed("v/1.mp4")).await.unwrap();

        // flaky was requeued by the first drain; steady launched anyway.
        let all: Vec<_> = h.launcher.launched();
        assert!(all.contains(&"v/steady.mp4".to_string()));
        assert_eq!(h.store.progress_of("v/steady.mp4"), ProgressState::Processing);
        // flaky eventually drains too (second rejection was consumed).
        assert!(
            summary.launched.contains(&"v/flaky.mp4".to_string())
                || h.slots.queue_len().await.unwrap() > 0
        );
        assert!(h.slots.peak() <= MAX);
    }

    #[tokio::test]
    async fn failed_jobs_also_vacate_their_slot() {
        let h = harness();
        for i in 0..MAX {
            submit(&h, &format!("v/{i}.mp4")).await;
        }
        submit(&h, "v/waiting.mp4").await;

        let summary = h
            .scheduler
            .complete(&CompletionReport::failed("v/0.mp4"))
            .await
            .unwrap();

        assert_eq!(h.store.progress_of("v/0.mp4"), ProgressState::Failed);
        assert_eq!(summary.launched, vec!["v/waiting.mp4"]);
        assert_eq!(h.slots.count().await.unwrap(), MAX);
    }

    #[tokio::test]
    async fn end_to_end_admit_complete_convergence() {
        let h = harness();

        let first = submit(&h, "uploads/videos/a.mp4").await;
        assert_eq!(first, Admission::Launched);
        assert_eq!(h.slots.count().await.unwrap(), 1);

        let mut queued = 0;
        for i in 0..5 {
            if submit(&h, &format!("uploads/videos/b{i}.mp4")).await == Admission::Queued {
                queued += 1;
            }
        }
        assert_eq!(queued, 1);
        assert_eq!(h.slots.count().await.unwrap(), MAX);

        let summary = h
            .scheduler
            .complete(&completed("uploads/videos/a.mp4"))
            .await
            .unwrap();
        assert_eq!(summary.launched.len(), 1);
        assert_eq!(h.slots.count().await.unwrap(), MAX);
        assert_eq!(h.slots.queue_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn requeue_orphan_frees_slot_and_requeues() {
        let h = harness();
        submit(&h, "v/stuck.mp4").await;
        assert_eq!(h.slots.count().await.unwrap(), 1);

        h.scheduler.requeue_orphan("v/stuck.mp4").await.unwrap();
        assert_eq!(h.slots.count().await.unwrap(), 0);
        assert_eq!(h.slots.queue_len().await.unwrap(), 1);
        assert_eq!(h.store.progress_of("v/stuck.mp4"), ProgressState::Queued);
    }
}

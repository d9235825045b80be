//! Application state.

use std::sync::Arc;

use vodforge_queue::{redis_client_from_env, AdmissionCounter, JobQueue, RecordStore, QUEUE_KEY};

use crate::config::ApiConfig;
use crate::launcher::{EcsLauncher, LauncherConfig};
use crate::scheduler::{RedisSlotStore, Scheduler};
use crate::store::MetadataStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub scheduler: Arc<Scheduler>,
    pub store: Arc<dyn MetadataStore>,
    pub queue: Arc<JobQueue>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let client = redis_client_from_env()?;

        let counter = AdmissionCounter::new(client.clone());
        let queue = JobQueue::with_client(client.clone(), QUEUE_KEY);
        let records = Arc::new(RecordStore::new(client));

        let launcher_config = LauncherConfig::from_env()?;
        let launcher = Arc::new(EcsLauncher::new(launcher_config));

        let slots = Arc::new(RedisSlotStore::new(counter, queue.clone()));
        let store: Arc<dyn MetadataStore> = records;

        let scheduler = Arc::new(Scheduler::new(
            slots,
            launcher,
            store.clone(),
            config.max_concurrent_jobs,
        ));

        Ok(Self {
            config,
            scheduler,
            store,
            queue: Arc::new(queue),
        })
    }
}

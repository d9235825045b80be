//! Axum HTTP API server.
//!
//! This crate provides:
//! - Upload and worker completion trigger endpoints
//! - Admission-controlled job scheduling with a shared FIFO queue
//! - Orphaned job reconciliation
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod launcher;
pub mod metrics;
pub mod middleware;
pub mod reconciler;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod store;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use launcher::{EcsLauncher, Launch, LaunchError, LauncherConfig};
pub use reconciler::Reconciler;
pub use routes::create_router;
pub use scheduler::{Admission, DrainSummary, RedisSlotStore, Scheduler, SlotStore};
pub use state::AppState;
pub use store::MetadataStore;

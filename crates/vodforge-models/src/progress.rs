//! Job progress states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of a transcode job through the scheduler and worker.
///
/// Serialized SCREAMING_SNAKE_CASE to match the wire contract shared with
/// the ingestion trigger and the worker completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressState {
    /// Job record created, admission decision not yet made
    #[default]
    Pending,
    /// Waiting in the FIFO queue for a free slot
    Queued,
    /// Running on a launched worker
    Processing,
    /// Worker reported success
    Completed,
    /// Worker reported failure
    Failed,
}

impl ProgressState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressState::Pending => "PENDING",
            ProgressState::Queued => "QUEUED",
            ProgressState::Processing => "PROCESSING",
            ProgressState::Completed => "COMPLETED",
            ProgressState::Failed => "FAILED",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressState::Completed | ProgressState::Failed)
    }

    /// Whether `next` is a legal transition from this state.
    ///
    /// Legal paths: PENDING -> PROCESSING, PENDING -> QUEUED -> PROCESSING,
    /// PROCESSING -> COMPLETED | FAILED.
    pub fn can_transition_to(&self, next: ProgressState) -> bool {
        use ProgressState::*;
        match (self, next) {
            (Pending, Processing) | (Pending, Queued) => true,
            (Queued, Processing) => true,
            (Processing, Completed) | (Processing, Failed) => true,
            // Reconciler path: a stuck PROCESSING job is pushed back to the queue.
            (Processing, Queued) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

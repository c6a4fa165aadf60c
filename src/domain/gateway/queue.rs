//! Concurrency queue contract

use std::fmt::Debug;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::domain::query::QueryError;

/// Global lane shared by gateway queries
pub const MAIN_LANE: &str = "main";

/// A unit of work handed to the queue
pub struct RunRequest {
    pub run_id: String,
    /// Runs sharing a session key execute in submission order
    pub session_key: String,
    /// Lane whose concurrency limit bounds the run
    pub global_lane: String,
    /// Cancelled to abort the run, queued or running
    pub cancel: CancellationToken,
    /// Origin tag used in logs
    pub source: String,
    pub task: BoxFuture<'static, ()>,
}

impl Debug for RunRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRequest")
            .field("run_id", &self.run_id)
            .field("session_key", &self.session_key)
            .field("global_lane", &self.global_lane)
            .field("source", &self.source)
            .finish()
    }
}

/// Concurrency-limited, per-session-ordered execution queue
pub trait ExecutionQueue: Send + Sync + Debug {
    fn generate_run_id(&self) -> String;

    /// Enqueues the run.
    ///
    /// Ordering is fixed when this returns. The returned future resolves once
    /// the task finished, or with an error when the queue rejected it.
    fn run(&self, request: RunRequest) -> BoxFuture<'static, Result<(), QueryError>>;

    /// Aborts a run by id, returning false when it is unknown or finished
    fn abort_run(&self, run_id: &str) -> bool;

    /// Aborts every queued or running run of a session key
    fn abort_session(&self, session_key: &str) -> usize;
}

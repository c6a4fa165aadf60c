//! In-process execution queue with per-session ordering and per-lane limits
//!
//! Gate one chains runs sharing a session key so they start in submission
//! order. Gate two is a semaphore per lane bounding concurrent runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{oneshot, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::domain::gateway::{ExecutionQueue, RunRequest, MAIN_LANE};
use crate::domain::query::QueryError;

#[derive(Debug, Clone)]
pub struct LaneQueueConfig {
    /// Concurrency of lanes without an explicit limit
    pub default_concurrency: usize,
    pub lane_limits: HashMap<String, usize>,
    /// Queued runs beyond this are rejected at submission
    pub max_pending: usize,
}

impl Default for LaneQueueConfig {
    fn default() -> Self {
        Self::from(&QueueConfig::default())
    }
}

impl From<&QueueConfig> for LaneQueueConfig {
    fn from(config: &QueueConfig) -> Self {
        let mut lane_limits = HashMap::new();
        lane_limits.insert(MAIN_LANE.to_string(), config.main_concurrency.max(1));
        Self {
            default_concurrency: config.main_concurrency.max(1),
            lane_limits,
            max_pending: config.max_pending,
        }
    }
}

impl LaneQueueConfig {
    pub fn with_lane(mut self, lane: impl Into<String>, limit: usize) -> Self {
        self.lane_limits.insert(lane.into(), limit.max(1));
        self
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }
}

/// Tail of a session chain. The receiver resolves once the last submitted
/// run of the session released its turn.
#[derive(Debug)]
struct SessionTail {
    seq: u64,
    done: oneshot::Receiver<()>,
}

#[derive(Debug)]
struct RunHandle {
    session_key: String,
    cancel: CancellationToken,
}

#[derive(Debug)]
struct Inner {
    config: LaneQueueConfig,
    lanes: DashMap<String, Arc<Semaphore>>,
    sessions: DashMap<String, SessionTail>,
    runs: DashMap<String, RunHandle>,
    pending: AtomicUsize,
    seq: AtomicU64,
    closed: CancellationToken,
}

impl Inner {
    fn lane(&self, lane: &str) -> Arc<Semaphore> {
        let semaphore = self
            .lanes
            .entry(lane.to_string())
            .or_insert_with(|| {
                let limit = self
                    .config
                    .lane_limits
                    .get(lane)
                    .copied()
                    .unwrap_or(self.config.default_concurrency);
                Arc::new(Semaphore::new(limit))
            })
            .clone();

        // A lane created after close() iterated the map is closed here.
        if self.closed.is_cancelled() {
            semaphore.close();
        }
        semaphore
    }
}

/// Bookkeeping of one submitted run.
///
/// Dropping it leaves the pending count, forgets the run and releases the
/// session turn once the predecessor released its own.
struct RunGuard {
    inner: Arc<Inner>,
    run_id: String,
    session_key: String,
    seq: u64,
    queued: bool,
    previous: Option<oneshot::Receiver<()>>,
    done: Option<oneshot::Sender<()>>,
}

impl RunGuard {
    fn start(&mut self) {
        if self.queued {
            self.queued = false;
            self.inner.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn reject(&self, reason: &str) -> QueryError {
        debug!(run_id = %self.run_id, reason, "Run rejected before start");
        QueryError::queue_rejected(format!("run {} {}", self.run_id, reason))
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.start();
        self.inner.runs.remove(&self.run_id);
        let seq = self.seq;
        self.inner
            .sessions
            .remove_if(&self.session_key, |_, tail| tail.seq == seq);

        let (Some(done), Some(mut previous)) = (self.done.take(), self.previous.take()) else {
            return;
        };
        if let Err(oneshot::error::TryRecvError::Empty) = previous.try_recv() {
            // Successors must not start before the predecessor finished.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = previous.await;
                    drop(done);
                });
            }
        }
    }
}

/// Two-gate lane queue
#[derive(Debug, Clone)]
pub struct LaneQueue {
    inner: Arc<Inner>,
}

impl Default for LaneQueue {
    fn default() -> Self {
        Self::new(LaneQueueConfig::default())
    }
}

impl LaneQueue {
    pub fn new(config: LaneQueueConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                lanes: DashMap::new(),
                sessions: DashMap::new(),
                runs: DashMap::new(),
                pending: AtomicUsize::new(0),
                seq: AtomicU64::new(0),
                closed: CancellationToken::new(),
            }),
        }
    }

    /// Runs waiting for their turn
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// Runs queued or executing
    pub fn active(&self) -> usize {
        self.inner.runs.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    /// Rejects queued and future runs. Executing runs finish normally.
    pub fn close(&self) {
        if self.inner.closed.is_cancelled() {
            return;
        }
        self.inner.closed.cancel();
        for lane in self.inner.lanes.iter() {
            lane.value().close();
        }
        info!(active = self.active(), "Execution queue closed");
    }

    fn reject(message: impl Into<String>) -> BoxFuture<'static, Result<(), QueryError>> {
        let error = QueryError::queue_rejected(message);
        async move { Err(error) }.boxed()
    }
}

impl ExecutionQueue for LaneQueue {
    fn generate_run_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn run(&self, request: RunRequest) -> BoxFuture<'static, Result<(), QueryError>> {
        let inner = self.inner.clone();

        if inner.closed.is_cancelled() {
            return Self::reject("queue is closed");
        }
        if inner.pending.fetch_add(1, Ordering::SeqCst) >= inner.config.max_pending {
            inner.pending.fetch_sub(1, Ordering::SeqCst);
            warn!(run_id = %request.run_id, "Execution queue saturated");
            return Self::reject(format!(
                "too many pending runs (max {})",
                inner.config.max_pending
            ));
        }

        let RunRequest {
            run_id,
            session_key,
            global_lane,
            cancel,
            source,
            task,
        } = request;

        // Ordering is fixed here, before the returned future is first polled.
        let seq = inner.seq.fetch_add(1, Ordering::SeqCst);
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let previous = inner
            .sessions
            .insert(session_key.clone(), SessionTail { seq, done: done_rx })
            .map(|tail| tail.done);
        inner.runs.insert(
            run_id.clone(),
            RunHandle {
                session_key: session_key.clone(),
                cancel: cancel.clone(),
            },
        );
        let lane = inner.lane(&global_lane);
        let closed = inner.closed.clone();

        debug!(%run_id, %session_key, lane = %global_lane, %source, "Run queued");

        let mut guard = RunGuard {
            inner,
            run_id,
            session_key,
            seq,
            queued: true,
            previous,
            done: Some(done_tx),
        };

        async move {
            if let Some(previous) = guard.previous.as_mut() {
                let interrupted = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Some("aborted"),
                    _ = closed.cancelled() => Some("queue is closed"),
                    _ = previous => None,
                };
                if let Some(reason) = interrupted {
                    return Err(guard.reject(reason));
                }
                guard.previous = None;
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = lane.acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                let reason = if cancel.is_cancelled() {
                    "aborted"
                } else {
                    "queue is closed"
                };
                return Err(guard.reject(reason));
            };

            guard.start();
            debug!(run_id = %guard.run_id, "Run started");
            task.await;
            drop(permit);

            debug!(run_id = %guard.run_id, "Run finished");
            Ok(())
        }
        .boxed()
    }

    fn abort_run(&self, run_id: &str) -> bool {
        match self.inner.runs.get(run_id) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn abort_session(&self, session_key: &str) -> usize {
        let mut aborted = 0;
        for handle in self.inner.runs.iter() {
            if handle.session_key == session_key {
                handle.cancel.cancel();
                aborted += 1;
            }
        }
        if aborted > 0 {
            info!(%session_key, aborted, "Aborted session runs");
        }
        aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn request(
        queue: &LaneQueue,
        session_key: &str,
        task: BoxFuture<'static, ()>,
    ) -> (String, CancellationToken, RunRequest) {
        let run_id = queue.generate_run_id();
        let cancel = CancellationToken::new();
        let request = RunRequest {
            run_id: run_id.clone(),
            session_key: session_key.to_string(),
            global_lane: MAIN_LANE.to_string(),
            cancel: cancel.clone(),
            source: "test".to_string(),
            task,
        };
        (run_id, cancel, request)
    }

    fn recording_task(
        log: Arc<Mutex<Vec<String>>>,
        name: &str,
        delay: Duration,
    ) -> BoxFuture<'static, ()> {
        let name = name.to_string();
        async move {
            log.lock().unwrap().push(format!("start {}", name));
            tokio::time::sleep(delay).await;
            log.lock().unwrap().push(format!("end {}", name));
        }
        .boxed()
    }

    #[tokio::test]
    async fn test_same_session_runs_in_submission_order() {
        let queue = LaneQueue::new(LaneQueueConfig::default().with_lane(MAIN_LANE, 8));
        let log = Arc::new(Mutex::new(Vec::new()));

        let (_, _, a) = request(&queue, "s1", recording_task(log.clone(), "a", Duration::from_millis(50)));
        let (_, _, b) = request(&queue, "s1", recording_task(log.clone(), "b", Duration::ZERO));
        let a = queue.run(a);
        let b = queue.run(b);

        // Poll the later run first; ordering must still hold.
        let b = tokio::spawn(b);
        let a = tokio::spawn(a);
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["start a", "end a", "start b", "end b"]
        );
        assert_eq!(queue.active(), 0);
    }

    #[tokio::test]
    async fn test_lane_bounds_concurrency() {
        let queue = LaneQueue::new(LaneQueueConfig::default().with_lane(MAIN_LANE, 2));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..6 {
            let running = running.clone();
            let peak = peak.clone();
            let task = async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }
            .boxed();
            let (_, _, req) = request(&queue, &format!("s{}", i), task);
            handles.push(tokio::spawn(queue.run(req)));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_distinct_sessions_run_concurrently() {
        let queue = LaneQueue::default();
        let gate = Arc::new(Notify::new());

        let waiter = gate.clone();
        let (_, _, first) = request(&queue, "s1", async move { waiter.notified().await }.boxed());
        let opener = gate.clone();
        let (_, _, second) = request(&queue, "s2", async move { opener.notify_one() }.boxed());

        let first = tokio::spawn(queue.run(first));
        let second = tokio::spawn(queue.run(second));

        tokio::time::timeout(Duration::from_secs(2), async {
            first.await.unwrap().unwrap();
            second.await.unwrap().unwrap();
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_abort_queued_run_keeps_order() {
        let queue = LaneQueue::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        let (_, _, a) = request(&queue, "s1", recording_task(log.clone(), "a", Duration::from_millis(50)));
        let (b_id, _, b) = request(&queue, "s1", recording_task(log.clone(), "b", Duration::ZERO));
        let (_, _, c) = request(&queue, "s1", recording_task(log.clone(), "c", Duration::ZERO));

        let a = tokio::spawn(queue.run(a));
        let b = tokio::spawn(queue.run(b));
        let c = tokio::spawn(queue.run(c));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(queue.abort_run(&b_id));

        let rejected = b.await.unwrap().unwrap_err();
        assert!(matches!(rejected, QueryError::QueueRejected { .. }));
        a.await.unwrap().unwrap();
        c.await.unwrap().unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["start a", "end a", "start c", "end c"]);
        assert!(!queue.abort_run(&b_id));
    }

    #[tokio::test]
    async fn test_running_task_observes_abort() {
        let queue = LaneQueue::default();
        let (_, cancel, req) = request(&queue, "s1", futures::future::ready(()).boxed());
        let observed = cancel.clone();
        let req = RunRequest {
            task: async move { observed.cancelled().await }.boxed(),
            ..req
        };

        let handle = tokio::spawn(queue.run(req));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(queue.abort_session("s1"), 1);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_max_pending_rejects_immediately() {
        let queue = LaneQueue::new(
            LaneQueueConfig::default()
                .with_lane(MAIN_LANE, 1)
                .with_max_pending(1),
        );
        let gate = Arc::new(Notify::new());

        let waiter = gate.clone();
        let (_, _, first) = request(&queue, "s1", async move { waiter.notified().await }.boxed());
        let first = tokio::spawn(queue.run(first));

        let (_, _, second) = request(&queue, "s2", futures::future::ready(()).boxed());
        let error = queue.run(second).await.unwrap_err();
        assert_eq!(error.category(), crate::domain::query::ErrorCategory::QueueRejection);

        gate.notify_one();
        first.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_close_rejects_queued_and_new_runs() {
        let queue = LaneQueue::new(LaneQueueConfig::default().with_lane(MAIN_LANE, 1));
        let gate = Arc::new(Notify::new());

        let waiter = gate.clone();
        let (_, _, running) = request(&queue, "s1", async move { waiter.notified().await }.boxed());
        let running = tokio::spawn(queue.run(running));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (_, _, queued) = request(&queue, "s2", futures::future::ready(()).boxed());
        let queued = tokio::spawn(queue.run(queued));
        tokio::time::sleep(Duration::from_millis(10)).await;

        queue.close();
        assert!(queue.is_closed());
        assert!(queued.await.unwrap().is_err());

        let (_, _, late) = request(&queue, "s3", futures::future::ready(()).boxed());
        assert!(queue.run(late).await.is_err());

        gate.notify_one();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_lane_created_after_close_is_closed() {
        let queue = LaneQueue::default();
        let existing = queue.inner.lane(MAIN_LANE);

        queue.close();

        assert!(existing.is_closed());
        assert!(queue.inner.lane("reports").is_closed());
    }
}

//! Connection pool of query runners keyed by session and data source

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::runner::QueryRunner;
use crate::domain::DomainError;
use crate::infrastructure::observability::record_pool_event;

/// Default idle lifetime of a pooled runner
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(600);

/// Pool key: one live runner per (session, data source)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub session_id: String,
    pub data_source_id: String,
}

impl PoolKey {
    pub fn new(session_id: impl Into<String>, data_source_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            data_source_id: data_source_id.into(),
        }
    }
}

#[derive(Debug)]
struct PooledConnection {
    runner: Arc<dyn QueryRunner>,
    expires_at: Instant,
}

impl PooledConnection {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Per-key slot. Its lock is held across runner creation so concurrent
/// acquirers of one key wait for a single in-flight creation.
type Slot = Arc<Mutex<Option<PooledConnection>>>;

/// Lazily created, idle-evicted runners
#[derive(Debug)]
pub struct ConnectionPool {
    slots: DashMap<PoolKey, Slot>,
    idle_ttl: Duration,
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TTL)
    }
}

impl ConnectionPool {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            idle_ttl,
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Returns the live runner for the key, creating it with `factory` when
    /// absent or expired. Expiry is fixed at creation and not extended by use.
    pub async fn acquire<F, Fut>(
        &self,
        session_id: &str,
        data_source_id: &str,
        factory: F,
    ) -> Result<Arc<dyn QueryRunner>, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn QueryRunner>, DomainError>>,
    {
        let key = PoolKey::new(session_id, data_source_id);
        let slot = self.slots.entry(key.clone()).or_default().clone();

        let mut guard = slot.lock().await;
        let now = Instant::now();

        if let Some(conn) = guard.as_ref().filter(|c| !c.is_expired(now)) {
            record_pool_event("reused");
            return Ok(conn.runner.clone());
        }
        let stale = guard.take();

        let created = factory().await;
        let runner = match created {
            Ok(runner) => runner,
            Err(e) => {
                drop(guard);
                drop(slot);
                self.prune(&key);
                if let Some(old) = stale {
                    teardown(&key, old.runner).await;
                }
                return Err(e);
            }
        };

        *guard = Some(PooledConnection {
            runner: runner.clone(),
            expires_at: Instant::now() + self.idle_ttl,
        });
        drop(guard);

        record_pool_event("created");
        debug!(
            session_id = %key.session_id,
            data_source_id = %key.data_source_id,
            "Created pooled runner"
        );

        if let Some(old) = stale {
            teardown(&key, old.runner).await;
        }

        Ok(runner)
    }

    /// Tears down and removes every expired runner, returning how many were evicted.
    ///
    /// Slots busy with an in-flight creation are skipped.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();

        for (key, slot) in self.snapshot() {
            let Ok(mut guard) = slot.try_lock() else {
                continue;
            };
            if guard.as_ref().is_some_and(|c| c.is_expired(now)) {
                if let Some(conn) = guard.take() {
                    expired.push((key, conn.runner));
                }
            }
        }

        self.prune_all();

        let count = expired.len();
        futures::future::join_all(
            expired
                .into_iter()
                .map(|(key, runner)| async move { teardown(&key, runner).await }),
        )
        .await;

        if count > 0 {
            info!(evicted = count, remaining = self.len(), "Swept idle runners");
        }
        count
    }

    /// Tears down the runner of one key. Returns false when nothing was pooled.
    pub async fn invalidate(&self, session_id: &str, data_source_id: &str) -> bool {
        let key = PoolKey::new(session_id, data_source_id);
        let Some(slot) = self.slots.get(&key).map(|s| s.value().clone()) else {
            return false;
        };

        let taken = slot.lock().await.take();
        drop(slot);
        self.prune(&key);

        match taken {
            Some(conn) => {
                teardown(&key, conn.runner).await;
                true
            }
            None => false,
        }
    }

    /// Tears down every runner of a session, returning how many were removed
    pub async fn invalidate_session(&self, session_id: &str) -> usize {
        let keys: Vec<PoolKey> = self
            .slots
            .iter()
            .filter(|e| e.key().session_id == session_id)
            .map(|e| e.key().clone())
            .collect();

        let mut removed = 0;
        for key in keys {
            if self.invalidate(&key.session_id, &key.data_source_id).await {
                removed += 1;
            }
        }
        removed
    }

    /// Tears down every pooled runner
    pub async fn close(&self) -> usize {
        let mut taken = Vec::new();
        for (key, slot) in self.snapshot() {
            if let Some(conn) = slot.lock().await.take() {
                taken.push((key, conn.runner));
            }
        }
        self.prune_all();

        let count = taken.len();
        for (key, runner) in taken {
            teardown(&key, runner).await;
        }
        count
    }

    /// Number of pooled keys, including ones with a creation in flight
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Runs `sweep` every `interval` until `cancel` fires
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Connection pool sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.sweep().await;
                    }
                }
            }
        })
    }

    fn snapshot(&self) -> Vec<(PoolKey, Slot)> {
        self.slots
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Removes the slot when it is empty and nobody else holds it
    fn prune(&self, key: &PoolKey) {
        self.slots.remove_if(key, |_, slot| is_idle_slot(slot));
    }

    fn prune_all(&self) {
        self.slots.retain(|_, slot| !is_idle_slot(slot));
    }
}

/// Runs while the map shard is locked, so no acquirer can clone the slot concurrently
fn is_idle_slot(slot: &Slot) -> bool {
    Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|guard| guard.is_none())
}

async fn teardown(key: &PoolKey, runner: Arc<dyn QueryRunner>) {
    match runner.teardown().await {
        Ok(()) => record_pool_event("evicted"),
        Err(e) => {
            record_pool_event("teardown_failed");
            warn!(
                session_id = %key.session_id,
                data_source_id = %key.data_source_id,
                error = %e,
                "Runner teardown failed"
            );
        }
    }
}

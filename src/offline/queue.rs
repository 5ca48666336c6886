use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::store::QueueStore;
use super::transport::ActionTransport;

/// Delay before the next attempt, indexed by retry count.
pub const RETRY_DELAYS_MS: [i64; 5] = [0, 5_000, 15_000, 60_000, 300_000];

/// Entries that fail this many times are discarded.
pub const MAX_RETRIES: u32 = 5;

/// A mutating API call captured while offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub endpoint: String,
    #[serde(default)]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OfflineAction {
    pub fn new(kind: &str, endpoint: &str, method: &str) -> Self {
        Self {
            kind: kind.to_string(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            data: None,
            description: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    #[serde(flatten)]
    pub action: OfflineAction,
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub retries: u32,
    /// Epoch milliseconds before which the entry is not replayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<i64>,
}

impl QueueEntry {
    pub fn new(id: String, action: OfflineAction) -> Self {
        Self {
            action,
            id,
            timestamp: Utc::now(),
            retries: 0,
            next_retry_at: None,
        }
    }

    pub fn is_ready(&self, now_ms: i64) -> bool {
        self.next_retry_at.map_or(true, |at| now_ms >= at)
    }
}

/// Outcome of one [`OfflineQueue::sync_queue`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Replayed successfully and removed.
    pub synced: usize,
    /// Failed for the last time and removed.
    pub dropped: usize,
    /// Skipped because their backoff has not elapsed.
    pub deferred: usize,
    /// Failed and rescheduled.
    pub failed: usize,
}

impl SyncReport {
    pub fn attempted(&self) -> usize {
        self.synced + self.dropped + self.failed
    }
}

/// Current time in epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

struct Inner {
    store: Arc<dyn QueueStore>,
    transport: Arc<dyn ActionTransport>,
    entries: Mutex<Vec<QueueEntry>>,
    syncing: AtomicBool,
    clock: Clock,
}

/// Resets the in-progress flag when a sync pass ends, however it ends.
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Durable FIFO of actions awaiting replay, with per-entry backoff.
#[derive(Clone)]
pub struct OfflineQueue {
    inner: Arc<Inner>,
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn QueueStore>, transport: Arc<dyn ActionTransport>) -> Self {
        Self::with_clock(store, transport, Arc::new(|| Utc::now().timestamp_millis()))
    }

    /// Build a queue reading time (epoch ms) from `clock`.
    pub fn with_clock(
        store: Arc<dyn QueueStore>,
        transport: Arc<dyn ActionTransport>,
        clock: Clock,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                transport,
                entries: Mutex::new(Vec::new()),
                syncing: AtomicBool::new(false),
                clock,
            }),
        }
    }

    fn now_ms(&self) -> i64 {
        (self.inner.clock)()
    }

    /// Load the persisted queue. Unreadable storage yields an empty queue.
    pub async fn init(&self) {
        let loaded = match self.inner.store.load().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to load offline queue: {}", e);
                Vec::new()
            }
        };
        tracing::debug!(pending = loaded.len(), "Offline queue loaded");
        *self.inner.entries.lock().await = loaded;
    }

    async fn persist(&self, entries: &[QueueEntry]) {
        if let Err(e) = self.inner.store.save(entries).await {
            tracing::error!("Failed to persist offline queue: {}", e);
        }
    }

    pub async fn queue_action(&self, action: OfflineAction) -> QueueEntry {
        let simple = Uuid::new_v4().simple().to_string();
        let id = format!("{}_{}", self.now_ms(), &simple[..9]);
        let entry = QueueEntry::new(id, action);

        let mut entries = self.inner.entries.lock().await;
        entries.push(entry.clone());
        self.persist(&entries).await;

        tracing::info!(
            kind = %entry.action.kind,
            endpoint = %entry.action.endpoint,
            "Action queued for offline sync"
        );
        entry
    }

    /// Replay every ready entry once, in insertion order.
    ///
    /// Returns an empty report without touching the queue when another pass
    /// is running or nothing is pending.
    pub async fn sync_queue(&self) -> SyncReport {
        if self
            .inner
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Offline sync already in progress");
            return SyncReport::default();
        }
        let _guard = SyncGuard(&self.inner.syncing);

        let snapshot = self.inner.entries.lock().await.clone();
        if snapshot.is_empty() {
            return SyncReport::default();
        }
        tracing::info!(pending = snapshot.len(), "Offline sync started");

        let mut report = SyncReport::default();
        let mut completed: HashSet<String> = HashSet::new();
        let mut rescheduled: HashMap<String, (u32, i64)> = HashMap::new();
        let now = self.now_ms();

        for entry in snapshot {
            if !entry.is_ready(now) {
                report.deferred += 1;
                continue;
            }

            let action = &entry.action;
            match self
                .inner
                .transport
                .send(&action.method, &action.endpoint, action.data.as_ref())
                .await
            {
                Ok(()) => {
                    tracing::debug!(kind = %action.kind, "Offline action synced");
                    report.synced += 1;
                    completed.insert(entry.id);
                }
                Err(e) => {
                    let retries = entry.retries + 1;
                    if retries >= MAX_RETRIES {
                        tracing::warn!(
                            kind = %action.kind,
                            error = %e,
                            "Offline action dropped after {} attempts",
                            retries
                        );
                        report.dropped += 1;
                        completed.insert(entry.id);
                    } else {
                        let delay = retry_delay_ms(retries);
                        tracing::warn!(
                            kind = %action.kind,
                            attempt = retries,
                            delay_ms = delay,
                            error = %e,
                            "Offline action failed, rescheduled"
                        );
                        report.failed += 1;
                        rescheduled.insert(entry.id, (retries, self.now_ms() + delay));
                    }
                }
            }
        }

        let mut entries = self.inner.entries.lock().await;
        entries.retain(|e| !completed.contains(&e.id));
        for entry in entries.iter_mut() {
            if let Some((retries, next_retry_at)) = rescheduled.get(&entry.id) {
                entry.retries = *retries;
                entry.next_retry_at = Some(*next_retry_at);
            }
        }
        self.persist(&entries).await;

        tracing::info!(
            synced = report.synced,
            dropped = report.dropped,
            remaining = entries.len(),
            "Offline sync finished"
        );
        report
    }

    pub async fn remove_action(&self, id: &str) -> bool {
        let mut entries = self.inner.entries.lock().await;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;
        self.persist(&entries).await;
        removed
    }

    pub async fn clear_queue(&self) {
        let mut entries = self.inner.entries.lock().await;
        entries.clear();
        self.persist(&entries).await;
    }

    pub async fn pending(&self) -> Vec<QueueEntry> {
        self.inner.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.entries.lock().await.is_empty()
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.syncing.load(Ordering::Acquire)
    }

    /// Sync whenever `online` flips from false to true with work pending.
    pub fn watch_connectivity(&self, mut online: watch::Receiver<bool>) -> JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            let mut was_online = *online.borrow_and_update();
            while online.changed().await.is_ok() {
                let is_online = *online.borrow_and_update();
                if is_online && !was_online && !queue.is_empty().await {
                    tracing::info!("Back online, replaying offline queue");
                    queue.sync_queue().await;
                }
                was_online = is_online;
            }
        })
    }
}

/// Backoff for an entry that has now failed `retries` times.
pub fn retry_delay_ms(retries: u32) -> i64 {
    let index = (retries as usize).min(RETRY_DELAYS_MS.len() - 1);
    RETRY_DELAYS_MS[index]
}

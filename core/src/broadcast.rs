// Per-connection push loop
//
// Every connected viewer gets its own ticking task. Each tick rewrites the
// volatile system gauges and pushes the full snapshot to that viewer only.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::snapshot::Snapshot;
use crate::state::SharedSnapshot;
use crate::system::VolatileMetrics;

const CHANNEL_CAPACITY: usize = 16;

pub type ConnectionId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushKind {
    /// First frame after connecting
    Init,
    /// Every scheduled tick afterwards
    Update,
}

/// Frame sent over the push channel: `{"type": ..., "data": <snapshot>}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(rename = "type")]
    pub kind: PushKind,
    pub data: Snapshot,
}

impl PushMessage {
    pub fn init(data: Snapshot) -> Self {
        Self {
            kind: PushKind::Init,
            data,
        }
    }

    pub fn update(data: Snapshot) -> Self {
        Self {
            kind: PushKind::Update,
            data,
        }
    }
}

/// Push tasks keyed by connection
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    tasks: DashMap<ConnectionId, JoinHandle<()>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a viewer and start its push task.
    ///
    /// The `init` frame is queued before this returns; the first `update`
    /// follows one full `interval` later.
    pub async fn connect(
        &self,
        snapshot: SharedSnapshot,
        metrics: Arc<dyn VolatileMetrics>,
        interval: Duration,
    ) -> (ConnectionId, mpsc::Receiver<PushMessage>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        // Fresh channel with spare capacity, cannot fail
        let _ = tx.try_send(PushMessage::init(snapshot.current().await));

        let handle = tokio::spawn(push_loop(id, tx, snapshot, metrics, interval));
        self.tasks.insert(id, handle);

        info!(
            target: "dashboard",
            connection_id = id,
            active = self.tasks.len(),
            "Client connected to dashboard"
        );
        (id, rx)
    }

    /// Cancel a viewer's push task. Returns false for unknown ids.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        match self.tasks.remove(&id) {
            Some((_, handle)) => {
                handle.abort();
                info!(
                    target: "dashboard",
                    connection_id = id,
                    active = self.tasks.len(),
                    "Client disconnected"
                );
                true
            }
            None => false,
        }
    }

    pub fn active_connections(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Cancel every push task
    pub fn shutdown(&self) {
        let ids: Vec<ConnectionId> = self.tasks.iter().map(|e| *e.key()).collect();
        for id in ids {
            self.disconnect(id);
        }
    }
}

impl Drop for ConnectionRegistry {
    fn drop(&mut self) {
        for entry in self.tasks.iter() {
            entry.value().abort();
        }
    }
}

async fn push_loop(
    id: ConnectionId,
    tx: mpsc::Sender<PushMessage>,
    snapshot: SharedSnapshot,
    metrics: Arc<dyn VolatileMetrics>,
    interval: Duration,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let sample = metrics.sample();
        let data = snapshot
            .update(|s| {
                sample.apply(&mut s.system);
                s.clone()
            })
            .await;

        if tx.send(PushMessage::update(data)).await.is_err() {
            debug!(target: "dashboard", connection_id = id, "Push receiver dropped");
            break;
        }
    }
}

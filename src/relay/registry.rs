use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::protocol::Frame;

/// Unique id for one subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Public view of a registered subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriberInfo {
    pub id: SubscriberId,
    pub peer: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
}

struct Entry {
    info: SubscriberInfo,
    sender: mpsc::UnboundedSender<Frame>,
    /// Frames queued but not yet taken by the connection task.
    backlog: Arc<AtomicUsize>,
    /// When the backlog last went over capacity without coming back down.
    stalled_since: Option<Instant>,
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers the frame was queued for.
    pub delivered: usize,
    /// Subscribers dropped because their queue was closed or stalled.
    pub evicted: usize,
}

/// Live set of broadcast-eligible subscriber connections.
///
/// Each subscriber owns an outbound queue drained by its own connection
/// task. Broadcasting only enqueues, so a slow or dead socket never holds
/// up the others. A closed queue means the connection is gone and the
/// subscriber is removed at once. A backlog above `queue_capacity` starts
/// a stall clock; if the backlog is still above capacity once
/// `stall_timeout` has passed, the subscriber is removed. A reader that
/// falls behind during a burst and catches up keeps its connection.
/// No map guard is held while a frame is written to a socket.
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, Entry>,
    queue_capacity: usize,
    stall_timeout: Duration,
}

impl SubscriberRegistry {
    pub fn new(queue_capacity: usize, stall_timeout: Duration) -> Self {
        Self {
            subscribers: DashMap::new(),
            queue_capacity: queue_capacity.max(1),
            stall_timeout,
        }
    }

    /// Add an open connection. Frames broadcast from now on are queued for
    /// it; nothing sent earlier is replayed.
    pub fn register(self: &Arc<Self>, peer: Option<SocketAddr>) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let backlog = Arc::new(AtomicUsize::new(0));
        let info = SubscriberInfo {
            id: SubscriberId::new(),
            peer,
            connected_at: Utc::now(),
        };
        let id = info.id;
        self.subscribers.insert(
            id,
            Entry {
                info,
                sender,
                backlog: Arc::clone(&backlog),
                stalled_since: None,
            },
        );
        debug!(subscriber = %id, ?peer, "subscriber registered");

        Subscription {
            id,
            receiver,
            backlog,
            registry: Arc::clone(self),
        }
    }

    /// Returns true if the subscriber was still registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            debug!(subscriber = %id, "subscriber unregistered");
        }
        removed
    }

    pub fn broadcast(&self, frame: &Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut dead = Vec::new();
        let now = Instant::now();

        for mut entry in self.subscribers.iter_mut() {
            let id = *entry.key();
            if entry.sender.send(frame.clone()).is_err() {
                dead.push(id);
                continue;
            }

            let backlog = entry.backlog.fetch_add(1, Ordering::AcqRel) + 1;
            if backlog <= self.queue_capacity {
                entry.stalled_since = None;
                report.delivered += 1;
                continue;
            }

            let since = *entry.stalled_since.get_or_insert(now);
            if now.duration_since(since) >= self.stall_timeout {
                warn!(
                    subscriber = %id,
                    backlog,
                    "subscriber stalled, dropping connection"
                );
                dead.push(id);
            } else {
                report.delivered += 1;
            }
        }

        // Removal takes the shard lock again, so it waits until iteration
        // has released its guards.
        for id in dead {
            if self.unregister(id) {
                report.evicted += 1;
            }
        }

        report
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    pub fn list(&self) -> Vec<SubscriberInfo> {
        self.subscribers
            .iter()
            .map(|entry| entry.info.clone())
            .collect()
    }
}

/// Receiving end of one registered subscriber. Dropping it removes the
/// subscriber from the registry.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<Frame>,
    backlog: Arc<AtomicUsize>,
    registry: Arc<SubscriberRegistry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next queued frame, or `None` once the subscriber has been evicted
    /// and its queue drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        let frame = self.receiver.recv().await?;
        self.backlog.fetch_sub(1, Ordering::AcqRel);
        Some(frame)
    }

    pub fn try_recv(&mut self) -> Option<Frame> {
        let frame = self.receiver.try_recv().ok()?;
        self.backlog.fetch_sub(1, Ordering::AcqRel);
        Some(frame)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::BroadcastReport;
use crate::protocol::EventKind;

#[derive(Default)]
struct KindCounters {
    frames: AtomicU64,
    payload_bytes: AtomicU64,
}

/// Running totals since the relay started.
pub struct RelayStats {
    started_at: DateTime<Utc>,
    kinds: [KindCounters; EventKind::ALL.len()],
    deliveries: AtomicU64,
    evictions: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            kinds: Default::default(),
            deliveries: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn record(&self, kind: EventKind, payload_len: usize, report: BroadcastReport) {
        let counters = &self.kinds[kind.index()];
        counters.frames.fetch_add(1, Ordering::Relaxed);
        counters
            .payload_bytes
            .fetch_add(payload_len as u64, Ordering::Relaxed);
        self.deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.evictions
            .fetch_add(report.evicted as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self, subscribers: usize) -> StatsSnapshot {
        let kinds = EventKind::ALL
            .iter()
            .map(|&kind| {
                let counters = &self.kinds[kind.index()];
                KindStats {
                    kind,
                    frames: counters.frames.load(Ordering::Relaxed),
                    payload_bytes: counters.payload_bytes.load(Ordering::Relaxed),
                }
            })
            .collect();

        StatsSnapshot {
            started_at: self.started_at,
            subscribers,
            deliveries: self.deliveries.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            kinds,
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KindStats {
    pub kind: EventKind,
    pub frames: u64,
    pub payload_bytes: u64,
}

/// Point-in-time copy of [`RelayStats`], served as JSON on `/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub started_at: DateTime<Utc>,
    pub subscribers: usize,
    pub deliveries: u64,
    pub evictions: u64,
    pub kinds: Vec<KindStats>,
}

impl StatsSnapshot {
    pub fn frames(&self, kind: EventKind) -> u64 {
        self.kinds
            .iter()
            .find(|k| k.kind == kind)
            .map(|k| k.frames)
            .unwrap_or(0)
    }
}

//! Tag-and-broadcast core of the relay.
//!
//! Ingestion wraps the producer's bytes in a [`Frame`] and hands it to the
//! [`SubscriberRegistry`]. Payloads are never inspected here, so a malformed
//! or empty body is relayed exactly like a valid one.

pub mod registry;
pub mod stats;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::{RelayConfig, DEFAULT_STALL_TIMEOUT};
use crate::protocol::{EventKind, Frame};

pub use registry::{
    BroadcastReport, SubscriberId, SubscriberInfo, SubscriberRegistry, Subscription,
};
pub use stats::{KindStats, RelayStats, StatsSnapshot};

/// Shared relay state. Cheap to clone; every clone sees the same registry.
#[derive(Clone)]
pub struct Relay {
    registry: Arc<SubscriberRegistry>,
    stats: Arc<RelayStats>,
}

impl Relay {
    pub fn new(queue_capacity: usize) -> Self {
        Self::with_stall_timeout(queue_capacity, DEFAULT_STALL_TIMEOUT)
    }

    pub fn with_stall_timeout(queue_capacity: usize, stall_timeout: Duration) -> Self {
        Self {
            registry: Arc::new(SubscriberRegistry::new(queue_capacity, stall_timeout)),
            stats: Arc::new(RelayStats::new()),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::with_stall_timeout(config.queue_capacity, config.stall_timeout)
    }

    /// Tag `payload` with `kind` and fan it out to everyone connected right now.
    pub fn ingest(&self, kind: EventKind, payload: &[u8]) -> BroadcastReport {
        let frame = Frame::new(kind, payload);
        let report = self.registry.broadcast(&frame);
        self.stats.record(kind, payload.len(), report);
        debug!(
            %kind,
            bytes = payload.len(),
            delivered = report.delivered,
            evicted = report.evicted,
            "frame broadcast"
        );
        report
    }

    /// Fan out an already tagged frame.
    pub fn broadcast(&self, frame: &Frame) -> BroadcastReport {
        self.registry.broadcast(frame)
    }

    pub fn subscribe(&self, peer: Option<SocketAddr>) -> Subscription {
        self.registry.register(peer)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    pub fn subscribers(&self) -> Vec<SubscriberInfo> {
        self.registry.list()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.registry.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Event, MeshSnapshot, Face, Vec3};

    #[test]
    fn test_ingest_tags_and_fans_out() {
        let relay = Relay::new(16);
        let mut a = relay.subscribe(None);
        let mut b = relay.subscribe(None);

        let mesh = MeshSnapshot::new(
            vec![Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0)],
            vec![Face::new(0, 1, 2)],
        );
        let payload = mesh.encode().unwrap();
        let report = relay.ingest(EventKind::InitObject, &payload);
        assert_eq!(report.delivered, 2);

        for sub in [&mut a, &mut b] {
            let frame = sub.try_recv().unwrap();
            assert_eq!(frame.tag(), EventKind::InitObject.tag());
            assert_eq!(frame.payload(), &payload[..]);
            assert_eq!(Event::from_frame(&frame).unwrap(), Event::InitObject(mesh.clone()));
        }
    }

    #[test]
    fn test_garbage_is_relayed_untouched() {
        let relay = Relay::new(16);
        let mut sub = relay.subscribe(None);

        relay.ingest(EventKind::UpdateTopSilhouette, &[]);
        relay.ingest(EventKind::UpdateObject, &[0xff, 0xff]);

        assert_eq!(sub.try_recv().unwrap().as_bytes(), &[0x04]);
        assert_eq!(sub.try_recv().unwrap().as_bytes(), &[0x02, 0xff, 0xff]);
    }

    #[test]
    fn test_ingest_without_subscribers() {
        let relay = Relay::new(16);
        let report = relay.ingest(EventKind::InitSilhouetteArea, &[1, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(report, BroadcastReport::default());

        let stats = relay.stats();
        assert_eq!(stats.frames(EventKind::InitSilhouetteArea), 1);
        assert_eq!(stats.subscribers, 0);
    }

    #[test]
    fn test_burst_keeps_live_reader() {
        let relay = Relay::new(256);
        let mut sub = relay.subscribe(None);

        for i in 0..2000u32 {
            relay.ingest(EventKind::UpdateObject, &i.to_le_bytes());
        }
        assert_eq!(relay.subscriber_count(), 1);

        for i in 0..2000u32 {
            assert_eq!(sub.try_recv().unwrap().payload(), &i.to_le_bytes());
        }
        let stats = relay.stats();
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.deliveries, 2000);
    }

    #[test]
    fn test_subscribers_listing() {
        let relay = Relay::new(4);
        let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();
        let sub = relay.subscribe(Some(peer));

        let listed = relay.subscribers();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, sub.id());
        assert_eq!(listed[0].peer, Some(peer));

        drop(sub);
        assert_eq!(relay.subscriber_count(), 0);
    }
}

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::protocol::EventKind;
use crate::relay::{Relay, StatsSnapshot, SubscriberInfo};

/// Acknowledgment returned to the producer once its body has been read
/// and the broadcast started. Says nothing about delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

/// Ingestion routes, one POST per event kind, plus health and stats.
///
/// Bodies are buffered in full with no size limit. If the producer goes
/// away mid-body the extractor fails, the handler never runs and nothing
/// is broadcast.
pub fn router(relay: Relay) -> Router {
    let mut router = Router::new()
        .route("/", get(|| async { "Silhouette Relay" }))
        .route("/health", get(|| async { Json("OK") }))
        .route("/stats", get(stats))
        .route("/subscribers", get(subscribers));

    for kind in EventKind::ALL {
        router = router.route(
            kind.route(),
            post(move |State(relay): State<Relay>, body: Bytes| ingest(relay, kind, body)),
        );
    }

    router
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

async fn ingest(relay: Relay, kind: EventKind, body: Bytes) -> Json<Ack> {
    let report = relay.ingest(kind, &body);
    debug!(
        %kind,
        bytes = body.len(),
        subscribers = report.delivered,
        "payload ingested"
    );
    Json(Ack { success: true })
}

async fn stats(State(relay): State<Relay>) -> Json<StatsSnapshot> {
    Json(relay.stats())
}

async fn subscribers(State(relay): State<Relay>) -> Json<Vec<SubscriberInfo>> {
    Json(relay.subscribers())
}

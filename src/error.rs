//! Error types and retry logic.
//!
//! The relay itself never fails on payload content: protocol and scene
//! errors only surface where frames are decoded and applied. Producer
//! errors carry enough detail to decide whether a post is worth retrying.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::protocol::EventKind;

/// Wire-level decode/encode failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed {kind} frame: {reason}")]
    MalformedFrame { kind: EventKind, reason: String },

    #[error("empty frame: missing event tag")]
    EmptyFrame,

    #[error("unknown event tag {0:#04x}")]
    UnknownTag(u8),

    #[error("{kind} count {count} does not fit in an int32 field")]
    CountOverflow { kind: EventKind, count: usize },
}

/// A structurally valid update that cannot be applied to the current scene.
/// The update is discarded as a whole; nothing is partially applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("vertex update before any mesh was initialized")]
    NoMesh,

    #[error("vertex count mismatch: mesh has {expected}, update has {actual}")]
    VertexCountMismatch { expected: usize, actual: usize },

    #[error("face {face} references vertex {index}, mesh has {vertex_count}")]
    FaceIndexOutOfRange {
        face: usize,
        index: i32,
        vertex_count: usize,
    },

    #[error("{kind}: {declared} pixels declared for a {width}x{height} image")]
    PixelCountMismatch {
        kind: EventKind,
        declared: usize,
        width: i32,
        height: i32,
    },
}

/// Failures posting a payload to the relay.
#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("relay did not acknowledge the {0} payload")]
    Rejected(EventKind),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("invalid relay URL: {0}")]
    InvalidUrl(String),
}

impl ProducerError {
    /// Failed connects, timeouts and server-side failures may go away on
    /// retry. A request that broke after it was sent is not retried, since
    /// the relay may already have broadcast it.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProducerError::Http(err) => err.is_connect() || err.is_timeout(),
            ProducerError::Status { status, .. } => *status >= 500,
            ProducerError::Rejected(_)
            | ProducerError::Protocol(_)
            | ProducerError::InvalidUrl(_) => false,
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,

    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Create a no-retry policy
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::from_secs_f64(
            (delay.as_secs_f64() * self.backoff_multiplier).min(self.max_delay.as_secs_f64()),
        )
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy runs out of attempts.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T, ProducerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProducerError>>,
{
    let mut attempts = 0;
    let mut delay = policy.initial_delay;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempts >= policy.max_attempts || !e.is_retryable() => return Err(e),
            Err(e) => {
                warn!(
                    "attempt {}/{} failed: {}; retrying in {:?}",
                    attempts, policy.max_attempts, e, delay
                );
                sleep(delay).await;
                delay = policy.next_delay(delay);
            }
        }
    }
}

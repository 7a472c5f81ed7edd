use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_INGEST_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SUBSCRIBE_ADDR: &str = "0.0.0.0:8081";
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the producer posts payloads to
    pub ingest_addr: SocketAddr,

    /// Address subscribers open WebSocket connections on
    pub subscribe_addr: SocketAddr,

    /// Frames a subscriber may fall behind before its stall clock starts
    pub queue_capacity: usize,

    /// How long a subscriber may stay more than `queue_capacity` frames
    /// behind before it is dropped
    pub stall_timeout: Duration,

    /// Directory for daily-rolling log files (stdout only when unset)
    pub log_dir: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ingest_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            subscribe_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            log_dir: None,
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables (and `.env` if present).
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("RELAY_INGEST_ADDR") {
            config.ingest_addr = addr
                .parse()
                .with_context(|| format!("RELAY_INGEST_ADDR is not a socket address: {addr}"))?;
        }
        if let Some(addr) = lookup("RELAY_SUBSCRIBE_ADDR") {
            config.subscribe_addr = addr
                .parse()
                .with_context(|| format!("RELAY_SUBSCRIBE_ADDR is not a socket address: {addr}"))?;
        }
        if let Some(capacity) = lookup("RELAY_QUEUE_CAPACITY") {
            config.queue_capacity = capacity
                .parse()
                .with_context(|| format!("RELAY_QUEUE_CAPACITY is not a number: {capacity}"))?;
        }
        if let Some(millis) = lookup("RELAY_STALL_TIMEOUT_MS") {
            let millis: u64 = millis
                .parse()
                .with_context(|| format!("RELAY_STALL_TIMEOUT_MS is not a number: {millis}"))?;
            config.stall_timeout = Duration::from_millis(millis);
        }
        if let Some(dir) = lookup("RELAY_LOG_DIR") {
            config.log_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Loopback addresses on OS-assigned ports, for tests and embedding.
    pub fn ephemeral() -> Self {
        Self {
            ingest_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            subscribe_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..Default::default()
        }
    }
}

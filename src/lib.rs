//! # Silhouette Relay
//!
//! Live relay for 3D scene updates. A producer posts binary payloads over
//! HTTP, one route per event kind; the relay prefixes each payload with a
//! one-byte event tag and pushes the resulting frame to every connected
//! WebSocket subscriber.
//!
//! ## Features
//!
//! - **Byte-exact protocol**: mesh snapshots, vertex deltas and 8-bit
//!   grayscale silhouettes, little-endian throughout
//! - **Isolated fan-out**: each subscriber drains its own queue, so one slow
//!   or dead connection never delays the rest, and one that stays behind
//!   past the stall timeout is dropped
//! - **No history**: subscribers see only frames broadcast after they join
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use silhouette_relay::{config::RelayConfig, server::RelayServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = RelayServer::bind(&RelayConfig::default()).await?;
//!     println!("posting to http://{}", server.ingest_addr());
//!     server.run().await
//! }
//! ```

pub mod client;
pub mod config;
pub mod demo;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod relay;
pub mod scene;
pub mod server;

// Re-export main types for library consumers
pub use client::{Producer, SubscriberClient};
pub use config::RelayConfig;
pub use error::{ProducerError, ProtocolError, SceneError};
pub use protocol::{Event, EventKind, Frame};
pub use relay::Relay;
pub use scene::SceneState;
pub use server::RelayServer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

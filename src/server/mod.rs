pub mod ingest;
pub mod subscribe;

use anyhow::{Context, Result};
use colored::*;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::RelayConfig;
use crate::relay::Relay;

pub use ingest::Ack;

/// Relay with both listeners bound and ready to serve.
pub struct RelayServer {
    relay: Relay,
    ingest: TcpListener,
    subscribe: TcpListener,
    ingest_addr: SocketAddr,
    subscribe_addr: SocketAddr,
}

impl RelayServer {
    pub async fn bind(config: &RelayConfig) -> Result<Self> {
        Self::bind_with(Relay::from_config(config), config).await
    }

    /// Bind around an existing relay, e.g. one shared with in-process producers.
    pub async fn bind_with(relay: Relay, config: &RelayConfig) -> Result<Self> {
        let ingest = TcpListener::bind(config.ingest_addr)
            .await
            .with_context(|| format!("Failed to bind ingestion address {}", config.ingest_addr))?;
        let subscribe = TcpListener::bind(config.subscribe_addr)
            .await
            .with_context(|| {
                format!("Failed to bind subscription address {}", config.subscribe_addr)
            })?;

        Ok(Self {
            relay,
            ingest_addr: ingest.local_addr()?,
            subscribe_addr: subscribe.local_addr()?,
            ingest,
            subscribe,
        })
    }

    pub fn ingest_addr(&self) -> SocketAddr {
        self.ingest_addr
    }

    pub fn subscribe_addr(&self) -> SocketAddr {
        self.subscribe_addr
    }

    pub fn relay(&self) -> Relay {
        self.relay.clone()
    }

    /// Serve both listeners until either one fails.
    pub async fn run(self) -> Result<()> {
        info!(
            ingest = %self.ingest_addr,
            subscribe = %self.subscribe_addr,
            "relay listening"
        );

        let ingest_app = ingest::router(self.relay.clone());
        let subscribe_app = subscribe::router(self.relay)
            .into_make_service_with_connect_info::<SocketAddr>();

        tokio::try_join!(
            async {
                axum::serve(self.ingest, ingest_app)
                    .await
                    .context("Ingestion server failed")
            },
            async {
                axum::serve(self.subscribe, subscribe_app)
                    .await
                    .context("Subscription server failed")
            },
        )?;

        Ok(())
    }
}

pub async fn start(config: RelayConfig) -> Result<()> {
    let server = RelayServer::bind(&config).await?;

    println!(
        "{} Ingestion at {}",
        "✓".green(),
        format!("http://{}", server.ingest_addr()).bright_blue()
    );
    println!(
        "{} Subscribers at {}",
        "✓".green(),
        format!("ws://{}", server.subscribe_addr()).bright_blue()
    );

    server.run().await
}

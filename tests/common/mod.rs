#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use silhouette_relay::{Frame, Relay, RelayConfig, RelayServer, SubscriberClient};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

pub struct TestRelay {
    pub relay: Relay,
    pub ingest: SocketAddr,
    pub subscribe: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestRelay {
    pub async fn start() -> Result<Self> {
        Self::start_with(RelayConfig::ephemeral()).await
    }

    pub async fn start_with(config: RelayConfig) -> Result<Self> {
        let server = RelayServer::bind(&config).await?;
        let relay = server.relay();
        let ingest = server.ingest_addr();
        let subscribe = server.subscribe_addr();
        let handle = tokio::spawn(async move {
            let _ = server.run().await;
        });
        Ok(Self {
            relay,
            ingest,
            subscribe,
            handle,
        })
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", self.ingest)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.subscribe)
    }

    /// Connect a subscriber and wait until the relay has registered it.
    pub async fn subscriber(&self) -> Result<SubscriberClient> {
        let expected = self.relay.subscriber_count() + 1;
        let client = SubscriberClient::connect(&self.ws_url()).await?;
        self.wait_for_subscribers(expected).await?;
        Ok(client)
    }

    pub async fn wait_for_subscribers(&self, count: usize) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.relay.subscriber_count() != count {
            if Instant::now() > deadline {
                return Err(anyhow!(
                    "expected {count} subscribers, have {}",
                    self.relay.subscriber_count()
                ));
            }
            sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn next_frame(client: &mut SubscriberClient) -> Result<Frame> {
    timeout(Duration::from_secs(5), client.next_frame())
        .await
        .map_err(|_| anyhow!("timed out waiting for a frame"))?
        .ok_or_else(|| anyhow!("connection closed"))?
}

/// True if nothing arrives within a short grace period.
pub async fn stays_quiet(client: &mut SubscriberClient) -> bool {
    timeout(Duration::from_millis(200), client.next_frame())
        .await
        .is_err()
}

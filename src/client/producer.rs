use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, Client};
use url::Url;

use crate::error::{with_retry, ProducerError, RetryPolicy};
use crate::protocol::{Event, EventKind, MeshDelta, MeshSnapshot, SilhouetteArea, SilhouetteBitmap};
use crate::server::Ack;

/// HTTP client that posts encoded payloads to a relay's ingestion routes.
#[derive(Debug, Clone)]
pub struct Producer {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl Producer {
    /// `base_url` is the relay's ingestion root, e.g. `http://localhost:8080`.
    pub fn new(base_url: &str) -> Result<Self, ProducerError> {
        Self::with_policy(base_url, RetryPolicy::default(), Duration::from_secs(30))
    }

    pub fn with_policy(
        base_url: &str,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, ProducerError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProducerError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ProducerError::InvalidUrl(format!(
                "{base_url}: expected http or https"
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            retry,
        })
    }

    pub fn endpoint(&self, kind: EventKind) -> Result<Url, ProducerError> {
        self.base_url
            .join(kind.route())
            .map_err(|e| ProducerError::InvalidUrl(e.to_string()))
    }

    pub async fn init_object(&self, mesh: &MeshSnapshot) -> Result<(), ProducerError> {
        self.send_raw(EventKind::InitObject, mesh.encode()?).await
    }

    pub async fn update_object(&self, delta: &MeshDelta) -> Result<(), ProducerError> {
        self.send_raw(EventKind::UpdateObject, delta.encode()?).await
    }

    pub async fn init_silhouette_area(&self, area: SilhouetteArea) -> Result<(), ProducerError> {
        self.send_raw(EventKind::InitSilhouetteArea, area.encode()).await
    }

    pub async fn update_top_silhouette(
        &self,
        bitmap: &SilhouetteBitmap,
    ) -> Result<(), ProducerError> {
        let kind = EventKind::UpdateTopSilhouette;
        self.send_raw(kind, bitmap.encode(kind)?).await
    }

    pub async fn update_bottom_silhouette(
        &self,
        bitmap: &SilhouetteBitmap,
    ) -> Result<(), ProducerError> {
        let kind = EventKind::UpdateBottomSilhouette;
        self.send_raw(kind, bitmap.encode(kind)?).await
    }

    pub async fn send(&self, event: &Event) -> Result<(), ProducerError> {
        self.send_raw(event.kind(), event.encode_payload()?).await
    }

    /// Post an already encoded payload. The relay does not look inside it.
    pub async fn send_raw(&self, kind: EventKind, payload: Bytes) -> Result<(), ProducerError> {
        let url = self.endpoint(kind)?;
        with_retry(&self.retry, move || {
            let url = url.clone();
            let payload = payload.clone();
            async move { self.post_once(kind, url, payload).await }
        })
        .await
    }

    async fn post_once(&self, kind: EventKind, url: Url, payload: Bytes) -> Result<(), ProducerError> {
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProducerError::Status { status, body });
        }

        let ack: Ack = response.json().await?;
        if !ack.success {
            return Err(ProducerError::Rejected(kind));
        }
        Ok(())
    }
}

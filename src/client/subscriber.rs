use anyhow::{anyhow, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::protocol::Frame;

/// WebSocket subscriber that yields raw frames from a relay.
pub struct SubscriberClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl SubscriberClient {
    /// Connect to a subscription endpoint, e.g. `ws://localhost:8081/`.
    ///
    /// Frame and message size limits are lifted: the relay accepts payloads
    /// of any size and forwards each one as a single message.
    pub async fn connect(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| anyhow!("invalid ws url: {e}"))?;
        let config = WebSocketConfig::default()
            .max_frame_size(None)
            .max_message_size(None);
        let (stream, _) =
            tokio_tungstenite::connect_async_with_config(url.as_str(), Some(config), false).await?;
        Ok(Self { stream })
    }

    /// Next frame from the relay, or `None` once the connection is closed.
    /// Text and control messages are skipped.
    pub async fn next_frame(&mut self) -> Option<Result<Frame>> {
        while let Some(msg) = self.stream.next().await {
            match msg {
                Ok(Message::Binary(bin)) => return Some(Frame::from_bytes(bin).map_err(Into::into)),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(err) => return Some(Err(err.into())),
            }
        }
        None
    }

    /// The relay logs client messages but does not act on them.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_string().into())).await?;
        Ok(())
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

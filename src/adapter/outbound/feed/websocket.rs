//! WebSocket feed transport.

use async_trait::async_trait;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use super::dto;
use crate::error::{Error, Result};
use crate::port::{FeedMessage, FeedTransport, OutboundFrame};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One WebSocket connection to the odds feed.
///
/// Text frames are decoded with [`dto::decode`]; pings are answered
/// inline. The transport does not reconnect; `StreamConnection` builds a
/// new one for every attempt.
pub struct WebSocketTransport {
    url: String,
    ws: Option<Socket>,
}

impl WebSocketTransport {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ws: None,
        }
    }

    fn socket(&mut self) -> Result<&mut Socket> {
        self.ws
            .as_mut()
            .ok_or_else(|| Error::Connection("not connected".into()))
    }
}

#[async_trait]
impl FeedTransport for WebSocketTransport {
    async fn connect(&mut self) -> Result<()> {
        info!(url = %self.url, "Connecting to feed");
        let (ws, response) = connect_async(self.url.as_str()).await?;
        info!(status = %response.status(), "Feed connected");
        self.ws = Some(ws);
        Ok(())
    }

    async fn send(&mut self, frame: OutboundFrame) -> Result<()> {
        let json = dto::encode(&frame)?;
        if let OutboundFrame::Subscribe { market_ids, .. } = &frame {
            let total = market_ids.len();
            if total <= 5 {
                info!(markets = ?market_ids, "Subscribing to markets");
            } else {
                let preview: Vec<_> = market_ids.iter().take(5).collect();
                info!(markets = ?preview, more = total - 5, "Subscribing to markets");
            }
        } else {
            trace!("Sending heartbeat");
        }
        self.socket()?.send(Message::Text(json)).await?;
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<FeedMessage>> {
        loop {
            let ws = self.ws.as_mut()?;
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!(bytes = text.len(), "Received feed text frame");
                    return Some(Ok(dto::decode(&text, Utc::now())));
                }
                Some(Ok(Message::Ping(data))) => {
                    trace!("Received WebSocket ping");
                    if let Err(e) = ws.send(Message::Pong(data)).await {
                        self.ws = None;
                        return Some(Err(e.into()));
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(frame = ?frame, "Feed closed by server");
                    self.ws = None;
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!(error = %e, "Feed socket error");
                    self.ws = None;
                    return Some(Err(e.into()));
                }
                None => {
                    debug!("Feed stream ended");
                    self.ws = None;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            if let Err(e) = ws.close(None).await {
                debug!(error = %e, "Error closing feed socket");
            }
        }
    }

    fn is_open(&self) -> bool {
        self.ws.is_some()
    }

    fn transport_name(&self) -> &'static str {
        "websocket"
    }
}

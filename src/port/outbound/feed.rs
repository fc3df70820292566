//! Feed port: one physical connection to the exchange's streaming API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{MarketId, OddsUpdate};
use crate::error::Error;

/// Frames the client sends to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Subscribe {
        market_ids: Vec<MarketId>,
        conflate_ms: u64,
    },
    Heartbeat,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Price changes, one update per outcome.
    MarketChange {
        updates: Vec<OddsUpdate>,
        /// Publish time stamped by the feed, when present.
        published_at: Option<DateTime<Utc>>,
    },
    Heartbeat,
    /// Connection or status notice from the feed.
    Status { detail: String },
    /// Frame that could not be decoded. Logged and dropped by the caller.
    Malformed { reason: String },
    /// Well-formed frame of a kind this client does not handle.
    Ignored { op: String },
}

/// A single feed socket.
///
/// `StreamConnection` obtains a fresh transport from a factory for every
/// connection attempt, so implementations never reconnect themselves.
#[async_trait]
pub trait FeedTransport: Send {
    /// Open the socket.
    async fn connect(&mut self) -> Result<(), Error>;

    /// Send one frame.
    async fn send(&mut self, frame: OutboundFrame) -> Result<(), Error>;

    /// Receive the next decoded frame.
    ///
    /// Returns `None` once the peer has closed the connection and
    /// `Some(Err(_))` on a transport failure.
    async fn next_message(&mut self) -> Option<Result<FeedMessage, Error>>;

    /// Close the socket. Safe to call more than once.
    async fn close(&mut self);

    /// Whether the socket is genuinely open.
    fn is_open(&self) -> bool;

    /// Transport name for logging.
    fn transport_name(&self) -> &'static str;
}

#[async_trait]
impl FeedTransport for Box<dyn FeedTransport> {
    async fn connect(&mut self) -> Result<(), Error> {
        (**self).connect().await
    }

    async fn send(&mut self, frame: OutboundFrame) -> Result<(), Error> {
        (**self).send(frame).await
    }

    async fn next_message(&mut self) -> Option<Result<FeedMessage, Error>> {
        (**self).next_message().await
    }

    async fn close(&mut self) {
        (**self).close().await;
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}

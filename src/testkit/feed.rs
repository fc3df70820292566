//! In-memory feed for connection tests.
//!
//! A [`ScriptedFeed`] plays the exchange side. Its [`factory`](ScriptedFeed::factory)
//! hands a fresh [`ScriptedTransport`] to every connection attempt; the test
//! then pushes frames, drops the socket, or makes connects fail.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::application::TransportFactory;
use crate::domain::{MarketId, OddsStatus, OddsUpdate, OutcomeId};
use crate::error::{Error, Result};
use crate::port::{FeedMessage, FeedTransport, OutboundFrame};

#[derive(Debug)]
enum Event {
    Message(FeedMessage),
    /// Peer closes the socket: `next_message` yields `None`.
    Drop,
    /// Socket reports closed but the read side stays silent.
    HalfClose,
}

#[derive(Default)]
struct Inner {
    failing_connects: usize,
    connect_times: Vec<Instant>,
    sent: Vec<OutboundFrame>,
    session: Option<(u64, mpsc::UnboundedSender<Event>)>,
    backlog: VecDeque<FeedMessage>,
    next_session: u64,
}

/// The exchange side of a scripted feed. Cheap to clone.
#[derive(Clone, Default)]
pub struct ScriptedFeed {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` connect attempts fail.
    pub fn fail_connects(&self, count: usize) {
        self.inner.lock().failing_connects = count;
    }

    pub fn factory(&self) -> TransportFactory {
        let feed = self.clone();
        Arc::new(move || {
            Box::new(ScriptedTransport {
                feed: feed.clone(),
                session: None,
                open: false,
            }) as Box<dyn FeedTransport>
        })
    }

    /// Deliver a frame on the live session, or on the next one if none is
    /// open.
    pub fn push(&self, message: FeedMessage) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        match &inner.session {
            Some((_, tx)) => {
                let _ = tx.send(Event::Message(message));
            }
            None => inner.backlog.push_back(message),
        }
    }

    /// Close the live session from the server side.
    pub fn drop_connection(&self) {
        self.send_event(Event::Drop);
    }

    /// Mark the live socket closed without ending the read side.
    pub fn half_close(&self) {
        self.send_event(Event::HalfClose);
    }

    /// Connect attempts so far, failed ones included.
    pub fn connect_attempts(&self) -> usize {
        self.inner.lock().connect_times.len()
    }

    pub fn connect_times(&self) -> Vec<Instant> {
        self.inner.lock().connect_times.clone()
    }

    /// Frames successfully sent by clients, across sessions.
    pub fn sent_frames(&self) -> Vec<OutboundFrame> {
        self.inner.lock().sent.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().session.is_some()
    }

    fn send_event(&self, event: Event) {
        if let Some((_, tx)) = &self.inner.lock().session {
            let _ = tx.send(event);
        }
    }

    fn end_session(&self, id: u64) {
        let mut inner = self.inner.lock();
        if inner.session.as_ref().is_some_and(|(current, _)| *current == id) {
            inner.session = None;
        }
    }
}

/// Client side of one scripted session.
pub struct ScriptedTransport {
    feed: ScriptedFeed,
    session: Option<(u64, mpsc::UnboundedReceiver<Event>)>,
    open: bool,
}

#[async_trait]
impl FeedTransport for ScriptedTransport {
    async fn connect(&mut self) -> Result<()> {
        let mut guard = self.feed.inner.lock();
        let inner = &mut *guard;
        inner.connect_times.push(Instant::now());
        if inner.failing_connects > 0 {
            inner.failing_connects -= 1;
            return Err(Error::Connection("connection refused".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for message in inner.backlog.drain(..) {
            let _ = tx.send(Event::Message(message));
        }
        let id = inner.next_session;
        inner.next_session += 1;
        inner.session = Some((id, tx));
        self.session = Some((id, rx));
        self.open = true;
        Ok(())
    }

    async fn send(&mut self, frame: OutboundFrame) -> Result<()> {
        if !self.open {
            return Err(Error::Connection("socket not open".into()));
        }
        self.feed.inner.lock().sent.push(frame);
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<FeedMessage>> {
        loop {
            let event = match self.session.as_mut() {
                Some((_, rx)) => rx.recv().await,
                None => return None,
            };
            match event {
                Some(Event::Message(message)) => return Some(Ok(message)),
                Some(Event::HalfClose) => self.open = false,
                Some(Event::Drop) | None => {
                    self.open = false;
                    if let Some((id, _)) = self.session.take() {
                        self.feed.end_session(id);
                    }
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        self.open = false;
        if let Some((id, _)) = self.session.take() {
            self.feed.end_session(id);
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn transport_name(&self) -> &'static str {
        "scripted"
    }
}

/// A market-change frame with one active update per `(outcome, price)`.
///
/// # Panics
///
/// Panics if a price is not a decimal literal.
pub fn market_change(market: &str, prices: &[(&str, &str)]) -> FeedMessage {
    let now = Utc::now();
    let updates = prices
        .iter()
        .map(|(outcome, price)| OddsUpdate {
            market_id: MarketId::from(market),
            outcome_id: OutcomeId::from(*outcome),
            price: Decimal::from_str(price).expect("price literal"),
            observed_at: now,
            status: OddsStatus::Active,
        })
        .collect();
    FeedMessage::MarketChange {
        updates,
        published_at: None,
    }
}

//! Feed wire frames.
//!
//! Inbound frames are JSON objects tagged by `op`:
//! ```json
//! {"op":"mcm","id":"1.234","pt":1704067200000,"mc":[{"rc":[{"id":47972,"ltp":2.5}]}]}
//! {"op":"heartbeat"}
//! ```
//! Runner ids may be numbers or strings. `pt` is the publish time in epoch
//! millis and becomes the `observedAt` of every update in the frame.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{MarketId, OddsStatus, OddsUpdate, OutcomeId};
use crate::port::{FeedMessage, OutboundFrame};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum InboundFrame {
    Mcm(MarketChangeFrame),
    Heartbeat,
    Connection(StatusFrame),
    Status(StatusFrame),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct MarketChangeFrame {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub pt: Option<i64>,
    #[serde(default)]
    pub mc: Vec<MarketChange>,
}

#[derive(Debug, Deserialize)]
pub struct MarketChange {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub rc: Vec<RunnerChange>,
}

#[derive(Debug, Deserialize)]
pub struct RunnerChange {
    pub id: RunnerId,
    #[serde(default)]
    pub ltp: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RunnerId {
    Number(i64),
    Text(String),
}

impl RunnerId {
    fn into_outcome_id(self) -> OutcomeId {
        match self {
            Self::Number(n) => OutcomeId::new(n.to_string()),
            Self::Text(s) => OutcomeId::new(s),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFrame {
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl StatusFrame {
    fn detail(&self) -> String {
        [
            self.status_code.as_deref(),
            self.connection_id.as_deref(),
            self.error_message.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[derive(Debug, Deserialize)]
struct OpOnly {
    op: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum OutboundDto<'a> {
    Subscribe {
        #[serde(rename = "marketIds")]
        market_ids: &'a [MarketId],
        #[serde(rename = "conflateMs")]
        conflate_ms: u64,
    },
    Heartbeat,
}

fn runner_status(raw: Option<&str>) -> OddsStatus {
    match raw {
        None => OddsStatus::Active,
        Some(s) if s.eq_ignore_ascii_case("active") => OddsStatus::Active,
        Some(s) if s.eq_ignore_ascii_case("suspended") => OddsStatus::Suspended,
        Some(_) => OddsStatus::Closed,
    }
}

/// Encode an outbound frame as JSON text.
pub fn encode(frame: &OutboundFrame) -> serde_json::Result<String> {
    let dto = match frame {
        OutboundFrame::Subscribe {
            market_ids,
            conflate_ms,
        } => OutboundDto::Subscribe {
            market_ids,
            conflate_ms: *conflate_ms,
        },
        OutboundFrame::Heartbeat => OutboundDto::Heartbeat,
    };
    serde_json::to_string(&dto)
}

/// Decode one inbound text frame.
///
/// Never fails: undecodable input becomes [`FeedMessage::Malformed`].
pub fn decode(text: &str, received_at: DateTime<Utc>) -> FeedMessage {
    let frame = match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            return FeedMessage::Malformed {
                reason: e.to_string(),
            }
        }
    };

    match frame {
        InboundFrame::Mcm(change) => decode_market_change(change, received_at),
        InboundFrame::Heartbeat => FeedMessage::Heartbeat,
        InboundFrame::Connection(status) | InboundFrame::Status(status) => FeedMessage::Status {
            detail: status.detail(),
        },
        InboundFrame::Unknown => {
            let op = serde_json::from_str::<OpOnly>(text)
                .map(|o| o.op)
                .unwrap_or_default();
            debug!(op = %op, "Ignoring feed frame");
            FeedMessage::Ignored { op }
        }
    }
}

fn decode_market_change(frame: MarketChangeFrame, received_at: DateTime<Utc>) -> FeedMessage {
    let published_at = frame.pt.and_then(DateTime::from_timestamp_millis);
    let observed_at = published_at.unwrap_or(received_at);
    let mut updates = Vec::new();

    for change in frame.mc {
        let Some(market) = change.id.as_ref().or(frame.id.as_ref()) else {
            warn!("Market change without market id, dropping");
            continue;
        };
        let market_id = MarketId::new(market.clone());

        for runner in change.rc {
            let outcome_id = runner.id.into_outcome_id();
            let Some(price) = runner.ltp else {
                warn!(market_id = %market_id, outcome_id = %outcome_id, "Runner change without price, dropping");
                continue;
            };
            let status = runner_status(runner.status.as_deref());
            match OddsUpdate::try_new(market_id.clone(), outcome_id, price, observed_at, status) {
                Ok(update) => updates.push(update),
                Err(e) => warn!(error = %e, "Invalid runner price, dropping"),
            }
        }
    }

    FeedMessage::MarketChange {
        updates,
        published_at,
    }
}

//! Exchange REST surface.
//!
//! Order execution is handled elsewhere; the live evaluator only needs the
//! balance, and the remaining calls describe the collaborator's contract.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{MarketId, OddsStatus, OutcomeId};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub id: MarketId,
    pub name: String,
    pub status: OddsStatus,
    pub outcomes: Vec<OutcomeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRequest {
    pub market_id: MarketId,
    pub outcome_id: OutcomeId,
    pub odds: Decimal,
    pub stake: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetStatus {
    Pending,
    Matched,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBet {
    pub bet_id: String,
    pub status: BetStatus,
    pub matched_stake: Decimal,
}

#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn get_market(&self, id: &MarketId) -> Result<MarketInfo>;

    async fn place_bet(&self, request: &BetRequest) -> Result<PlacedBet>;

    async fn cancel_bet(&self, bet_id: &str) -> Result<()>;

    /// Available balance in account currency.
    async fn get_balance(&self) -> Result<Decimal>;
}

//! Point-in-time view of a market used for strategy evaluation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{MarketId, OutcomeId};
use super::odds::{OddsStatus, OddsUpdate};

/// One price quote for an outcome, optionally with a model probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeQuote {
    pub outcome_id: OutcomeId,
    pub price: Decimal,
    #[serde(default)]
    pub status: OddsStatus,
    /// Estimated true probability of the outcome, if a model supplied one.
    #[serde(default)]
    pub probability: Option<Decimal>,
    /// Bookmaker or venue that offered the price.
    #[serde(default)]
    pub source: Option<String>,
}

impl OutcomeQuote {
    pub fn new(outcome_id: impl Into<OutcomeId>, price: Decimal) -> Self {
        Self {
            outcome_id: outcome_id.into(),
            price,
            status: OddsStatus::Active,
            probability: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_probability(mut self, probability: Decimal) -> Self {
        self.probability = Some(probability);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: OddsStatus) -> Self {
        self.status = status;
        self
    }

    /// A quote is usable when it is tradeable and the price is valid odds.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.status == OddsStatus::Active && self.price > Decimal::ONE
    }
}

impl From<&OddsUpdate> for OutcomeQuote {
    fn from(update: &OddsUpdate) -> Self {
        Self {
            outcome_id: update.outcome_id.clone(),
            price: update.price,
            status: update.status,
            probability: None,
            source: None,
        }
    }
}

/// All known quotes for a market at `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub market_id: MarketId,
    pub timestamp: DateTime<Utc>,
    pub quotes: Vec<OutcomeQuote>,
}

impl MarketSnapshot {
    pub fn new(market_id: impl Into<MarketId>, timestamp: DateTime<Utc>) -> Self {
        Self {
            market_id: market_id.into(),
            timestamp,
            quotes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_quote(mut self, quote: OutcomeQuote) -> Self {
        self.quotes.push(quote);
        self
    }

    /// Distinct outcomes in first-seen order.
    #[must_use]
    pub fn outcome_ids(&self) -> Vec<&OutcomeId> {
        let mut seen: Vec<&OutcomeId> = Vec::new();
        for quote in &self.quotes {
            if !seen.contains(&&quote.outcome_id) {
                seen.push(&quote.outcome_id);
            }
        }
        seen
    }

    /// Highest usable price per outcome across all sources.
    #[must_use]
    pub fn best_quotes(&self) -> Vec<&OutcomeQuote> {
        self.outcome_ids()
            .into_iter()
            .filter_map(|id| {
                self.quotes
                    .iter()
                    .filter(|q| &q.outcome_id == id && q.is_usable())
                    .max_by(|a, b| a.price.cmp(&b.price))
            })
            .collect()
    }

    /// First usable quote per outcome (a single book).
    #[must_use]
    pub fn first_quotes(&self) -> Vec<&OutcomeQuote> {
        self.outcome_ids()
            .into_iter()
            .filter_map(|id| {
                self.quotes
                    .iter()
                    .find(|q| &q.outcome_id == id && q.is_usable())
            })
            .collect()
    }
}

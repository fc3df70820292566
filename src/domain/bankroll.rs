//! Bankroll bookkeeping for a single session or backtest run.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A bet that has been settled against the bankroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettledBet {
    pub stake: Decimal,
    pub profit: Decimal,
    pub odds: Decimal,
    pub settled_at: DateTime<Utc>,
}

/// Spendable and total funds plus the ordered settlement history.
///
/// Each live session or backtest run owns its own instance; bankrolls are
/// never shared between concurrent runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bankroll {
    available: Decimal,
    total: Decimal,
    bets: Vec<SettledBet>,
}

impl Bankroll {
    #[must_use]
    pub fn new(initial: Decimal) -> Self {
        Self {
            available: initial,
            total: initial,
            bets: Vec::new(),
        }
    }

    #[must_use]
    pub const fn available(&self) -> Decimal {
        self.available
    }

    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    #[must_use]
    pub fn bets(&self) -> &[SettledBet] {
        &self.bets
    }

    /// Whether `stake` is positive and fully covered by available funds.
    #[must_use]
    pub fn can_cover(&self, stake: Decimal) -> bool {
        stake > Decimal::ZERO && stake <= self.available
    }

    /// Apply a settled bet: profit is added to (or loss taken from) the
    /// available balance, which becomes the new total.
    pub fn settle(&mut self, bet: SettledBet) {
        self.available += bet.profit;
        self.total = self.available;
        self.bets.push(bet);
    }

    /// Replace both balances, e.g. after reading the exchange balance.
    pub fn reset_balance(&mut self, amount: Decimal) {
        self.available = amount;
        self.total = amount;
    }
}

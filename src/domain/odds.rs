//! Live price updates.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{MarketId, OutcomeId};
use crate::error::{Error, Result};

/// Trading status of an outcome as reported by the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OddsStatus {
    #[default]
    Active,
    Suspended,
    Closed,
}

impl fmt::Display for OddsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

/// Latest decimal price for one outcome of one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsUpdate {
    pub market_id: MarketId,
    pub outcome_id: OutcomeId,
    pub price: Decimal,
    pub observed_at: DateTime<Utc>,
    pub status: OddsStatus,
}

impl OddsUpdate {
    /// Build an update, rejecting prices that are not valid decimal odds.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `price <= 1.0`.
    pub fn try_new(
        market_id: MarketId,
        outcome_id: OutcomeId,
        price: Decimal,
        observed_at: DateTime<Utc>,
        status: OddsStatus,
    ) -> Result<Self> {
        if price <= Decimal::ONE {
            return Err(Error::Validation(format!(
                "price {price} for {market_id}/{outcome_id} must be greater than 1.0"
            )));
        }
        Ok(Self {
            market_id,
            outcome_id,
            price,
            observed_at,
            status,
        })
    }

    /// Whether this update may replace `current` in storage.
    ///
    /// Equal timestamps resolve to the later arrival, i.e. `self`.
    #[must_use]
    pub fn supersedes(&self, current: &OddsUpdate) -> bool {
        self.observed_at >= current.observed_at
    }

    /// Whether the update is older than `ttl` relative to `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.observed_at > ttl
    }

    /// Bookmaker-implied probability, `1 / price`.
    #[must_use]
    pub fn implied_probability(&self) -> Decimal {
        Decimal::ONE / self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn update_at(secs: i64) -> OddsUpdate {
        OddsUpdate::try_new(
            MarketId::from("1.1"),
            OutcomeId::from("home"),
            dec!(2.5),
            DateTime::from_timestamp(secs, 0).unwrap(),
            OddsStatus::Active,
        )
        .unwrap()
    }

    #[test]
    fn rejects_prices_at_or_below_one() {
        let result = OddsUpdate::try_new(
            MarketId::from("m"),
            OutcomeId::from("o"),
            dec!(1.0),
            Utc::now(),
            OddsStatus::Active,
        );
        assert!(result.is_err());
    }

    #[test]
    fn equal_timestamps_supersede() {
        let a = update_at(100);
        let b = update_at(100);
        assert!(b.supersedes(&a));
        assert!(!update_at(99).supersedes(&a));
    }

    #[test]
    fn expiry_is_measured_from_observed_at() {
        let update = update_at(0);
        let ttl = Duration::seconds(60);
        assert!(!update.is_expired(DateTime::from_timestamp(60, 0).unwrap(), ttl));
        assert!(update.is_expired(DateTime::from_timestamp(61, 0).unwrap(), ttl));
    }

    #[test]
    fn serializes_with_wire_names() {
        let json = serde_json::to_value(update_at(0)).unwrap();
        assert_eq!(json["marketId"], "1.1");
        assert_eq!(json["status"], "ACTIVE");
    }
}

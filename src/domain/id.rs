//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id! {
    /// Exchange market identifier (a bettable event).
    MarketId
}

string_id! {
    /// Outcome (runner/selection) identifier within a market.
    OutcomeId
}

string_id! {
    /// Identifier of a configured strategy.
    StrategyId
}

string_id! {
    /// Identifier of a persisted backtest run.
    ///
    /// Generated as UUID v4 for new runs, or constructed from an existing
    /// string when loading from storage.
    BacktestId
}

impl BacktestId {
    /// Generate a fresh random run id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

string_id! {
    /// Identifier of a single simulated bet inside a backtest.
    BetId
}

impl BetId {
    /// Deterministic bet id derived from the run-local sequence number.
    #[must_use]
    pub fn sequence(n: usize) -> Self {
        Self(format!("bet-{n:06}"))
    }
}

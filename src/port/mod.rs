//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams where adapters plug in external systems: the odds
//! feed socket, historical data, backtest persistence, alerting channels
//! and the exchange REST surface.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │  Feed   │            │   Store /   │              │ Notifier  │
//! │ Adapter │            │   History   │              │  Adapter  │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```

pub mod outbound;

pub use outbound::exchange::{BetRequest, BetStatus, ExchangeClient, MarketInfo, PlacedBet};
pub use outbound::feed::{FeedMessage, FeedTransport, OutboundFrame};
pub use outbound::history::HistoricalDataSource;
pub use outbound::notifier::{Alert, AlertNotifier, AlertSeverity, NotifierRegistry, NullNotifier};
pub use outbound::store::BacktestStore;

//! Application services.
//!
//! Live path: [`stream::StreamConnection`] feeds [`cache::OddsCache`], which
//! [`live::LiveEvaluator`] reads through [`strategy::StrategyEngine`].
//! [`health::HealthMonitor`] and [`metrics::MetricsCollector`] observe the
//! connection. Historical path: [`backtest::BacktestEngine`] replays stored
//! odds through the same engine. [`analytics::AnalyticsService`] reports on
//! both.

pub mod analytics;
pub mod backtest;
pub mod cache;
pub mod health;
pub mod live;
pub mod metrics;
pub mod strategy;
pub mod stream;

pub use analytics::{AnalyticsService, RealizedResult, StrategyPerformance};
pub use backtest::{BacktestEngine, ReplayEvent};
pub use cache::{CacheConfig, OddsCache};
pub use health::{HealthConfig, HealthMonitor, Supervised};
pub use live::LiveEvaluator;
pub use metrics::{MetricsCollector, MetricsConfig, MetricsSnapshot};
pub use strategy::StrategyEngine;
pub use stream::{FeedConfig, ReconnectionConfig, StreamConnection, TransportFactory};

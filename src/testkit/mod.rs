//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`feed`]: [`ScriptedFeed`](feed::ScriptedFeed), an in-memory feed
//!   whose transports are driven from the test.
//! - [`domain`]: builders for domain values.
//! - [`notifier`]: [`RecordingNotifier`](notifier::RecordingNotifier).
//! - [`supervisor`]: [`FakeSupervisor`](supervisor::FakeSupervisor) for
//!   health monitor tests.

pub mod domain;
pub mod feed;
pub mod notifier;
pub mod supervisor;

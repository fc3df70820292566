//! Infrastructure configuration modules.

pub mod logging;
pub mod settings;
pub mod telegram;

pub use logging::LoggingConfig;
pub use settings::Config;

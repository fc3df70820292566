//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! business logic: configuration, wiring and process lifecycle.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Adapter construction from configuration
//! - [`config`] - Configuration loading and validation
//! - [`runtime`] - Composition root for the live pipeline

pub mod bootstrap;
pub mod config;
pub mod runtime;

pub use runtime::Runtime;

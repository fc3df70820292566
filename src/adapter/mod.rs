//! Adapters implementing the ports against real infrastructure.

pub mod inbound;
pub mod outbound;
